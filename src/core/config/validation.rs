use super::Settings;
use crate::core::errors::RagError;

/// Rejects invalid parameter combinations before anything is built.
pub fn validate(settings: &Settings) -> Result<(), RagError> {
    let chunking = &settings.chunking;
    if chunking.chunk_size == 0 {
        return Err(config_error("chunking.chunk_size must be at least 1"));
    }
    if chunking.chunk_overlap >= chunking.chunk_size {
        return Err(config_error(format!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            chunking.chunk_overlap, chunking.chunk_size
        )));
    }

    let embedding = &settings.embedding;
    if embedding.dimension == 0 {
        return Err(config_error("embedding.dimension must be at least 1"));
    }
    if embedding.max_batch_size == 0 {
        return Err(config_error("embedding.max_batch_size must be at least 1"));
    }
    if embedding.endpoint.is_empty() {
        return Err(config_error("embedding.endpoint must not be empty"));
    }

    let index = &settings.index;
    if index.m < 2 {
        return Err(config_error("index.m must be at least 2"));
    }
    if index.ef_construction < index.m {
        return Err(config_error(format!(
            "index.ef_construction ({}) must be at least index.m ({})",
            index.ef_construction, index.m
        )));
    }
    if index.ef_search == 0 {
        return Err(config_error("index.ef_search must be at least 1"));
    }

    let retrieval = &settings.retrieval;
    if retrieval.top_k == 0 {
        return Err(config_error("retrieval.top_k must be at least 1"));
    }
    if !(-1.0..=1.0).contains(&retrieval.score_threshold) {
        return Err(config_error(format!(
            "retrieval.score_threshold ({}) must be within [-1, 1]",
            retrieval.score_threshold
        )));
    }
    if retrieval.filter_widen_factor == 0 {
        return Err(config_error("retrieval.filter_widen_factor must be at least 1"));
    }

    let memory = &settings.memory;
    if memory.max_turns == 0 {
        return Err(config_error("memory.max_turns must be at least 1"));
    }
    if memory.prompt_window == 0 {
        return Err(config_error("memory.prompt_window must be at least 1"));
    }

    let llm = &settings.llm;
    if llm.primary_model.is_empty() {
        return Err(config_error("llm.primary_model must not be empty"));
    }
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(config_error(format!(
            "llm.temperature ({}) must be within [0, 2]",
            llm.temperature
        )));
    }
    if llm.timeout_secs == 0 {
        return Err(config_error("llm.timeout_secs must be at least 1"));
    }

    Ok(())
}

fn config_error(msg: impl Into<String>) -> RagError {
    RagError::Configuration(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Settings::default()).is_ok());
    }

    #[test]
    fn overlap_must_stay_below_chunk_size() {
        let mut settings = Settings::default();
        settings.chunking.chunk_size = 50;
        settings.chunking.chunk_overlap = 50;

        let err = validate(&settings).unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn threshold_outside_cosine_range_rejected() {
        let mut settings = Settings::default();
        settings.retrieval.score_threshold = 1.5;
        assert!(validate(&settings).is_err());

        settings.retrieval.score_threshold = -1.0;
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn ef_construction_below_m_rejected() {
        let mut settings = Settings::default();
        settings.index.ef_construction = 8;
        settings.index.m = 32;
        assert!(validate(&settings).is_err());
    }
}
