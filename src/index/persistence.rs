//! Index persistence: a little-endian binary graph file plus a JSON
//! sidecar (`<file>.meta.json`) holding the entry records. The two files
//! are only valid together; any cross-check failure is an
//! `IndexCompatibility` error rather than a silent rebuild.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::config::IndexSettings;
use crate::core::errors::RagError;

use super::hnsw::HnswGraph;
use super::{EntryRecord, IndexInner, VectorIndex};

const MAGIC: u32 = 0x4652_4147; // "FRAG"
const VERSION: u16 = 1;

#[derive(Serialize, Deserialize)]
struct Sidecar {
    model_id: String,
    dimension: usize,
    records: Vec<EntryRecord>,
}

pub(super) fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".meta.json");
    path.with_file_name(name)
}

pub(super) fn persist(
    inner: &IndexInner,
    dimension: usize,
    model_id: &str,
    path: &Path,
) -> Result<(), RagError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC.to_le_bytes());
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&(dimension as u32).to_le_bytes());
    buf.extend_from_slice(&(inner.settings.m as u16).to_le_bytes());
    buf.extend_from_slice(&(inner.settings.ef_construction as u32).to_le_bytes());
    buf.extend_from_slice(&(inner.settings.ef_search as u32).to_le_bytes());
    buf.extend_from_slice(&inner.generation.to_le_bytes());
    buf.extend_from_slice(&(inner.records.len() as u32).to_le_bytes());
    buf.extend_from_slice(&inner.graph.entry_point().unwrap_or(u32::MAX).to_le_bytes());
    buf.push(inner.graph.level_max());
    buf.extend_from_slice(&inner.graph.rng_state().to_le_bytes());

    for ordinal in 0..inner.records.len() {
        let node = inner.graph.node(ordinal as u32);
        buf.push(node.neighbors.len() as u8);
        for &val in &node.vector {
            buf.extend_from_slice(&val.to_le_bytes());
        }
        for layer in &node.neighbors {
            buf.extend_from_slice(&(layer.len() as u16).to_le_bytes());
            for &nb in layer {
                buf.extend_from_slice(&nb.to_le_bytes());
            }
        }
    }

    fs::write(path, &buf)?;

    let sidecar = Sidecar {
        model_id: model_id.to_string(),
        dimension,
        records: inner.records.clone(),
    };
    let json = serde_json::to_vec(&sidecar).map_err(RagError::internal)?;
    fs::write(sidecar_path(path), json)?;

    tracing::info!(
        "Persisted index to {} ({} entries, generation {})",
        path.display(),
        inner.records.len(),
        inner.generation
    );
    Ok(())
}

pub(super) fn load(
    path: &Path,
    expected_dimension: usize,
    expected_model: &str,
) -> Result<VectorIndex, RagError> {
    let bytes = fs::read(path)?;
    let mut reader = Reader::new(&bytes);

    if reader.u32()? != MAGIC {
        return Err(RagError::IndexCompatibility(format!(
            "{} is not an index file",
            path.display()
        )));
    }
    let version = reader.u16()?;
    if version != VERSION {
        return Err(RagError::IndexCompatibility(format!(
            "unsupported index version {}",
            version
        )));
    }

    let dimension = reader.u32()? as usize;
    let m = reader.u16()? as usize;
    let ef_construction = reader.u32()? as usize;
    let ef_search = reader.u32()? as usize;
    let generation = reader.u64()?;
    let count = reader.u32()? as usize;
    let entry_point_raw = reader.u32()?;
    let entry_point = (entry_point_raw != u32::MAX).then_some(entry_point_raw);
    let level_max = reader.u8()?;
    let rng_state = reader.u64()?;

    if dimension != expected_dimension {
        return Err(RagError::IndexCompatibility(format!(
            "index was built with dimension {}, expected {}",
            dimension, expected_dimension
        )));
    }

    let mut nodes = Vec::with_capacity(count);
    for _ in 0..count {
        let layer_count = reader.u8()? as usize;
        let mut vector = Vec::with_capacity(dimension);
        for _ in 0..dimension {
            vector.push(reader.f32()?);
        }
        let mut neighbors = Vec::with_capacity(layer_count);
        for _ in 0..layer_count {
            let n = reader.u16()? as usize;
            let mut layer = Vec::with_capacity(n);
            for _ in 0..n {
                layer.push(reader.u32()?);
            }
            neighbors.push(layer);
        }
        nodes.push((vector, neighbors));
    }

    let sidecar_file = sidecar_path(path);
    let sidecar_bytes = fs::read(&sidecar_file).map_err(|e| {
        RagError::IndexCompatibility(format!(
            "missing sidecar metadata {}: {}",
            sidecar_file.display(),
            e
        ))
    })?;
    let sidecar: Sidecar = serde_json::from_slice(&sidecar_bytes).map_err(|e| {
        RagError::IndexCompatibility(format!("malformed sidecar metadata: {}", e))
    })?;

    if sidecar.records.len() != count {
        return Err(RagError::IndexCompatibility(format!(
            "index holds {} entries but sidecar has {} records",
            count,
            sidecar.records.len()
        )));
    }
    if sidecar.dimension != dimension {
        return Err(RagError::IndexCompatibility(format!(
            "sidecar dimension {} disagrees with index dimension {}",
            sidecar.dimension, dimension
        )));
    }
    if sidecar.model_id != expected_model {
        return Err(RagError::IndexCompatibility(format!(
            "index was built with embedding model '{}', expected '{}'",
            sidecar.model_id, expected_model
        )));
    }

    let graph = HnswGraph::from_parts(
        m,
        ef_construction,
        nodes,
        entry_point,
        level_max,
        rng_state,
    );
    let settings = IndexSettings {
        m,
        ef_construction,
        ef_search,
    };

    tracing::info!(
        "Loaded index from {} ({} entries, generation {})",
        path.display(),
        count,
        generation
    );

    Ok(VectorIndex::from_loaded(
        dimension,
        sidecar.model_id,
        graph,
        sidecar.records,
        settings,
        generation,
    ))
}

/// Cursor over the binary index file; every read checks bounds.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], RagError> {
        if self.pos + n > self.bytes.len() {
            return Err(RagError::IndexCompatibility(
                "index file truncated".to_string(),
            ));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, RagError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, RagError> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn u32(&mut self) -> Result<u32, RagError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn u64(&mut self) -> Result<u64, RagError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn f32(&mut self) -> Result<f32, RagError> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }
}
