mod classify;
mod generate_direct;
mod respond;
mod retrieve_generate;

pub use classify::ClassifyNode;
pub use generate_direct::GenerateDirectNode;
pub use respond::RespondNode;
pub use retrieve_generate::RetrieveGenerateNode;
