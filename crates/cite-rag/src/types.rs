use serde::{Deserialize, Serialize};

/// A slice of source text, the unit of retrieval.
///
/// `id` is the passage's position in both the corpus and the vector index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: usize,
    pub text: String,
    pub source: String,
}

/// A passage paired with its squared L2 distance to the query vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub passage: Passage,
    pub distance: f32,
}
