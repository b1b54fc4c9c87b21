//! Retrieval-augmented generation core for cite.
//!
//! Documents are split into overlapping passages, embedded through an external
//! provider and stored in an exact squared-L2 index alongside a positionally
//! aligned corpus. Queries retrieve the nearest passages and hand them to a
//! generation model with a citation contract: every factual sentence must carry
//! a `[i]` marker pointing into the retrieved list.

pub mod chunker;
pub mod citation;
pub mod corpus;
pub mod document;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod handle;
pub mod index;
pub mod pipeline;
pub mod retriever;
pub mod store;
pub mod synthesizer;
pub mod types;

pub use chunker::{Chunk, Chunker, ChunkerConfig};
pub use citation::CitationReport;
pub use corpus::Corpus;
pub use document::{Document, DocumentError, DocumentLoader};
pub use embedder::Embedder;
pub use engine::{Answer, QueryEngine};
pub use error::{RagError, Result};
pub use handle::{IndexHandle, Snapshot};
pub use index::{FlatIndex, Neighbor};
pub use pipeline::{IngestReport, IngestionPipeline};
pub use retriever::Retriever;
pub use store::IndexStore;
pub use synthesizer::{REFUSAL, Synthesizer};
pub use types::{Passage, RetrievalResult};
