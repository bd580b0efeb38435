//! N-gram naturalness models over source-code token streams.
//!
//! This crate provides the corpus layer of the service, including:
//! - Corpora binding a tokenizer, a language model handle and metadata
//! - A registry resolving corpus identifiers at startup
//! - A fixed-order n-gram engine persisted per corpus
//! - Tokenizers for Python source and pre-lexed JSON payloads
//!
//! Every operation that touches a corpus's model is serialized per corpus;
//! different corpora run independently.

/// Corpus entity: window normalization, training and lifecycle.
pub mod corpus;

/// Registry of the corpora available to callers.
pub mod registry;

/// Language model boundary and the bundled n-gram engine.
pub mod model;

/// Per-language tokenizers.
pub mod tokenizer;

/// Fixed-arity token records.
pub mod token;

/// Registry settings.
pub mod config;

/// Error types for tokenizers, models and corpora.
pub mod error;

/// I/O utilities (statistics files, path helpers).
///
/// Not exposed
pub(crate) mod io;

pub use config::RegistryConfig;
pub use corpus::{Corpus, CorpusMetadata, CorpusSummary, Prediction, TrainResult};
pub use error::{CorpusError, CorpusResult};
pub use registry::CorpusRegistry;
pub use token::Token;
