use std::collections::HashMap;
use std::sync::Arc;

use log::{error, info, warn};

use crate::config::RegistryConfig;
use crate::corpus::{Corpus, CorpusMetadata};
use crate::error::{CorpusError, CorpusResult};
use crate::io::{build_output_path, normalize_folder};
use crate::model::ngram_backend::NGramBackend;
use crate::tokenizer::{JsonTokenizer, PythonTokenizer};

/// N-gram order of the generic corpus.
pub const GENERIC_ORDER: usize = 10;

/// N-gram order of the Python corpus.
pub const PYTHON_ORDER: usize = 4;

/// Fixed mapping from corpus identifiers to shared corpora.
///
/// Built once at startup; afterwards lookups only ever hand out the same
/// shared instances. A corpus that is reset keeps its entry.
#[derive(Default)]
pub struct CorpusRegistry {
	corpora: HashMap<String, Arc<Corpus>>,
}

impl CorpusRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the stock registry: `generic` (pre-lexed JSON tokens) and
	/// `py` (Python source), each persisting to `<data_dir>/<id>.bin`.
	pub fn with_defaults(config: &RegistryConfig) -> CorpusResult<Self> {
		let data_dir = normalize_folder(&config.data_dir);
		let backend = |identifier: &str, order: usize| {
			NGramBackend::new(
				order,
				build_output_path(&data_dir, identifier, "bin"),
				config.max_suggestions,
				config.window_size,
			)
			.map(Box::new)
			.map_err(|_| CorpusError::InvalidOrder)
		};

		let mut registry = Self::new();
		registry.register(Corpus::new(
			CorpusMetadata {
				identifier: "generic".to_owned(),
				name: "Generic corpus [n-gram]".to_owned(),
				description: "Language-agnostic corpus over pre-lexed tokens.".to_owned(),
				language: "Generic".to_owned(),
			},
			Arc::new(JsonTokenizer),
			backend("generic", GENERIC_ORDER)?,
		)?);
		registry.register(Corpus::new(
			CorpusMetadata {
				identifier: "py".to_owned(),
				name: "Python corpus [n-gram]".to_owned(),
				description: "The default Python corpus.".to_owned(),
				language: "Python".to_owned(),
			},
			Arc::new(PythonTokenizer),
			backend("py", PYTHON_ORDER)?,
		)?);

		info!("registered corpora {:?} in {}", registry.identifiers(), data_dir.display());
		Ok(registry)
	}

	/// Adds a corpus under its identifier.
	///
	/// Meant for startup only; a corpus with the same identifier is replaced.
	pub fn register(&mut self, corpus: Corpus) {
		let identifier = corpus.identifier().to_owned();
		if self.corpora.insert(identifier.clone(), Arc::new(corpus)).is_some() {
			warn!("corpus '{identifier}' registered twice, keeping the last one");
		}
	}

	/// Resolves `identifier` to its shared corpus.
	///
	/// # Errors
	/// [`CorpusError::NotFound`] if the identifier is not registered.
	pub fn lookup(&self, identifier: &str) -> CorpusResult<Arc<Corpus>> {
		self.corpora
			.get(identifier)
			.cloned()
			.ok_or_else(|| CorpusError::NotFound(identifier.to_owned()))
	}

	/// Registered identifiers, sorted.
	pub fn identifiers(&self) -> Vec<&str> {
		let mut identifiers: Vec<&str> = self.corpora.keys().map(String::as_str).collect();
		identifiers.sort_unstable();
		identifiers
	}

	/// Releases every live model handle.
	///
	/// Every corpus is attempted; the first failure is returned.
	pub fn shutdown(&self) -> CorpusResult<()> {
		let mut first_error = None;
		for (identifier, corpus) in &self.corpora {
			if let Err(e) = corpus.shutdown() {
				error!("failed to release corpus '{identifier}': {e}");
				first_error.get_or_insert(e);
			}
		}
		first_error.map_or(Ok(()), Err)
	}
}
