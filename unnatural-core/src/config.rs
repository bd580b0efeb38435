use std::path::PathBuf;

/// Default number of suggestions returned by a prediction.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 10;

/// Default width (in tokens) of a windowed cross-entropy window.
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Settings shared by every corpus a registry builds.
///
/// # Fields
/// - `data_dir`: directory holding one statistics file per corpus
/// - `max_suggestions`: upper bound on suggestions per prediction
/// - `window_size`: sliding window width for windowed cross-entropy
#[derive(Clone, Debug)]
pub struct RegistryConfig {
	pub data_dir: PathBuf,
	pub max_suggestions: usize,
	pub window_size: usize,
}

impl Default for RegistryConfig {
	fn default() -> Self {
		Self {
			data_dir: PathBuf::from("./data"),
			max_suggestions: DEFAULT_MAX_SUGGESTIONS,
			window_size: DEFAULT_WINDOW_SIZE,
		}
	}
}

impl RegistryConfig {
	/// Creates a configuration rooted at `data_dir` with default tuning.
	pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
		Self { data_dir: data_dir.into(), ..Self::default() }
	}
}
