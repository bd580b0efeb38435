use std::path::{Path, PathBuf};
use std::{env, fs, io};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ModelError;

/// Builds the path of a corpus artifact inside a folder.
///
/// Example:
/// `data` + `"py"` + `"bin"` → `data/py.bin`
pub(crate) fn build_output_path<P: AsRef<Path>>(folder: P, stem: &str, extension: &str) -> PathBuf {
	let mut output = folder.as_ref().join(stem);
	output.set_extension(extension);
	output
}

/// Normalize a folder path.
///
/// - `"."` or `"./"` resolves to the current working directory
/// - Other paths are returned as-is (not canonicalized)
pub(crate) fn normalize_folder<P: AsRef<Path>>(input: P) -> PathBuf {
	let input = input.as_ref();
	if input == Path::new(".") || input == Path::new("./") {
		env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
	} else {
		input.to_path_buf()
	}
}

/// Reads a postcard-encoded value.
///
/// Returns `Ok(None)` when the file does not exist.
pub(crate) fn read_binary<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<Option<T>, ModelError> {
	let bytes = match fs::read(path) {
		Ok(bytes) => bytes,
		Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(e.into()),
	};
	Ok(Some(postcard::from_bytes(&bytes)?))
}

/// Writes a value with postcard.
///
/// The bytes land in a sibling `.tmp` file first and are renamed over the
/// target, so readers never observe a half-written file.
pub(crate) fn write_binary<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<(), ModelError> {
	let path = path.as_ref();
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)?;
	}
	let bytes = postcard::to_stdvec(value)?;
	let tmp = path.with_extension("tmp");
	fs::write(&tmp, bytes)?;
	fs::rename(tmp, path)?;
	Ok(())
}

/// Removes a file, treating a missing file as success.
pub(crate) fn remove_if_exists<P: AsRef<Path>>(path: P) -> io::Result<()> {
	match fs::remove_file(path) {
		Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
		_ => Ok(()),
	}
}
