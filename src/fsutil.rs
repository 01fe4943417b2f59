//! Filesystem helpers. File existence is the only state this crate keeps, so
//! every artifact is staged under a temporary name and renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{Error, Result};

/// Reports whether something exists at `path`. A missing entry is `Ok(false)`,
/// any other failure to look is an error.
pub fn file_exists(path: &Path) -> Result<bool> {
	match fs::metadata(path) {
		Ok(_) => Ok(true),
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
		Err(e) => Err(Error::io("can't look at file", path, e)),
	}
}

/// Deletes a leftover from an aborted run. Returns whether anything was removed.
pub fn remove_stale(path: &Path) -> Result<bool> {
	match fs::remove_file(path) {
		Ok(()) => {
			log::debug!("Removed stale temp file {}", path.display());
			Ok(true)
		}
		Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
		Err(e) => Err(Error::io("can't remove temp file", path, e)),
	}
}

/// Random file name in `dir` ending in `.{ext}`. Loops until the name is free.
pub fn scratch_path(dir: &Path, ext: &str) -> PathBuf {
	loop {
		let name: String = rand::rng()
			.sample_iter(rand::distr::Alphanumeric)
			.take(16)
			.map(char::from)
			.collect();
		let path = dir.join(format!("{name}.{ext}"));
		if !path.exists() {
			break path;
		}
	}
}

/// Removes the wrapped path when dropped, whether or not the file was ever
/// created or already renamed away.
#[derive(Debug)]
pub struct TempPath {
	path: PathBuf,
}

impl TempPath {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Renames the staged file onto `dest`. After this the guard has nothing
	/// left to clean up.
	pub fn persist(self, dest: &Path) -> Result<()> {
		fs::rename(&self.path, dest).map_err(|e| Error::io("can't rename file", dest, e))
	}
}

impl Drop for TempPath {
	fn drop(&mut self) {
		match fs::remove_file(&self.path) {
			Ok(()) => {}
			Err(e) if e.kind() == ErrorKind::NotFound => {}
			Err(e) => log::warn!("Unable to remove temp file {}: {}", self.path.display(), e),
		}
	}
}
