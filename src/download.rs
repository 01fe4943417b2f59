use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::fetch::Fetch;
use crate::fsutil::{TempPath, file_exists, remove_stale};
use crate::site;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
	Downloaded,
	/// `<dir>/<id>.jpg` was already there.
	AlreadyPresent,
	/// The raw JPEG is gone but its upscale exists.
	AlreadyUpscaled,
}

impl Outcome {
	/// True when no request was made for the photo.
	pub fn already_present(self) -> bool {
		!matches!(self, Outcome::Downloaded)
	}
}

/// Which photo orientations the user asked for. Validated, then only logged:
/// nothing decodes photo dimensions, so every photo is downloaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Orientation {
	pub horizontal: bool,
	pub vertical: bool,
}

impl Orientation {
	pub fn new(horizontal: bool, vertical: bool) -> Result<Self> {
		if !horizontal && !vertical {
			return Err(Error::Config(
				"vertical and horizontal photos are disallowed".to_string(),
			));
		}
		Ok(Self {
			horizontal,
			vertical,
		})
	}
}

/// Saves full-size photos as `<dir>/<id>.jpg`, skipping the ones already on disk.
pub struct Downloader<F> {
	fetcher: F,
	dir: PathBuf,
	upscales: Option<PathBuf>,
	ratio: u32,
}

impl<F: Fetch> Downloader<F> {
	pub fn new(fetcher: F, dir: impl Into<PathBuf>) -> Self {
		Self {
			fetcher,
			dir: dir.into(),
			upscales: None,
			ratio: crate::upscale::DEFAULT_RATIO,
		}
	}

	/// Also count a photo as handled when its upscale (made with `ratio`) is in
	/// `dir`, so raw JPEGs can be deleted after upscaling.
	pub fn with_upscales(mut self, dir: Option<PathBuf>, ratio: u32) -> Self {
		self.upscales = dir;
		self.ratio = ratio;
		self
	}

	pub fn download(&self, url: &str) -> Result<Outcome> {
		let id = site::photo_id(url)?;

		let photo_path = self.dir.join(format!("{id}.jpg"));
		if file_exists(&photo_path)? {
			log::debug!("Photo {} already downloaded", id);
			return Ok(Outcome::AlreadyPresent);
		}
		if let Some(upscales) = &self.upscales {
			if self.is_upscaled(upscales, id)? {
				log::debug!("Upscaled photo {} already present", id);
				return Ok(Outcome::AlreadyUpscaled);
			}
		}

		let mut body = self.fetcher.get(url)?;

		let temp_path = self.dir.join(format!("{id}.tmp.jpg"));
		remove_stale(&temp_path)?;
		let tmp = TempPath::new(temp_path);

		let mut file =
			File::create(tmp.path()).map_err(|e| Error::io("unable to create a file", tmp.path(), e))?;
		io::copy(&mut body, &mut file).map_err(|e| Error::io("unable to write a photo", tmp.path(), e))?;
		file.sync_all()
			.map_err(|e| Error::io("unable to flush photo file", tmp.path(), e))?;
		drop(file);

		tmp.persist(&photo_path)?;
		Ok(Outcome::Downloaded)
	}

	fn is_upscaled(&self, upscales: &Path, id: &str) -> Result<bool> {
		let named_after_jpeg = upscales.join(site::upscaled_file_name(&format!("{id}.jpg"), self.ratio));
		if file_exists(&named_after_jpeg)? {
			return Ok(true);
		}
		file_exists(&upscales.join(format!("{id}.jp2")))
	}
}
