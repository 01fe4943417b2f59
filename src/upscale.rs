//! JPEG → 2× PNG (waifu2x) → PPM → JPEG2000 (opj_compress).
//!
//! Both external tools sit behind a trait so the pipeline can run without
//! them. Intermediates live in a scratch directory under random names and
//! are removed whatever stage fails; the JPEG2000 file is staged next to its
//! final name and renamed in only after the encoder succeeded.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

use crate::error::{Error, Result};
use crate::fsutil::{TempPath, file_exists, remove_stale, scratch_path};
use crate::site;

pub const DEFAULT_RATIO: u32 = 15;
pub const WAIFU2X_CMD: &str = "waifu2xmetal";
pub const OPJ_COMPRESS_CMD: &str = "opj_compress";

/// Enlarges a JPEG into a PNG.
pub trait Upscale {
	fn upscale(&self, input: &Path, output_png: &Path) -> Result<()>;
}

/// Compresses a PPM into a JPEG2000 file.
pub trait Encode {
	fn encode(&self, input_ppm: &Path, output_jp2: &Path) -> Result<()>;
}

pub struct Waifu2x {
	program: String,
}

impl Waifu2x {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
		}
	}
}

impl Upscale for Waifu2x {
	fn upscale(&self, input: &Path, output_png: &Path) -> Result<()> {
		// photo model, 2x, strongest noise reduction
		let mut command = Command::new(&self.program);
		command
			.args(["-t", "p", "-s", "2", "-n", "4", "-i"])
			.arg(input)
			.arg("-o")
			.arg(output_png);
		run_tool(&self.program, &mut command)
	}
}

pub struct OpjCompress {
	program: String,
	ratio: u32,
}

impl OpjCompress {
	pub fn new(program: impl Into<String>, ratio: u32) -> Self {
		Self {
			program: program.into(),
			ratio,
		}
	}
}

impl Encode for OpjCompress {
	fn encode(&self, input_ppm: &Path, output_jp2: &Path) -> Result<()> {
		let mut command = Command::new(&self.program);
		command
			.arg("-r")
			.arg(self.ratio.to_string())
			.arg("-i")
			.arg(input_ppm)
			.arg("-o")
			.arg(output_jp2);
		run_tool(&self.program, &mut command)
	}
}

fn run_tool(program: &str, command: &mut Command) -> Result<()> {
	let output = command
		.stdin(Stdio::null())
		.output()
		.map_err(|source| Error::Spawn {
			program: program.to_string(),
			source,
		})?;
	if !output.status.success() {
		return Err(Error::ToolFailed {
			program: program.to_string(),
			status: output.status,
			stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
		});
	}
	Ok(())
}

/// Decodes a PNG and writes it back as a binary (P6) PPM.
pub fn png_to_ppm(png: &Path, ppm: &Path) -> Result<()> {
	let input = File::open(png).map_err(|e| Error::io("unable to open PNG", png, e))?;
	let rgb = image::load(BufReader::new(input), ImageFormat::Png)?.to_rgb8();

	let output = File::create(ppm).map_err(|e| Error::io("unable to create PPM", ppm, e))?;
	let mut writer = BufWriter::new(output);
	PnmEncoder::new(&mut writer)
		.with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
		.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)?;
	writer.flush().map_err(|e| Error::io("unable to write PPM", ppm, e))
}

/// `name` is a downloaded photo rather than a half-written one.
pub fn is_source_jpeg(name: &str) -> bool {
	let lower = name.to_ascii_lowercase();
	lower.ends_with(".jpg") && !lower.ends_with(".tmp.jpg")
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
	pub upscaled: usize,
	pub skipped: usize,
}

pub struct Pipeline<U, E> {
	upscaler: U,
	encoder: E,
	ratio: u32,
	scratch: PathBuf,
}

impl<U: Upscale, E: Encode> Pipeline<U, E> {
	/// `ratio` only names the outputs; the encoder is configured on its own.
	pub fn new(upscaler: U, encoder: E, ratio: u32) -> Self {
		Self {
			upscaler,
			encoder,
			ratio,
			scratch: std::env::temp_dir(),
		}
	}

	pub fn with_scratch(mut self, dir: impl Into<PathBuf>) -> Self {
		self.scratch = dir.into();
		self
	}

	/// Upscales every photo in `in_dir` that has no output in `out_dir` yet,
	/// in file name order. The first failing photo ends the pass.
	pub fn upscale_directory(&self, in_dir: &Path, out_dir: &Path) -> Result<Summary> {
		let mut names = Vec::new();
		let entries = fs::read_dir(in_dir).map_err(|e| Error::io("unable to open input directory", in_dir, e))?;
		for entry in entries {
			let entry = entry.map_err(|e| Error::io("unable to read files", in_dir, e))?;
			if !entry.path().is_file() {
				continue;
			}
			match entry.file_name().into_string() {
				Ok(name) if is_source_jpeg(&name) => names.push(name),
				Ok(_) => {}
				Err(name) => log::warn!("Skipping non UTF-8 file name {:?}", name),
			}
		}
		names.sort();

		let mut summary = Summary::default();
		for name in names {
			let output = out_dir.join(site::upscaled_file_name(&name, self.ratio));
			if file_exists(&output)? {
				log::debug!("File {} already upscaled", name);
				summary.skipped += 1;
				continue;
			}
			self.transform_file(&in_dir.join(&name), &output)?;
			summary.upscaled += 1;
		}
		Ok(summary)
	}

	pub fn transform_file(&self, input: &Path, output: &Path) -> Result<()> {
		let png = TempPath::new(scratch_path(&self.scratch, "png"));
		let ppm = TempPath::new(scratch_path(&self.scratch, "ppm"));

		log::info!("Upscaling file {}", input.display());
		self.upscaler.upscale(input, png.path())?;
		png_to_ppm(png.path(), ppm.path())?;

		let staged = staging_path(output);
		remove_stale(&staged)?;
		let staged = TempPath::new(staged);
		self.encoder.encode(ppm.path(), staged.path())?;
		staged.persist(output)
	}
}

/// `<output>.tmp.jp2`
fn staging_path(output: &Path) -> PathBuf {
	let mut name = OsString::from(output.as_os_str());
	name.push(".tmp.jp2");
	PathBuf::from(name)
}

#[cfg(test)]
mod tests {
	use std::cell::{Cell, RefCell};

	use image::{Rgb, RgbImage};

	use super::*;

	/// Writes a small PNG instead of calling waifu2x.
	#[derive(Default)]
	struct FakeUpscaler {
		inputs: RefCell<Vec<PathBuf>>,
		fail: bool,
	}

	impl Upscale for FakeUpscaler {
		fn upscale(&self, input: &Path, output_png: &Path) -> Result<()> {
			self.inputs.borrow_mut().push(input.to_path_buf());
			if self.fail {
				return Err(Error::Config("upscaler refused".to_string()));
			}
			let img = RgbImage::from_pixel(4, 2, Rgb([200, 10, 30]));
			img.save_with_format(output_png, ImageFormat::Png)?;
			Ok(())
		}
	}

	/// Copies the PPM instead of calling opj_compress.
	#[derive(Default)]
	struct FakeEncoder {
		calls: Cell<usize>,
		fail: bool,
	}

	impl Encode for FakeEncoder {
		fn encode(&self, input_ppm: &Path, output_jp2: &Path) -> Result<()> {
			self.calls.set(self.calls.get() + 1);
			fs::copy(input_ppm, output_jp2).map_err(|e| Error::io("copy", output_jp2, e))?;
			if self.fail {
				return Err(Error::Config("encoder refused".to_string()));
			}
			Ok(())
		}
	}

	fn listing(dir: &Path) -> Vec<String> {
		let mut names: Vec<String> = fs::read_dir(dir)
			.unwrap()
			.map(|e| e.unwrap().file_name().into_string().unwrap())
			.collect();
		names.sort();
		names
	}

	#[test]
	fn picks_finished_jpegs_only() {
		assert!(is_source_jpeg("77.jpg"));
		assert!(is_source_jpeg("77.JPG"));
		assert!(!is_source_jpeg("77.tmp.jpg"));
		assert!(!is_source_jpeg("77.TMP.JPG"));
		assert!(!is_source_jpeg("77.jpeg"));
		assert!(!is_source_jpeg("77.jpg.15opj.jp2"));
	}

	#[test]
	fn ppm_is_binary_pixmap() {
		let dir = tempfile::tempdir().unwrap();
		let png = dir.path().join("in.png");
		let ppm = dir.path().join("out.ppm");
		RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])).save_with_format(&png, ImageFormat::Png).unwrap();

		png_to_ppm(&png, &ppm).unwrap();
		let bytes = fs::read(&ppm).unwrap();
		assert!(bytes.starts_with(b"P6"));
		assert!(bytes.ends_with(&[1, 2, 3, 1, 2, 3]));
	}

	#[test]
	fn upscales_directory_without_leftovers() {
		let input = tempfile::tempdir().unwrap();
		let output = tempfile::tempdir().unwrap();
		let scratch = tempfile::tempdir().unwrap();
		fs::write(input.path().join("77.jpg"), b"jpeg").unwrap();
		fs::write(input.path().join("77.tmp.jpg"), b"partial").unwrap();
		fs::write(input.path().join("notes.txt"), b"text").unwrap();
		fs::create_dir(input.path().join("old.jpg")).unwrap();

		let pipeline = Pipeline::new(FakeUpscaler::default(), FakeEncoder::default(), DEFAULT_RATIO)
			.with_scratch(scratch.path());
		let summary = pipeline.upscale_directory(input.path(), output.path()).unwrap();

		assert_eq!(summary, Summary { upscaled: 1, skipped: 0 });
		assert_eq!(*pipeline.upscaler.inputs.borrow(), vec![input.path().join("77.jpg")]);
		assert_eq!(listing(output.path()), vec!["77.jpg.15opj.jp2"]);
		assert!(fs::read(output.path().join("77.jpg.15opj.jp2")).unwrap().starts_with(b"P6"));
		assert!(listing(scratch.path()).is_empty());
	}

	#[test]
	fn existing_output_skips_every_stage() {
		let input = tempfile::tempdir().unwrap();
		let output = tempfile::tempdir().unwrap();
		let scratch = tempfile::tempdir().unwrap();
		fs::write(input.path().join("77.jpg"), b"jpeg").unwrap();
		fs::write(output.path().join("77.jpg.15opj.jp2"), b"done").unwrap();

		let pipeline = Pipeline::new(FakeUpscaler::default(), FakeEncoder::default(), DEFAULT_RATIO)
			.with_scratch(scratch.path());
		let summary = pipeline.upscale_directory(input.path(), output.path()).unwrap();

		assert_eq!(summary, Summary { upscaled: 0, skipped: 1 });
		assert!(pipeline.upscaler.inputs.borrow().is_empty());
		assert_eq!(pipeline.encoder.calls.get(), 0);
		assert_eq!(fs::read(output.path().join("77.jpg.15opj.jp2")).unwrap(), b"done");
	}

	#[test]
	fn first_failure_ends_the_pass() {
		let input = tempfile::tempdir().unwrap();
		let output = tempfile::tempdir().unwrap();
		let scratch = tempfile::tempdir().unwrap();
		fs::write(input.path().join("1.jpg"), b"jpeg").unwrap();
		fs::write(input.path().join("2.jpg"), b"jpeg").unwrap();

		let upscaler = FakeUpscaler {
			fail: true,
			..Default::default()
		};
		let pipeline = Pipeline::new(upscaler, FakeEncoder::default(), DEFAULT_RATIO).with_scratch(scratch.path());
		assert!(pipeline.upscale_directory(input.path(), output.path()).is_err());

		assert_eq!(*pipeline.upscaler.inputs.borrow(), vec![input.path().join("1.jpg")]);
		assert!(listing(output.path()).is_empty());
		assert!(listing(scratch.path()).is_empty());
	}

	#[test]
	fn failed_encoding_removes_staged_output() {
		let output = tempfile::tempdir().unwrap();
		let scratch = tempfile::tempdir().unwrap();
		let target = output.path().join("5.jpg.15opj.jp2");
		fs::write(staging_path(&target), b"stale").unwrap();

		let encoder = FakeEncoder {
			fail: true,
			..Default::default()
		};
		let pipeline = Pipeline::new(FakeUpscaler::default(), encoder, DEFAULT_RATIO).with_scratch(scratch.path());
		assert!(pipeline.transform_file(Path::new("5.jpg"), &target).is_err());

		assert_eq!(pipeline.encoder.calls.get(), 1);
		assert!(listing(output.path()).is_empty());
		assert!(listing(scratch.path()).is_empty());
	}

	#[test]
	fn staging_path_appends_suffix() {
		assert_eq!(
			staging_path(Path::new("/out/77.jpg.15opj.jp2")),
			PathBuf::from("/out/77.jpg.15opj.jp2.tmp.jp2")
		);
	}

	#[cfg(unix)]
	#[test]
	fn tool_exit_status_is_checked() {
		let err = Waifu2x::new("false").upscale(Path::new("a.jpg"), Path::new("a.png")).unwrap_err();
		assert!(matches!(err, Error::ToolFailed { .. }), "{err}");

		let err = OpjCompress::new("trainpix-no-such-tool", 15)
			.encode(Path::new("a.ppm"), Path::new("a.jp2"))
			.unwrap_err();
		assert!(matches!(err, Error::Spawn { .. }), "{err}");

		Waifu2x::new("true").upscale(Path::new("a.jpg"), Path::new("a.png")).unwrap();
	}
}
