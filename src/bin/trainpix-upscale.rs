use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use trainpix::upscale::{self, OpjCompress, Pipeline, Waifu2x};

/// trainpix-upscale - upscales downloaded photos into JPEG2000 files
#[derive(Parser)]
struct Args {
	/// Input directory with downloaded photos
	#[arg(short, long)]
	input: PathBuf,

	/// Output directory for the JPEG2000 files
	#[arg(short, long)]
	output: PathBuf,

	/// waifu2x command
	#[arg(long, default_value = upscale::WAIFU2X_CMD, env = "TRAINPIX_WAIFU2X")]
	waifu2x: String,

	/// opj_compress command
	#[arg(long, default_value = upscale::OPJ_COMPRESS_CMD, env = "TRAINPIX_OPJ_COMPRESS")]
	opj_compress: String,

	/// JPEG2000 compression ratio
	#[arg(long, default_value_t = upscale::DEFAULT_RATIO)]
	ratio: u32,

	/// Directory for intermediate PNG and PPM files [default: system temp dir]
	#[arg(long)]
	scratch: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
	env_logger::builder()
		.filter_level(log::LevelFilter::Info)
		.parse_default_env()
		.init();

	let args = Args::try_parse().unwrap_or_else(|e| {
		if e.use_stderr() {
			let _ = e.print();
			exit(1);
		}
		e.exit()
	});
	log::info!("Using {} for input, {} for output", args.input.display(), args.output.display());
	std::fs::create_dir_all(&args.output)?;

	let mut pipeline = Pipeline::new(
		Waifu2x::new(args.waifu2x),
		OpjCompress::new(args.opj_compress, args.ratio),
		args.ratio,
	);
	if let Some(scratch) = args.scratch {
		pipeline = pipeline.with_scratch(scratch);
	}

	match pipeline.upscale_directory(&args.input, &args.output) {
		Ok(summary) => {
			log::info!("Upscaled {} files, {} already done", summary.upscaled, summary.skipped);
			Ok(())
		}
		Err(e) => {
			log::warn!("Unable to transform: {}", e);
			exit(1);
		}
	}
}
