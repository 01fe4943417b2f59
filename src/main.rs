use std::ffi::OsString;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use clap::{ArgAction, Parser};
use trainpix::discover::Discoverer;
use trainpix::download::{Downloader, Orientation};
use trainpix::fetch::HttpFetcher;
use trainpix::pacing::Pacing;
use trainpix::{site, upscale};

/// trainpix - downloads the top voted photos from trainpix.org
#[derive(Parser)]
struct Args {
	/// Number of listing pages to take pictures from, -1 for all of them
	#[arg(short, long, default_value_t = 10, allow_negative_numbers = true, env = "TRAINPIX_PAGES")]
	pages: i64,

	/// Where pictures are saved [default: current directory]
	#[arg(short, long, env = "TRAINPIX_DIR")]
	dir: Option<PathBuf>,

	/// Directory with upscaled files. Photos upscaled there are not downloaded
	/// again, so the downloaded originals can be deleted
	#[arg(short, long, env = "TRAINPIX_UPSCALES")]
	upscales: Option<PathBuf>,

	/// Compression ratio the upscales were made with
	#[arg(long, default_value_t = upscale::DEFAULT_RATIO)]
	ratio: u32,

	/// Allow horizontal pictures
	#[arg(long, default_value_t = true, num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
	horiz: bool,

	/// Allow vertical pictures
	#[arg(long, default_value_t = false, num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
	vert: bool,

	/// Stop after collecting this many picture URLs
	#[arg(long)]
	limit: Option<usize>,

	/// Pause after every request, in milliseconds
	#[arg(long, default_value_t = 1000)]
	delay_ms: u64,

	/// Extra random pause between listing pages, in milliseconds
	#[arg(long, default_value_t = 1000)]
	jitter_ms: u64,
}

/// Flags that may also be spelled with a single dash, `-pages 10` or `-vert=false`.
const SINGLE_DASH_FLAGS: [&str; 5] = ["pages", "dir", "upscales", "horiz", "vert"];

fn single_dash_to_long(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
	args.into_iter()
		.map(|arg| {
			let single_dash = arg.to_str().and_then(|s| s.strip_prefix('-')).is_some_and(|rest| {
				let name = rest.split('=').next().unwrap_or(rest);
				SINGLE_DASH_FLAGS.contains(&name)
			});
			if single_dash {
				let mut long = OsString::from("-");
				long.push(&arg);
				long
			} else {
				arg
			}
		})
		.collect()
}

fn main() -> anyhow::Result<()> {
	env_logger::builder()
		.filter_level(log::LevelFilter::Info)
		.parse_default_env()
		.init();

	let args = Args::try_parse_from(single_dash_to_long(std::env::args_os())).unwrap_or_else(|e| {
		if e.use_stderr() {
			let _ = e.print();
			exit(1);
		}
		e.exit()
	});
	let orientation = match Orientation::new(args.horiz, args.vert) {
		Ok(orientation) => orientation,
		Err(e) => {
			log::error!("Can't start: {}", e);
			exit(1);
		}
	};
	let dir = match args.dir {
		Some(dir) => dir,
		None => std::env::current_dir()?,
	};
	std::fs::create_dir_all(&dir)?;

	log::info!("Started");
	log::info!("Using pages = {}, dir = {}", args.pages, dir.display());
	match &args.upscales {
		Some(upscales) => log::info!("Using upscales dir = {}", upscales.display()),
		None => log::info!("Working without upscales dir"),
	}
	log::info!(
		"<allow horizontal> = {}, <allow vertical> = {} (not checked while downloading)",
		orientation.horizontal,
		orientation.vertical
	);

	// negative means every page
	let max_pages = usize::try_from(args.pages).ok();
	let delay = Duration::from_millis(args.delay_ms);
	let page_pacing = Pacing {
		delay,
		jitter: Duration::from_millis(args.jitter_ms),
	};
	let photo_pacing = Pacing::flat(delay);

	let fetcher = HttpFetcher::new(site::USER_AGENT)?;
	let photos = Discoverer::new(&fetcher)?
		.with_pacing(page_pacing)
		.with_limit(args.limit)
		.discover(max_pages);

	let downloader = Downloader::new(&fetcher, &dir).with_upscales(args.upscales, args.ratio);
	for url in &photos {
		log::info!("Downloading {}", url);
		let already_present = match downloader.download(url) {
			Ok(outcome) => outcome.already_present(),
			Err(e) => {
				log::warn!("Error while downloading a photo {}: {}", url, e);
				false
			}
		};
		if !already_present {
			photo_pacing.pause();
		}
	}
	log::info!("All done");
	Ok(())
}
