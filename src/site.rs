//! Everything specific to trainpix.org: where the listings live, how a
//! thumbnail maps to its full-size photo and how photo IDs are spelled.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};

pub const BASE_URL: &str = "https://trainpix.org/";
pub const ALLOWED_DOMAIN: &str = "trainpix.org";
pub const USER_AGENT: &str = "ImagesCrawler";
/// Thumbnails on the voting results listing.
pub const THUMBNAIL_SELECTOR: &str = ".main img.f";
/// Photos per listing page, used for the `st` offset.
pub const PAGE_SIZE: usize = 10;

static THUMBNAIL: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"/(\d+)_s\.jpg$").expect("thumbnail pattern"));
static PHOTO: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/(\d+)\.jpg$").expect("photo pattern"));

pub fn base_url() -> Url {
	Url::parse(BASE_URL).expect("base URL")
}

/// `voting.php?show=results&st=<offset>` for the zero-based `page`.
pub fn listing_url(base: &Url, page: usize) -> Result<Url> {
	let mut url = base.join("voting.php").map_err(|source| Error::Url {
		url: base.to_string(),
		source,
	})?;
	url.query_pairs_mut()
		.append_pair("show", "results")
		.append_pair("st", &page.saturating_mul(PAGE_SIZE).to_string());
	Ok(url)
}

/// Turns a thumbnail `src` into the full-size photo URL: `/77_s.jpg` becomes
/// `https://trainpix.org/77.jpg`. A `src` that is not a thumbnail keeps its
/// path, and absolute URLs are not resolved again.
pub fn full_size_url(base: &Url, src: &str) -> Result<String> {
	let full = THUMBNAIL.replace_all(src, "/${1}.jpg");
	if full.to_ascii_lowercase().starts_with("http") {
		return Ok(full.into_owned());
	}
	base.join(&full)
		.map(|url| url.to_string())
		.map_err(|source| Error::Url {
			url: full.into_owned(),
			source,
		})
}

/// Numeric ID of a full-size photo URL.
pub fn photo_id(url: &str) -> Result<&str> {
	PHOTO
		.captures(url)
		.and_then(|caps| caps.get(1))
		.map(|m| m.as_str())
		.ok_or_else(|| Error::PhotoId(url.to_string()))
}

/// Name of the JPEG2000 file made from `file_name`, e.g. `77.jpg.15opj.jp2`.
pub fn upscaled_file_name(file_name: &str, ratio: u32) -> String {
	format!("{file_name}.{ratio}opj.jp2")
}
