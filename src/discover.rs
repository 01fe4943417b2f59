use scraper::{Html, Selector};
use url::Url;

use crate::error::{Error, Result};
use crate::fetch::{Fetch, fetch_html};
use crate::pacing::Pacing;
use crate::site;

/// Full-size photo URLs for every thumbnail on one listing page, in document
/// order. Thumbnails without a usable `src` are logged and skipped.
pub fn find_images(html: &str, base: &Url, selector: &Selector) -> Vec<String> {
	let document = Html::parse_document(html);

	let mut img_urls = Vec::new();
	for element in document.select(selector) {
		let src = match element.value().attr("src") {
			Some(src) if !src.trim().is_empty() => src.trim(),
			_ => {
				log::warn!("Some image has an empty image path");
				continue;
			}
		};
		match site::full_size_url(base, src) {
			Ok(url) => img_urls.push(url),
			Err(e) => log::warn!("Skipping image: {}", e),
		}
	}
	img_urls
}

/// Walks the paginated voting results and collects full-size photo URLs.
pub struct Discoverer<F> {
	fetcher: F,
	base: Url,
	allowed_domain: String,
	selector: Selector,
	pacing: Pacing,
	limit: Option<usize>,
}

impl<F: Fetch> Discoverer<F> {
	pub fn new(fetcher: F) -> Result<Self> {
		let selector = Selector::parse(site::THUMBNAIL_SELECTOR)
			.map_err(|_| Error::Selector(site::THUMBNAIL_SELECTOR.to_string()))?;
		Ok(Self {
			fetcher,
			base: site::base_url(),
			allowed_domain: site::ALLOWED_DOMAIN.to_string(),
			selector,
			pacing: Pacing::default(),
			limit: None,
		})
	}

	pub fn with_pacing(mut self, pacing: Pacing) -> Self {
		self.pacing = pacing;
		self
	}

	/// Stop once this many URLs were collected.
	pub fn with_limit(mut self, limit: Option<usize>) -> Self {
		self.limit = limit;
		self
	}

	/// Visits listing pages `0..max_pages` (all of them when `None`) and stops
	/// at the first page that yields nothing, which is how running past the
	/// last page shows up. A page that can't be fetched ends the walk too.
	pub fn discover(&self, max_pages: Option<usize>) -> Vec<String> {
		let mut result = Vec::new();
		if self.limit == Some(0) {
			return result;
		}
		for page in 0..max_pages.unwrap_or(usize::MAX) {
			let found = match site::listing_url(&self.base, page).and_then(|url| self.visit(&url)) {
				Ok(found) => found,
				Err(e) => {
					log::warn!("Unable to fetch listing page {}: {}", page, e);
					break;
				}
			};
			if found.is_empty() {
				break;
			}
			log::info!("Fetched {} pictures URLs", found.len());
			result.extend(found);

			if let Some(limit) = self.limit
				&& result.len() >= limit
			{
				result.truncate(limit);
				break;
			}
		}
		result
	}

	fn visit(&self, url: &Url) -> Result<Vec<String>> {
		if url.host_str() != Some(self.allowed_domain.as_str()) {
			return Err(Error::DomainNotAllowed(url.to_string()));
		}
		log::info!("Visiting {}", url);
		let html = fetch_html(&self.fetcher, url.as_str());
		self.pacing.pause();
		let found = find_images(&html?, &self.base, &self.selector);
		log::info!("Scraped {}", url);
		Ok(found)
	}
}
