use std::io::Read;

use reqwest::blocking::Client;

use crate::error::{Error, Result};

/// Something that can GET a URL. Only 2xx responses are handed back; their
/// body is streamed through the returned reader.
pub trait Fetch {
	fn get(&self, url: &str) -> Result<Box<dyn Read>>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
	fn get(&self, url: &str) -> Result<Box<dyn Read>> {
		(**self).get(url)
	}
}

/// Blocking reqwest client sending a fixed user agent.
pub struct HttpFetcher {
	client: Client,
}

impl HttpFetcher {
	pub fn new(user_agent: &str) -> Result<Self> {
		let client = Client::builder()
			.user_agent(user_agent)
			.build()
			.map_err(Error::Client)?;
		Ok(Self { client })
	}
}

impl Fetch for HttpFetcher {
	fn get(&self, url: &str) -> Result<Box<dyn Read>> {
		let response = self.client.get(url).send().map_err(|source| Error::Transport {
			url: url.to_string(),
			source,
		})?;
		let status = response.status();
		if !status.is_success() {
			return Err(Error::Status {
				url: url.to_string(),
				status,
			});
		}
		Ok(Box::new(response))
	}
}

pub fn fetch_html(fetcher: &impl Fetch, url: &str) -> Result<String> {
	let mut body = String::new();
	fetcher
		.get(url)?
		.read_to_string(&mut body)
		.map_err(|source| Error::Body {
			url: url.to_string(),
			source,
		})?;
	Ok(body)
}
