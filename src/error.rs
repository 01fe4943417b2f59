use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("can't extract photo ID from '{0}'")]
	PhotoId(String),

	#[error("can't parse selector '{0}'")]
	Selector(String),

	#[error("invalid URL '{url}': {source}")]
	Url {
		url: String,
		#[source]
		source: url::ParseError,
	},

	#[error("domain of '{0}' is not allowed")]
	DomainNotAllowed(String),

	#[error("can't build HTTP client: {0}")]
	Client(#[source] reqwest::Error),

	#[error("can't read response from '{url}': {source}")]
	Body {
		url: String,
		#[source]
		source: std::io::Error,
	},

	#[error("can't do request to '{url}': {source}")]
	Transport {
		url: String,
		#[source]
		source: reqwest::Error,
	},

	#[error("'{url}' answered with status {status}")]
	Status {
		url: String,
		status: reqwest::StatusCode,
	},

	#[error("{context} '{}': {source}", .path.display())]
	Io {
		context: &'static str,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("could not start '{program}': {source}")]
	Spawn {
		program: String,
		#[source]
		source: std::io::Error,
	},

	#[error("'{program}' finished abnormally ({status}): {stderr}")]
	ToolFailed {
		program: String,
		status: ExitStatus,
		stderr: String,
	},

	#[error("image codec: {0}")]
	Image(#[from] image::ImageError),
}

impl Error {
	pub(crate) fn io(context: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
		Error::Io {
			context,
			path: path.into(),
			source,
		}
	}
}

pub type Result<T> = std::result::Result<T, Error>;
