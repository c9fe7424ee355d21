use shutter_domain::request::RequestError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Configuration error: {message}")]
	Config { message: String },
	#[error("Upstream error: {message}")]
	Upstream { message: String },
}
impl From<RequestError> for Error {
	fn from(err: RequestError) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<shutter_providers::Error> for Error {
	fn from(err: shutter_providers::Error) -> Self {
		match err {
			shutter_providers::Error::InvalidConfig { message } => Self::Config { message },
			other => Self::Upstream { message: other.to_string() },
		}
	}
}
