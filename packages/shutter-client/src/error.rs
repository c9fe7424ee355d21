pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error("{message} ({error_code}, HTTP {status})")]
	Api { status: u16, error_code: String, message: String },
	#[error("{message}")]
	InvalidResponse { message: String },
}
