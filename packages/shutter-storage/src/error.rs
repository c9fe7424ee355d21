#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Cache backend error: {message}")]
	Backend { message: String },
	#[error("Cached payload for {key} could not be decoded.")]
	Decode {
		key: String,
		#[source]
		source: serde_json::Error,
	},
	#[error(transparent)]
	Encode(#[from] serde_json::Error),
}
