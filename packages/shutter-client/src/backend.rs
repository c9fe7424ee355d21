use std::time::Duration;

use reqwest::{
	Client, Response,
	multipart::{Form, Part},
};
use serde::Deserialize;

use shutter_domain::{DateRange, ImagePayload, PageEnvelope, SearchInput, SearchMode};

use crate::{BoxFuture, Error, Result};

/// One search as issued by the controller.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRequest {
	pub input: SearchInput,
	pub threshold: f32,
	pub date_range: DateRange,
	pub page: u32,
}
impl ClientRequest {
	pub fn mode(&self) -> SearchMode {
		match self.input {
			SearchInput::Text(_) => SearchMode::Text,
			SearchInput::Image(_) => SearchMode::Image,
		}
	}

	fn query_pairs(&self) -> Vec<(&'static str, String)> {
		let mut pairs = Vec::new();

		if let SearchInput::Text(query) = &self.input {
			pairs.push(("query", query.clone()));
		}

		pairs.push(("page", self.page.to_string()));
		pairs.push(("certainty_threshold", self.threshold.to_string()));

		if let Some(start) = self.date_range.start {
			pairs.push(("start_date", start.to_string()));
		}
		if let Some(end) = self.date_range.end {
			pairs.push(("end_date", end.to_string()));
		}

		pairs
	}
}

pub trait SearchBackend
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, request: &'a ClientRequest) -> BoxFuture<'a, Result<PageEnvelope>>;
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug, Deserialize)]
pub struct Suggestions {
	pub suggestions: Vec<String>,
}

/// Talks to the search HTTP API.
#[derive(Debug, Clone)]
pub struct HttpSearchBackend {
	client: Client,
	api_base: String,
}
impl HttpSearchBackend {
	pub fn new(api_base: &str, timeout: Duration) -> Result<Self> {
		let client = Client::builder().timeout(timeout).build()?;

		Ok(Self { client, api_base: api_base.trim_end_matches('/').to_string() })
	}

	pub async fn search_page(&self, request: &ClientRequest) -> Result<PageEnvelope> {
		let pairs = request.query_pairs();
		let req = match &request.input {
			SearchInput::Text(_) =>
				self.client.get(format!("{}/api/search", self.api_base)).query(&pairs),
			SearchInput::Image(image) => self
				.client
				.post(format!("{}/api/search/image", self.api_base))
				.query(&pairs)
				.multipart(Form::new().part("file", image_part(image)?)),
		};
		let res = check_status(req.send().await?).await?;

		Ok(res.json().await?)
	}

	pub async fn suggest(
		&self,
		query: Option<&str>,
		image: Option<&ImagePayload>,
	) -> Result<Vec<String>> {
		let mut form = Form::new();

		if let Some(query) = query {
			form = form.text("query", query.to_string());
		}
		if let Some(image) = image {
			form = form.part("image", image_part(image)?);
		}

		let res = self
			.client
			.post(format!("{}/api/suggestions", self.api_base))
			.multipart(form)
			.send()
			.await?;
		let body: Suggestions = check_status(res).await?.json().await?;

		Ok(body.suggestions)
	}
}
impl SearchBackend for HttpSearchBackend {
	fn search<'a>(&'a self, request: &'a ClientRequest) -> BoxFuture<'a, Result<PageEnvelope>> {
		Box::pin(self.search_page(request))
	}
}

fn image_part(image: &ImagePayload) -> Result<Part> {
	let part = Part::bytes(image.bytes.to_vec()).file_name(image.file_name.clone());

	match image.content_type.as_deref() {
		Some(content_type) => Ok(part.mime_str(content_type)?),
		None => Ok(part),
	}
}

async fn check_status(res: Response) -> Result<Response> {
	let status = res.status();

	if status.is_success() {
		return Ok(res);
	}

	let body = res.text().await.unwrap_or_default();

	match serde_json::from_str::<ApiErrorBody>(&body) {
		Ok(api) => Err(Error::Api {
			status: status.as_u16(),
			error_code: api.error_code,
			message: api.message,
		}),
		Err(_) => Err(Error::InvalidResponse {
			message: format!("Search API returned HTTP {}.", status.as_u16()),
		}),
	}
}

#[cfg(test)]
mod tests {
	use time::macros::date;

	use super::*;

	#[test]
	fn text_requests_carry_every_parameter() {
		let request = ClientRequest {
			input: SearchInput::Text("misty forest".to_string()),
			threshold: 0.65,
			date_range: DateRange::new(Some(date!(2024-01-01)), Some(date!(2024-01-31))),
			page: 2,
		};

		assert_eq!(request.query_pairs(), vec![
			("query", "misty forest".to_string()),
			("page", "2".to_string()),
			("certainty_threshold", "0.65".to_string()),
			("start_date", "2024-01-01".to_string()),
			("end_date", "2024-01-31".to_string()),
		]);
	}

	#[test]
	fn image_requests_omit_query_and_open_bounds() {
		let request = ClientRequest {
			input: SearchInput::Image(ImagePayload::new(vec![1_u8], "a.jpg")),
			threshold: 0.5,
			date_range: DateRange::default(),
			page: 1,
		};
		let keys: Vec<_> = request.query_pairs().into_iter().map(|(key, _)| key).collect();

		assert_eq!(request.mode(), SearchMode::Image);
		assert_eq!(keys, vec!["page", "certainty_threshold"]);
	}
}
