use axum::{
	Json, Router,
	extract::{DefaultBodyLimit, Multipart, Query, State, rejection::QueryRejection},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use shutter_domain::{ImagePayload, PageEnvelope};
use shutter_service::{
	Error as ServiceError, SearchQuery,
	suggest::{DescriptionResponse, SuggestionResponse},
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	let max_upload_bytes = state.service.cfg.service.max_upload_bytes;

	Router::new()
		.route("/health", get(health))
		.route("/api/search", get(search_text))
		.route("/api/search/image", post(search_image))
		.route("/api/suggestions", post(suggestions))
		.route("/api/describe-image", post(describe_image))
		.layer(DefaultBodyLimit::max(max_upload_bytes))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search_text(
	State(state): State<AppState>,
	params: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<PageEnvelope>, ApiError> {
	let Query(params) = params.map_err(query_rejection)?;
	let request = state.service.text_request(&params)?;
	let span = tracing::info_span!("search", request_id = %Uuid::new_v4(), mode = "text");
	let envelope = state.service.resolve_page(&request).instrument(span).await?;

	Ok(Json(envelope))
}

async fn search_image(
	State(state): State<AppState>,
	params: Result<Query<SearchQuery>, QueryRejection>,
	multipart: Multipart,
) -> Result<Json<PageEnvelope>, ApiError> {
	let Query(params) = params.map_err(query_rejection)?;
	let form = UploadForm::read(multipart).await?;
	let image = form.image.ok_or_else(|| missing_field("file"))?;
	let request = state.service.image_request(&params, image)?;
	let span = tracing::info_span!("search", request_id = %Uuid::new_v4(), mode = "image");
	let envelope = state.service.resolve_page(&request).instrument(span).await?;

	Ok(Json(envelope))
}

async fn suggestions(
	State(state): State<AppState>,
	multipart: Multipart,
) -> Result<Json<SuggestionResponse>, ApiError> {
	let form = UploadForm::read(multipart).await?;
	let response = state.service.suggest(form.query.as_deref(), form.image.as_ref()).await?;

	Ok(Json(response))
}

async fn describe_image(
	State(state): State<AppState>,
	multipart: Multipart,
) -> Result<Json<DescriptionResponse>, ApiError> {
	let form = UploadForm::read(multipart).await?;
	let image = form.image.ok_or_else(|| missing_field("file"))?;
	let response = state.service.describe_image(&image).await?;

	Ok(Json(response))
}

/// Fields accepted by the multipart endpoints. The upload may be named `file` or `image`.
#[derive(Debug, Default)]
struct UploadForm {
	query: Option<String>,
	image: Option<ImagePayload>,
}
impl UploadForm {
	async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
		let mut form = Self::default();

		while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
			let name = field.name().unwrap_or_default().to_string();

			match name.as_str() {
				"file" | "image" => {
					let file_name = field.file_name().unwrap_or("upload").to_string();
					let content_type = field.content_type().map(str::to_string);
					let bytes = field.bytes().await.map_err(multipart_error)?;

					if bytes.is_empty() {
						continue;
					}

					let mut image = ImagePayload::new(bytes.to_vec(), file_name);

					if let Some(content_type) = content_type {
						image = image.with_content_type(content_type);
					}

					form.image = Some(image);
				},
				"query" => {
					let text = field.text().await.map_err(multipart_error)?;

					form.query = Some(text).filter(|value| !value.trim().is_empty());
				},
				_ => {},
			}
		}

		Ok(form)
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			ServiceError::Config { message } => {
				tracing::error!(error = %message, "Search service is misconfigured.");

				json_error(StatusCode::INTERNAL_SERVER_ERROR, "config_error", message, None)
			},
			ServiceError::Upstream { message } => {
				tracing::error!(error = %message, "Upstream provider failed.");

				json_error(StatusCode::BAD_GATEWAY, "upstream_error", message, None)
			},
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

fn query_rejection(err: QueryRejection) -> ApiError {
	json_error(StatusCode::BAD_REQUEST, "invalid_request", err.body_text(), None)
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
	json_error(err.status(), "invalid_request", err.body_text(), None)
}

fn missing_field(field: &str) -> ApiError {
	json_error(
		StatusCode::BAD_REQUEST,
		"invalid_request",
		format!("{field} is required."),
		Some(vec![field.to_string()]),
	)
}
