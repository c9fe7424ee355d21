use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Serialize;
use serde_json::{Value, json};

use shutter_config::LlmProviderConfig;
use shutter_domain::{ImagePayload, request::normalize_query};
use shutter_providers::chat::ChatOptions;

use crate::{Error, Result, ShutterService};

const DESCRIBE_TEMPERATURE: f32 = 0.3;
const DESCRIBE_MAX_TOKENS: u32 = 100;
const DESCRIBE_SYSTEM_PROMPT: &str = "You are an image analyst. Describe images concisely and \
accurately for similarity search: main subjects, composition, lighting, colors, and setting. Avoid \
subjective interpretation.";
const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionResponse {
	pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptionResponse {
	pub description: String,
}

impl ShutterService {
	/// Alternative search phrasings for a text query or an uploaded image. The image wins when
	/// both are present.
	pub async fn suggest(
		&self,
		query: Option<&str>,
		image: Option<&ImagePayload>,
	) -> Result<SuggestionResponse> {
		let llm = self.llm_config()?;
		let max = llm.max_suggestions as usize;
		let query = query.map(normalize_query).filter(|value| !value.is_empty());
		let (model, messages) = match (image, query.as_deref()) {
			(Some(image), _) if !image.bytes.is_empty() =>
				(llm.vision_model.as_str(), image_suggestion_messages(&llm.context, image, max)),
			(_, Some(query)) =>
				(llm.model.as_str(), text_suggestion_messages(&llm.context, query, max)),
			_ =>
				return Err(Error::InvalidRequest {
					message: "Either query or image must be provided.".to_string(),
				}),
		};
		let options =
			ChatOptions { model, temperature: llm.temperature, max_tokens: llm.max_tokens };
		let raw = self.providers.chat.complete(llm, options, &messages).await?;
		let suggestions = parse_suggestions(&raw, max, query.as_deref());

		tracing::info!(model, count = suggestions.len(), "Generated search suggestions.");

		Ok(SuggestionResponse { suggestions })
	}

	pub async fn describe_image(&self, image: &ImagePayload) -> Result<DescriptionResponse> {
		let llm = self.llm_config()?;

		if image.bytes.is_empty() {
			return Err(Error::InvalidRequest {
				message: "image file must be non-empty.".to_string(),
			});
		}

		let messages = vec![
			json!({ "role": "system", "content": DESCRIBE_SYSTEM_PROMPT }),
			json!({
				"role": "user",
				"content": [
					{
						"type": "text",
						"text": "Describe this image so that similar images can be found. Focus on \
the key visual elements, the composition, and distinctive features."
					},
					{ "type": "image_url", "image_url": { "url": data_url(image) } }
				]
			}),
		];
		let options = ChatOptions {
			model: llm.vision_model.as_str(),
			temperature: DESCRIBE_TEMPERATURE,
			max_tokens: DESCRIBE_MAX_TOKENS,
		};
		let raw = self.providers.chat.complete(llm, options, &messages).await?;
		let description = raw.trim().to_string();

		if description.is_empty() {
			return Err(Error::Upstream { message: "Image description was empty.".to_string() });
		}

		Ok(DescriptionResponse { description })
	}

	fn llm_config(&self) -> Result<&LlmProviderConfig> {
		self.cfg.providers.llm.as_ref().ok_or_else(|| Error::Config {
			message: "providers.llm is not configured.".to_string(),
		})
	}
}

/// Splits model output into at most `max` distinct suggestions.
///
/// Lines are stripped of list markers and quotes. When the model answers on a single line, the
/// line is split on commas instead. Echoes of the original query and duplicates are dropped,
/// comparing case-insensitively.
pub fn parse_suggestions(raw: &str, max: usize, original: Option<&str>) -> Vec<String> {
	let lines: Vec<&str> = raw.lines().map(str::trim).filter(|line| !line.is_empty()).collect();
	let candidates: Vec<&str> = if lines.len() == 1 && lines[0].contains(',') {
		lines[0].split(',').collect()
	} else {
		lines
	};
	let original = original.map(str::to_lowercase);
	let mut seen = Vec::new();
	let mut out = Vec::new();

	for candidate in candidates {
		if out.len() >= max {
			break;
		}

		let cleaned = strip_list_marker(candidate);

		// Drops preamble lines such as "For \"morning fog\":".
		if cleaned.is_empty() || cleaned.ends_with(':') {
			continue;
		}

		let folded = cleaned.to_lowercase();

		if original.as_deref() == Some(folded.as_str()) || seen.contains(&folded) {
			continue;
		}

		seen.push(folded);
		out.push(cleaned.to_string());
	}

	out
}

fn strip_list_marker(raw: &str) -> &str {
	let trimmed = raw.trim();
	let without_bullet = trimmed.trim_start_matches(['-', '*', '\u{2022}']).trim_start();
	let digits = without_bullet.chars().take_while(char::is_ascii_digit).count();
	let without_number = if digits > 0 {
		without_bullet[digits..]
			.strip_prefix(['.', ')'])
			.map(str::trim_start)
			.unwrap_or(without_bullet)
	} else {
		without_bullet
	};

	without_number.trim_matches(|c: char| c == '"' || c == '\'').trim()
}

fn text_suggestion_messages(context: &str, query: &str, max: usize) -> Vec<Value> {
	let system = with_context(
		context,
		"You generate alternative search queries for a semantic image search engine. Think like a \
user looking for similar images in natural language.",
	);
	let user = format!(
		"The user is searching for \"{query}\". Suggest {max} alternative search queries that keep \
the meaning of the original, use natural visual descriptions, and vary from specific details to \
broader scenes. Return only the suggestions, one per line, without numbers or bullet points."
	);

	vec![json!({ "role": "system", "content": system }), json!({ "role": "user", "content": user })]
}

fn image_suggestion_messages(context: &str, image: &ImagePayload, max: usize) -> Vec<Value> {
	let system = with_context(
		context,
		"Analyze the image and suggest search queries that would find visually similar images.",
	);
	let prompt = format!(
		"Based on this image, suggest {max} search queries that would find similar images. \
Focus on visual elements. Format them as a comma-separated list."
	);

	vec![
		json!({ "role": "system", "content": system }),
		json!({
			"role": "user",
			"content": [
				{ "type": "text", "text": prompt },
				{ "type": "image_url", "image_url": { "url": data_url(image) } }
			]
		}),
	]
}

fn with_context(context: &str, instruction: &str) -> String {
	if context.trim().is_empty() {
		instruction.to_string()
	} else {
		format!("{}\n\n{instruction}", context.trim())
	}
}

fn data_url(image: &ImagePayload) -> String {
	let content_type = image.content_type.as_deref().unwrap_or(DEFAULT_IMAGE_CONTENT_TYPE);

	format!("data:{content_type};base64,{}", STANDARD.encode(&image.bytes))
}
