use std::{fmt::Write as _, path::PathBuf};

use color_eyre::{Result, eyre};

use shutter_client::{ClientSearchState, SearchStatus};
use shutter_domain::DateRange;

pub const HELP: &str = "\
Type text to search. Commands:
  :image <path>          search by a reference image
  :threshold <0.0-1.0>   change the certainty threshold
  :page <n>              jump to a page
  :dates <start> <end>   filter by YYYY-MM-DD bounds, `-` leaves a bound open
  :clear-dates           drop the date filter
  :submit                run the current search again
  :suggest               ask for related queries
  :help                  show this message
  :quit                  exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
	Query(String),
	Image(PathBuf),
	Threshold(f32),
	Page(u32),
	Dates(DateRange),
	Submit,
	Suggest,
	Help,
	Quit,
}

pub fn parse(line: &str) -> Result<Command> {
	let line = line.trim();
	let Some(rest) = line.strip_prefix(':') else {
		return Ok(Command::Query(line.to_string()));
	};
	let (name, arg) = match rest.split_once(char::is_whitespace) {
		Some((name, arg)) => (name, arg.trim()),
		None => (rest, ""),
	};

	match name {
		"image" => {
			if arg.is_empty() {
				return Err(eyre::eyre!(":image needs a file path."));
			}

			Ok(Command::Image(PathBuf::from(arg)))
		},
		"threshold" => {
			let value: f32 = arg
				.parse()
				.map_err(|_| eyre::eyre!(":threshold needs a number, got {arg:?}."))?;

			if !(0.0..=1.0).contains(&value) {
				return Err(eyre::eyre!("Threshold must be in the range 0.0-1.0."));
			}

			Ok(Command::Threshold(value))
		},
		"page" => {
			let page: u32 =
				arg.parse().map_err(|_| eyre::eyre!(":page needs a number, got {arg:?}."))?;

			if page == 0 {
				return Err(eyre::eyre!("Pages start at 1."));
			}

			Ok(Command::Page(page))
		},
		"dates" => {
			let mut bounds = arg.split_whitespace().map(|bound| Some(bound).filter(|b| *b != "-"));
			let (Some(start), Some(end), None) = (bounds.next(), bounds.next(), bounds.next())
			else {
				return Err(eyre::eyre!(":dates needs exactly two bounds."));
			};

			Ok(Command::Dates(DateRange::parse(start, end)?))
		},
		"clear-dates" => Ok(Command::Dates(DateRange::default())),
		"submit" => Ok(Command::Submit),
		"suggest" => Ok(Command::Suggest),
		"help" => Ok(Command::Help),
		"quit" | "q" => Ok(Command::Quit),
		other => Err(eyre::eyre!("Unknown command :{other}. Type :help for the list.")),
	}
}

/// Content type sent with an uploaded file, guessed from its extension.
pub fn content_type_for(path: &std::path::Path) -> &'static str {
	let extension = path
		.extension()
		.and_then(|ext| ext.to_str())
		.map(str::to_ascii_lowercase)
		.unwrap_or_default();

	match extension.as_str() {
		"png" => "image/png",
		"webp" => "image/webp",
		"gif" => "image/gif",
		_ => "image/jpeg",
	}
}

pub fn render(state: &ClientSearchState) -> String {
	let mut out = String::new();
	let subject = match (&state.image, state.query.is_empty()) {
		(Some(image), _) => format!("image {}", image.file_name),
		(None, false) => format!("\"{}\"", state.query),
		(None, true) => "nothing".to_string(),
	};

	let _ = writeln!(
		out,
		"[#{} {}] {subject} threshold={:.2} page={}",
		state.active_request_id,
		state.status.as_str(),
		state.threshold,
		state.page
	);

	if state.status == SearchStatus::Error
		&& let Some(error) = &state.error
	{
		let _ = writeln!(out, "  error: {error}");
	}

	if state.status == SearchStatus::Searching {
		return out;
	}

	let Some(page) = &state.results else {
		return out;
	};

	if page.items.is_empty() {
		let _ = writeln!(out, "  no results");
	}

	for resolved in &page.items {
		let item = &resolved.item;

		let _ = writeln!(
			out,
			"  {:.3}  {}  {}  {}",
			item.combined_score,
			item.modified_date.date(),
			item.id,
			resolved.resolved_link.as_deref().unwrap_or("(no link)")
		);
	}

	let _ = writeln!(
		out,
		"  page {}/{} of {} results{}",
		page.page,
		page.total_pages,
		page.total,
		if page.has_more { ", more available" } else { "" }
	);

	out
}

#[cfg(test)]
mod tests {
	use time::macros::date;

	use super::*;

	#[test]
	fn plain_text_is_a_query() {
		assert_eq!(
			parse("  misty forest ").expect("query"),
			Command::Query("misty forest".to_string())
		);
	}

	#[test]
	fn parses_commands_with_arguments() {
		assert_eq!(
			parse(":image ./ref photo.jpg").expect("image"),
			Command::Image(PathBuf::from("./ref photo.jpg"))
		);
		assert_eq!(parse(":threshold 0.75").expect("threshold"), Command::Threshold(0.75));
		assert_eq!(parse(":page 3").expect("page"), Command::Page(3));
		assert_eq!(parse(":q").expect("quit"), Command::Quit);
	}

	#[test]
	fn dates_accept_open_bounds() {
		assert_eq!(
			parse(":dates 2024-01-01 -").expect("dates"),
			Command::Dates(DateRange::new(Some(date!(2024-01-01)), None))
		);
		assert_eq!(parse(":clear-dates").expect("clear"), Command::Dates(DateRange::default()));
	}

	#[test]
	fn rejects_bad_arguments() {
		assert!(parse(":threshold 1.5").is_err());
		assert!(parse(":threshold abc").is_err());
		assert!(parse(":page 0").is_err());
		assert!(parse(":dates 2024-01-01").is_err());
		assert!(parse(":dates 2024-13-01 -").is_err());
		assert!(parse(":image").is_err());
		assert!(parse(":frobnicate").is_err());
	}

	#[test]
	fn guesses_content_type_from_extension() {
		assert_eq!(content_type_for(std::path::Path::new("a/b.PNG")), "image/png");
		assert_eq!(content_type_for(std::path::Path::new("a/b")), "image/jpeg");
	}

	#[test]
	fn renders_the_error_message() {
		let mut state = ClientSearchState::new(0.5);

		state.query = "forest".to_string();
		state.status = SearchStatus::Error;
		state.error = Some("upstream failed".to_string());

		let rendered = render(&state);

		assert!(rendered.contains("\"forest\""));
		assert!(rendered.contains("error: upstream failed"));
	}
}
