use serde::{Deserialize, Deserializer, Serializer};
use time::{
	Date, OffsetDateTime, PrimitiveDateTime, format_description::well_known::Rfc3339,
	macros::format_description,
};

const DATE_TIME_T: &[time::format_description::BorrowedFormatItem<'static>] = format_description!(
	"[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
);
const DATE_TIME_SPACE: &[time::format_description::BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]");
const DATE_ONLY: &[time::format_description::BorrowedFormatItem<'static>] =
	format_description!("[year]-[month]-[day]");

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = value.format(&Rfc3339).map_err(serde::ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse_timestamp(&raw)
		.ok_or_else(|| serde::de::Error::custom(format!("Unrecognized timestamp {raw:?}.")))
}

/// Parses provider timestamps. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<OffsetDateTime> {
	let trimmed = raw.trim();

	if let Ok(value) = OffsetDateTime::parse(trimmed, &Rfc3339) {
		return Some(value);
	}

	for format in [DATE_TIME_T, DATE_TIME_SPACE] {
		if let Ok(value) = PrimitiveDateTime::parse(trimmed, format) {
			return Some(value.assume_utc());
		}
	}

	Date::parse(trimmed, DATE_ONLY).ok().map(|date| date.midnight().assume_utc())
}

/// Parses a `YYYY-MM-DD` calendar day.
pub fn parse_day(raw: &str) -> Option<Date> {
	Date::parse(raw.trim(), DATE_ONLY).ok()
}

#[cfg(test)]
mod tests {
	use time::{Month, UtcOffset};

	use super::*;

	#[test]
	fn accepts_rfc3339_with_offset() {
		let parsed = parse_timestamp("2024-03-01T23:30:00+05:30").expect("parse failed");

		assert_eq!(parsed.offset(), UtcOffset::from_hms(5, 30, 0).expect("valid offset"));
		assert_eq!(parsed.to_offset(UtcOffset::UTC).date().day(), 1);
	}

	#[test]
	fn treats_offsetless_values_as_utc() {
		let parsed = parse_timestamp("2024-03-01 08:15:00.250").expect("parse failed");

		assert_eq!(parsed.offset(), UtcOffset::UTC);
		assert_eq!(parsed.millisecond(), 250);
	}

	#[test]
	fn accepts_bare_dates() {
		let parsed = parse_timestamp("2023-12-31").expect("parse failed");

		assert_eq!(parsed.date().month(), Month::December);
		assert_eq!(parsed.hour(), 0);
	}

	#[test]
	fn rejects_garbage() {
		assert!(parse_timestamp("last tuesday").is_none());
		assert!(parse_day("2024-13-01").is_none());
	}
}
