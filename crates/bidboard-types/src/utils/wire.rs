//! Serde helpers for the loosely typed backend payloads.

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};
use std::str::FromStr;

/// A scalar that the backend may send either as a JSON string or a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
	Text(String),
	Number(serde_json::Number),
}

impl Scalar {
	fn into_text(self) -> String {
		match self {
			Scalar::Text(text) => text,
			Scalar::Number(number) => number.to_string(),
		}
	}
}

/// Parses a decimal amount, accepting plain and scientific notation.
pub fn parse_amount(text: &str) -> Option<Decimal> {
	let trimmed = text.trim();
	Decimal::from_str(trimmed)
		.or_else(|_| Decimal::from_scientific(trimmed))
		.ok()
}

/// Extracts the first run of ASCII digits as a day count.
///
/// "12 dias" -> 12, "em 10 dias" -> 10, "8" -> 8, "a combinar" -> None.
pub fn leading_day_count(text: &str) -> Option<u32> {
	let digits: String = text
		.chars()
		.skip_while(|c| !c.is_ascii_digit())
		.take_while(|c| c.is_ascii_digit())
		.collect();
	if digits.is_empty() {
		return None;
	}
	digits.parse().ok()
}

/// Deserializes an id sent as a string or a number into a string.
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Scalar::deserialize(deserializer)?.into_text())
}

/// Optional variant of [`id`]; `null` and missing fields become `None`.
pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(Option::<Scalar>::deserialize(deserializer)?.map(Scalar::into_text))
}

/// Deserializes a monetary amount sent as a string or a number.
pub fn amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
	D: Deserializer<'de>,
{
	let text = Scalar::deserialize(deserializer)?.into_text();
	parse_amount(&text).ok_or_else(|| D::Error::custom(format!("invalid amount '{}'", text)))
}

/// Serializes a monetary amount as a decimal string such as `"2800.00"`.
///
/// This is the form the backend sends amounts in, and [`amount`] reads it
/// back without going through a float.
pub fn serialize_amount<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.collect_str(value)
}

/// Deserializes a day count sent as a number or as text such as "15" or "15 dias".
pub fn days<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
	D: Deserializer<'de>,
{
	match Scalar::deserialize(deserializer)? {
		Scalar::Number(number) => number
			.as_u64()
			.and_then(|n| u32::try_from(n).ok())
			.ok_or_else(|| D::Error::custom(format!("invalid day count {}", number))),
		Scalar::Text(text) => leading_day_count(&text)
			.ok_or_else(|| D::Error::custom(format!("invalid day count '{}'", text))),
	}
}

/// Deserializes an optional timestamp, accepting RFC 3339 and "YYYY-MM-DD HH:MM:SS" (UTC).
pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
	D: Deserializer<'de>,
{
	let Some(text) = Option::<String>::deserialize(deserializer)? else {
		return Ok(None);
	};
	if let Ok(parsed) = DateTime::parse_from_rfc3339(&text) {
		return Ok(Some(parsed.with_timezone(&Utc)));
	}
	NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
		.map(|naive| Some(naive.and_utc()))
		.map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", text, e)))
}
