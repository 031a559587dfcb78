//! String formatting utilities.
//!
//! Provides functions for formatting values for display, including id
//! truncation, Brazilian real amounts and day-count durations.

use rust_decimal::Decimal;

/// Utility function to truncate an id for display purposes.
///
/// Shows only the first 8 characters followed by ".." for longer strings.
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Formats a monetary amount as Brazilian reais, e.g. "R$ 2.800,00".
///
/// The value is rounded to two decimal places; thousands are grouped with
/// "." and the decimal separator is ",".
pub fn format_brl(value: Decimal) -> String {
	let rounded = value.round_dp(2);
	let negative = rounded.is_sign_negative() && !rounded.is_zero();
	let plain = format!("{:.2}", rounded.abs());
	let (integer_part, decimal_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

	let mut grouped = String::with_capacity(integer_part.len() + integer_part.len() / 3);
	for (i, digit) in integer_part.chars().enumerate() {
		if i > 0 && (integer_part.len() - i) % 3 == 0 {
			grouped.push('.');
		}
		grouped.push(digit);
	}

	let sign = if negative { "-" } else { "" };
	format!("{}R$ {},{}", sign, grouped, decimal_part)
}

/// Formats a duration in days the way the marketplace displays deadlines.
///
/// Durations under a month are shown in days, under a year in 30-day months
/// plus remaining days, and anything longer in 365-day years plus remaining days.
pub fn format_deadline_days(days: u32) -> String {
	fn day_word(n: u32) -> &'static str {
		if n == 1 {
			"dia"
		} else {
			"dias"
		}
	}

	if days < 30 {
		return format!("{} {}", days, day_word(days));
	}

	if days < 365 {
		let months = days / 30;
		let remaining = days % 30;
		let month_word = if months == 1 { "mês" } else { "meses" };
		return if remaining == 0 {
			format!("{} {}", months, month_word)
		} else {
			format!(
				"{} {} e {} {}",
				months,
				month_word,
				remaining,
				day_word(remaining)
			)
		};
	}

	let years = days / 365;
	let remaining = days % 365;
	let year_word = if years == 1 { "ano" } else { "anos" };
	if remaining == 0 {
		format!("{} {}", years, year_word)
	} else {
		format!(
			"{} {} e {} {}",
			years,
			year_word,
			remaining,
			day_word(remaining)
		)
	}
}
