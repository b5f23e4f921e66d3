// Helper functions for safe logging and display formatting

use chrono::{Datelike, NaiveDate};

/// Masks tokens for safe logging
/// Shows only first and last 4 characters
///
/// # Example
/// ```
/// use eunbit::common::safe_token_log;
/// assert_eq!(safe_token_log("eyJhbGciOiJIUzI1NiJ9"), "eyJh...NiJ9");
/// ```
pub fn safe_token_log(token: &str) -> String {
    if token.is_ascii() && token.len() > 8 {
        format!("{}...{}", &token[..4], &token[token.len() - 4..])
    } else {
        "***".to_string()
    }
}

/// Formats a phone number as `010-1234-5678`, `031-123-4567` or `02-123-4567`.
/// Unrecognized shapes are returned unchanged.
pub fn format_phone_number(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.starts_with("010") && digits.len() == 11 {
        return format!("{}-{}-{}", &digits[..3], &digits[3..7], &digits[7..]);
    }
    if digits.len() == 10 {
        return format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..]);
    }
    if digits.len() == 9 {
        return format!("{}-{}-{}", &digits[..2], &digits[2..5], &digits[5..]);
    }

    phone.to_string()
}

/// Normalizes free-form gender input to `남성` / `여성`
pub fn format_gender(input: &str) -> String {
    let normalized = input.trim().to_lowercase();
    if normalized.is_empty() {
        return "-".to_string();
    }

    match normalized.as_str() {
        "m" | "male" | "man" | "남" | "남자" => "남성".to_string(),
        "f" | "female" | "woman" | "여" | "여자" => "여성".to_string(),
        _ => input.to_string(),
    }
}

/// Age in full years on `today` for an ISO date of birth (`YYYY-MM-DD`,
/// optionally followed by a time part)
pub fn calc_age_on(birth_iso: &str, today: NaiveDate) -> Option<i32> {
    let date_part = birth_iso.get(..10).unwrap_or(birth_iso);
    let birth = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;

    let mut age = today.year() - birth.year();
    let birthday_passed = (today.month(), today.day()) >= (birth.month(), birth.day());
    if !birthday_passed {
        age -= 1;
    }
    Some(age)
}

pub fn calc_age(birth_iso: &str) -> Option<i32> {
    calc_age_on(birth_iso, chrono::Local::now().date_naive())
}
