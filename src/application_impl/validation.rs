use crate::domain_model::Category;
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

pub const PASSWORD_MIN_LENGTH: usize = 8;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]+@[a-z]+\.[a-z]{2,}$").expect("email pattern compiles")
});

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{10}$").expect("phone pattern compiles"));

pub fn required(field: &str, value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(format!("{field} is required"));
    }
    Ok(value.to_string())
}

/// Trim and lower-case, then check the address shape.
pub fn normalize_email(email: &str) -> Result<String, String> {
    let email = email.trim().to_lowercase();
    if !EMAIL.is_match(&email) {
        return Err("Invalid email address".to_string());
    }
    Ok(email)
}

pub fn normalize_phone(phone: &str) -> Result<String, String> {
    let phone = phone.trim();
    if !PHONE.is_match(phone) {
        return Err("Phone number must be 10 digits".to_string());
    }
    Ok(phone.to_string())
}

pub fn check_password(password: &str) -> Result<(), String> {
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(format!(
            "Password must be at least {PASSWORD_MIN_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp. Future dates are
/// rejected.
pub fn parse_date_of_birth(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
        .ok_or_else(|| "Invalid date of birth".to_string())?;
    if date > Utc::now().date_naive() {
        return Err("Invalid date of birth".to_string());
    }
    Ok(date)
}

/// Parse a JSON array of category names, dropping duplicates.
pub fn parse_preferences(raw: &str) -> Result<Vec<Category>, String> {
    let names: Vec<String> =
        serde_json::from_str(raw).map_err(|_| "Invalid preferences format".to_string())?;
    let mut preferences = Vec::with_capacity(names.len());
    for name in names {
        let category = name
            .trim()
            .parse::<Category>()
            .map_err(|_| "Invalid preferences format".to_string())?;
        if !preferences.contains(&category) {
            preferences.push(category);
        }
    }
    Ok(preferences)
}

pub fn parse_category(raw: &str) -> Result<Category, String> {
    raw.trim()
        .parse::<Category>()
        .map_err(|e| e.to_string())
}

/// Parse a JSON array of tags; tags are trimmed and empty ones dropped.
pub fn parse_tags(raw: &str) -> Result<Vec<String>, String> {
    let tags: Vec<String> =
        serde_json::from_str(raw).map_err(|_| "Invalid tags format".to_string())?;
    Ok(tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}
