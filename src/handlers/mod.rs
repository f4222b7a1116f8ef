use std::str::FromStr;

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

use crate::error::ApiError;

pub mod dashboard;
pub mod departments;
pub mod patients;
pub mod queue;
pub mod requests;
pub mod session;
pub mod visits;

// Mutation outcome: a pass/fail flag plus a message for the user
pub fn outcome(success: bool, message: impl Into<String>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": success,
        "message": message.into(),
    }))
}

pub fn created<T: Serialize>(message: &str, data: &T) -> HttpResponse {
    HttpResponse::Created().json(json!({
        "success": true,
        "message": message,
        "data": data,
    }))
}

// Trimmed, non-empty form text or a validation error carrying `message`
pub fn required(value: Option<&str>, message: &str) -> Result<String, ApiError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_owned()),
        _ => Err(ApiError::validation(message)),
    }
}

pub fn optional_text(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_owned()
}

// A choice from a fixed set; blank counts as missing
pub fn choice<T: FromStr>(value: Option<&str>, message: &str) -> Result<T, ApiError> {
    let text = required(value, message)?;
    text.parse().map_err(|_| ApiError::validation(message))
}

// An optional filter choice; blank means "no filter"
pub fn filter_choice<T: FromStr>(value: Option<&str>, name: &str) -> Result<Option<T>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(text) => text
            .parse()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("Unknown {}: {}", name, text))),
        None => Ok(None),
    }
}

// Form ids arrive as text; a select left on its placeholder posts "" or "0"
pub fn positive_id(value: Option<&str>, message: &str) -> Result<i32, ApiError> {
    match value.map(str::trim).and_then(|v| v.parse::<i32>().ok()) {
        Some(id) if id > 0 => Ok(id),
        _ => Err(ApiError::validation(message)),
    }
}

pub fn optional_id(value: Option<&str>, name: &str) -> Result<Option<i32>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(text) => match text.parse::<i32>() {
            Ok(id) if id > 0 => Ok(Some(id)),
            _ => Err(ApiError::validation(format!("Invalid {}: {}", name, text))),
        },
        None => Ok(None),
    }
}
