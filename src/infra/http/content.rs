//! Binary response assembly for file payloads.

use axum::{
    body::Body,
    http::{
        HeaderName, HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};

use crate::application::content::{DEFAULT_CONTENT_TYPE, FilePayload};

pub const HASH_HEADER: HeaderName = HeaderName::from_static("x-hash");

/// `inline` for images and video, `attachment` for everything else.
pub fn content_disposition(content_type: &str, file_name: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let disposition = if essence.starts_with("image/") || essence.starts_with("video/") {
        "inline"
    } else {
        "attachment"
    };
    let file_name = file_name.replace(['"', '\\', '\r', '\n'], "_");
    format!("{disposition}; filename=\"{file_name}\"")
}

pub fn content_response(payload: FilePayload) -> Response {
    let content_type = HeaderValue::from_str(&payload.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));
    let disposition = content_disposition(&payload.content_type, &payload.file_name);
    let length = payload.bytes.len();

    let mut response = Response::new(Body::from(payload.bytes));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, content_type);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(CONTENT_DISPOSITION, value);
    }
    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    if let Some(hash) = payload.hash.as_deref()
        && let Ok(value) = HeaderValue::from_str(hash)
    {
        headers.insert(HASH_HEADER, value);
    }

    response
}
