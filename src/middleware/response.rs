use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

/// List envelope: `{success, count, items}`.
#[derive(Debug, Serialize)]
pub struct Listing<T: Serialize> {
    pub count: usize,
    pub items: Vec<T>,
}

impl<T: Serialize> Listing<T> {
    pub fn of(items: Vec<T>) -> Self {
        Self { count: items.len(), items }
    }
}

/// Single-record envelope: `{success, item}`.
#[derive(Debug, Serialize)]
pub struct Item<T: Serialize> {
    pub item: T,
}

/// Mutation envelope: `{success, message, item}`.
#[derive(Debug, Serialize)]
pub struct Saved<T: Serialize> {
    pub message: String,
    pub item: T,
}

impl<T: Serialize> Saved<T> {
    pub fn new(message: impl Into<String>, item: T) -> Self {
        Self { message: message.into(), item }
    }
}

/// Bare acknowledgement: `{success, message}`.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub message: String,
}

impl Ack {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Wrapper that flattens the payload into the response object and adds
/// the `success: true` marker.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status_code: Option<StatusCode>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { data, status_code: None }
    }

    pub fn with_status(data: T, status_code: StatusCode) -> Self {
        Self { data, status_code: Some(status_code) }
    }

    pub fn created(data: T) -> Self {
        Self::with_status(data, StatusCode::CREATED)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status_code.unwrap_or(StatusCode::OK);

        let mut value = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "success": false,
                        "message": "failed to format response",
                        "code": "INTERNAL_SERVER_ERROR",
                    })),
                )
                    .into_response();
            }
        };

        match &mut value {
            Value::Object(map) => {
                map.insert("success".to_string(), json!(true));
            }
            other => {
                // Non-object payloads get the plain data envelope.
                value = json!({ "success": true, "data": std::mem::take(other) });
            }
        }

        (status, Json(value)).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_counts_items() {
        let listing = Listing::of(vec![1, 2, 3]);
        assert_eq!(listing.count, 3);
        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["count"], json!(3));
        assert_eq!(value["items"], json!([1, 2, 3]));
    }
}
