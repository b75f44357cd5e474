//! HTTP error response handling for the API
//!
//! Converts pipeline failures into HTTP responses with the mapped status
//! code and the fixed user-facing HTML fragment. Every failed request yields
//! exactly one such response; internal detail stays in the logs.

use crate::error::Error;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Html(self.user_message())).into_response()
    }
}
