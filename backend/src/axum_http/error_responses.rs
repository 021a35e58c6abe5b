use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::usecases::{billing::BillingError, qr_codes::QrCodeError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

pub fn error_response(status: StatusCode, message: String) -> Response {
    let body = Json(ErrorResponse {
        code: status.as_u16(),
        message,
    });

    (status, body).into_response()
}

// Internal variants are logged where they happen; don't leak detail to the client.
fn public_message(status: StatusCode, message: String) -> String {
    if status.is_server_error() {
        status
            .canonical_reason()
            .unwrap_or("Internal server error")
            .to_string()
    } else {
        message
    }
}

impl IntoResponse for QrCodeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        error_response(status, public_message(status, self.to_string()))
    }
}

impl IntoResponse for BillingError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        error_response(status, public_message(status, self.to_string()))
    }
}
