use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use super::dto::ErrorDto;
use crate::error::TemperatureError;

#[derive(Debug)]
pub enum AppError {
    Temperature(TemperatureError),
    Internal(anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Temperature(TemperatureError::NoDataFound) => StatusCode::NOT_FOUND,
            AppError::Temperature(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AppError::Temperature(e) => e.to_string(),
            AppError::Internal(e) => e.to_string(),
        };
        if status.is_server_error() {
            error!(status = %status, detail = %detail, "Request failed");
        }
        (status, Json(ErrorDto { detail })).into_response()
    }
}

impl From<TemperatureError> for AppError {
    fn from(e: TemperatureError) -> Self {
        Self::Temperature(e)
    }
}

impl From<prometheus::Error> for AppError {
    fn from(e: prometheus::Error) -> Self {
        Self::Internal(e.into())
    }
}
