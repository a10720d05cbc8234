use axum::extract::{FromRequest, FromRequestParts};
use serde::Serialize;

use crate::db::query::{Page, Pagination};
use crate::error::AppError;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            pagination: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn page(page: Page<T>) -> Self {
        Self {
            success: true,
            data: page.items,
            pagination: Some(page.pagination),
            message: None,
        }
    }
}

pub type ApiResult<T> = Result<axum::Json<ApiResponse<T>>, AppError>;

/// `axum::Json` with rejections turned into the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Query` with rejections turned into the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Payload returned by DELETE endpoints.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
}

impl Deleted {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}
