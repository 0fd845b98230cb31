//! JSON bodies exchanged between the frontend and the backend.

use crate::model::OwnerId;
use crate::store::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use serde::{Deserialize, Serialize};

/// Largest image the classifier service accepts.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

pub const IMAGE_FIELD: &str = "image";
pub const CATEGORY_FIELD: &str = "plant_category";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

impl HistoryQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: OwnerId,
    pub email: String,
    pub name: String,
    pub picture_url: Option<String>,
}
