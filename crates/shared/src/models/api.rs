use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

/// Success envelope used across the portal API: `{"data": ...}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiData<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiData<T> {
    pub fn new(data: T) -> Self {
        ApiData { data }
    }
}

impl<T: Serialize> From<ApiData<T>> for HttpResponse {
    fn from(response: ApiData<T>) -> Self {
        HttpResponse::Ok().json(response)
    }
}

/// Failure envelope: `{"error": ...}`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        ApiError {
            error: error.into(),
        }
    }
}
