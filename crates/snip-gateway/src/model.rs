use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use snip_core::ShortCode;

#[derive(Debug, Deserialize)]
pub struct CreateLinkRequest {
    pub long_url: String,
    /// Falls back to the gateway's configured default when absent.
    pub days_valid: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateLinkResponse {
    pub code: ShortCode,
    pub short_url: String,
    pub long_url: String,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveLinkResponse {
    pub long_url: String,
    pub click_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LinkStatsResponse {
    pub code: ShortCode,
    pub long_url: String,
    pub click_count: u64,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
