use serde::{Deserialize, Serialize};

// -- Field limits --

pub const MAX_FULL_NAME_LEN: usize = 200;
pub const MAX_ADDRESS_LEN: usize = 300;
pub const MAX_PHONE_LEN: usize = 50;

// -- Listing --

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_take")]
    pub take: i64,
}

fn default_take() -> i64 {
    50
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            take: default_take(),
        }
    }
}

// -- Responses --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}
