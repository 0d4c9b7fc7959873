use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Schedule {
    #[serde(default)]
    pub time_zone: String,
}

/// Blocked-services configuration, preserved bit-for-bit on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceConfig {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub schedule: Schedule,
}

impl ServiceConfig {
    pub fn new(ids: Vec<String>, time_zone: impl Into<String>) -> Self {
        Self {
            ids,
            schedule: Schedule {
                time_zone: time_zone.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedService {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon_svg: String,
    #[serde(default)]
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AllBlockedServicesResponse {
    #[serde(default)]
    pub blocked_services: Vec<BlockedService>,
}

/// Temporary configuration that reverts after a number of minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetAfterMinutesRequest {
    pub config: ServiceConfig,
    /// Zero or negative means "apply without a reset timer".
    #[serde(default)]
    pub reset_after_min: i64,
}

/// Temporary configuration that reverts at a wall-clock deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetAtRequest {
    pub config: ServiceConfig,
    #[serde(default)]
    pub reset_date_time: String,
}
