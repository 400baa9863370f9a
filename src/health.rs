//! Liveness and readiness checks for the HTTP transports.
//!
//! Liveness is a fixed, configurable response. Readiness looks at the
//! tracked session table: it only reports 200 when at least one session
//! exists and every tracked session has finished its handshake.

use {
    serde::{Deserialize, Serialize},
    serde_json::{json, Value},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub enabled: bool,
    pub path: String,
    pub status: u16,
    pub message: String,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/health".to_string(),
            status: 200,
            message: "✓ Ok".to_string(),
        }
    }
}

pub const READY_PATH: &str = "/ready";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadinessReport {
    pub status: &'static str,
    pub ready: usize,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
}

impl ReadinessReport {
    pub fn stateless() -> Self {
        Self {
            status: "ready",
            ready: 1,
            total: 1,
            mode: Some("stateless"),
        }
    }

    /// Summarise `ready` out of `total` tracked sessions.
    pub fn from_counts(ready: usize, total: usize) -> Self {
        let status = if total == 0 {
            "no_sessions"
        } else if ready == total {
            "ready"
        } else {
            "initializing"
        };
        Self {
            status,
            ready,
            total,
            mode: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == "ready"
    }

    pub fn http_status(&self) -> u16 {
        if self.is_ready() {
            200
        } else {
            503
        }
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            json!({
                "status": "error",
                "message": "Failed to serialize readiness report"
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_states() {
        let none = ReadinessReport::from_counts(0, 0);
        assert_eq!(none.status, "no_sessions");
        assert_eq!(none.http_status(), 503);

        let partial = ReadinessReport::from_counts(1, 2);
        assert_eq!(partial.status, "initializing");
        assert_eq!(partial.http_status(), 503);

        let all = ReadinessReport::from_counts(2, 2);
        assert_eq!(all.status, "ready");
        assert_eq!(all.http_status(), 200);
    }

    #[test]
    fn test_stateless_report_shape() {
        assert_eq!(
            ReadinessReport::stateless().to_json(),
            json!({"mode": "stateless", "ready": 1, "total": 1, "status": "ready"})
        );
        assert!(ReadinessReport::from_counts(0, 0).to_json().get("mode").is_none());
    }
}
