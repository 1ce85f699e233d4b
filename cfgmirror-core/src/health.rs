//! Health reports for the configuration mirror and its backing store.
//!
//! The mirror reports [`MirrorVitals`] and the grading lives here, so every
//! host grades staleness the same way. The store reports its probe outcome
//! and latency.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Health grade of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but from a stale snapshot.
    Degraded,
    Unhealthy,
}

/// The two components a health report can describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    ConfigMirror,
    ConfigStore,
}

impl Component {
    pub fn as_str(&self) -> &'static str {
        match self {
            Component::ConfigMirror => "config_mirror",
            Component::ConfigStore => "config_store",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the mirror, graded by [`HealthCheck::mirror`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorVitals {
    pub initialized: bool,
    pub config_count: usize,
    /// Milliseconds since the last successful reload.
    pub last_reload_age_ms: Option<u64>,
    pub refresh_interval_ms: u64,
    pub failed_refreshes: u64,
}

impl MirrorVitals {
    /// Age past which the snapshot counts as stale: two refresh intervals.
    pub fn stale_after_ms(&self) -> u64 {
        self.refresh_interval_ms.saturating_mul(2)
    }

    pub fn is_stale(&self) -> bool {
        self.last_reload_age_ms
            .map_or(true, |age| age > self.stale_after_ms())
    }
}

/// Component-specific data carried by a [`HealthCheck`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "component", rename_all = "snake_case")]
pub enum HealthDetail {
    ConfigMirror(MirrorVitals),
    ConfigStore { probe_ms: u64 },
}

/// Graded health of one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub detail: HealthDetail,
}

impl HealthCheck {
    /// Grade the mirror: unhealthy before initialization, degraded once the
    /// last successful reload is stale.
    pub fn mirror(vitals: MirrorVitals) -> Self {
        let (status, message) = if !vitals.initialized {
            (HealthStatus::Unhealthy, Some("mirror is not initialized".to_string()))
        } else if vitals.is_stale() {
            let message = match vitals.last_reload_age_ms {
                Some(age) => format!("last reload was {age} ms ago"),
                None => "no successful reload recorded".to_string(),
            };
            (HealthStatus::Degraded, Some(message))
        } else {
            (HealthStatus::Healthy, None)
        };

        Self {
            status,
            message,
            detail: HealthDetail::ConfigMirror(vitals),
        }
    }

    /// Grade the store from one probe round trip.
    pub fn store(probe: Result<(), String>, probe_ms: u64) -> Self {
        let (status, message) = match probe {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(reason) => (HealthStatus::Unhealthy, Some(reason)),
        };
        Self {
            status,
            message,
            detail: HealthDetail::ConfigStore { probe_ms },
        }
    }

    pub fn component(&self) -> Component {
        match self.detail {
            HealthDetail::ConfigMirror(_) => Component::ConfigMirror,
            HealthDetail::ConfigStore { .. } => Component::ConfigStore,
        }
    }

    /// Mirror vitals, when this check describes the mirror.
    pub fn vitals(&self) -> Option<&MirrorVitals> {
        match &self.detail {
            HealthDetail::ConfigMirror(vitals) => Some(vitals),
            HealthDetail::ConfigStore { .. } => None,
        }
    }

    /// Probe latency, when this check describes the store.
    pub fn probe_ms(&self) -> Option<u64> {
        match self.detail {
            HealthDetail::ConfigStore { probe_ms } => Some(probe_ms),
            HealthDetail::ConfigMirror(_) => None,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(initialized: bool, age_ms: Option<u64>) -> MirrorVitals {
        MirrorVitals {
            initialized,
            config_count: 4,
            last_reload_age_ms: age_ms,
            refresh_interval_ms: 1_000,
            failed_refreshes: 0,
        }
    }

    #[test]
    fn test_mirror_grading() {
        let check = HealthCheck::mirror(vitals(false, None));
        assert_eq!(check.status, HealthStatus::Unhealthy);
        assert_eq!(check.component(), Component::ConfigMirror);

        assert!(HealthCheck::mirror(vitals(true, Some(2_000))).is_healthy());

        let stale = HealthCheck::mirror(vitals(true, Some(2_001)));
        assert_eq!(stale.status, HealthStatus::Degraded);
        assert_eq!(stale.message.as_deref(), Some("last reload was 2001 ms ago"));
        assert_eq!(stale.vitals().map(|v| v.config_count), Some(4));
        assert_eq!(stale.probe_ms(), None);
    }

    #[test]
    fn test_store_grading() {
        let down = HealthCheck::store(Err("connection refused".to_string()), 12);
        assert_eq!(down.status, HealthStatus::Unhealthy);
        assert_eq!(down.component(), Component::ConfigStore);
        assert_eq!(down.probe_ms(), Some(12));
        assert!(down.vitals().is_none());
        assert!(HealthCheck::store(Ok(()), 3).is_healthy());
    }

    #[test]
    fn test_serialized_shape() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(HealthCheck::store(Ok(()), 7))?;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["detail"]["component"], "config_store");
        assert_eq!(json["detail"]["probe_ms"], 7);
        assert!(json.get("message").is_none());
        Ok(())
    }
}
