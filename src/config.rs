use std::time::Duration;

use crate::model::{HOUR_MS, MINUTE_MS, Ms};

const DAY_MS: Ms = 24 * HOUR_MS;

/// Engine tuning knobs. `Default` matches production defaults; `from_env`
/// overrides them from `FLEETPLAN_*` variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Length of a maintenance interval when the record carries no end.
    pub default_maintenance_duration_ms: Ms,
    /// Upper bound on each upstream fetch; exceeding it fails the query.
    pub fetch_timeout: Duration,
    /// How far past `from` next-availability is allowed to look.
    pub next_availability_horizon_ms: Ms,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_maintenance_duration_ms: 4 * HOUR_MS,
            fetch_timeout: Duration::from_secs(5),
            next_availability_horizon_ms: 400 * DAY_MS,
        }
    }
}

/// Parse a positive count from `raw` and scale it to milliseconds.
/// Garbage, non-positive values and overflow all yield `None`.
fn scaled_ms(raw: Option<String>, unit_ms: Ms) -> Option<Ms> {
    raw.and_then(|s| s.parse::<Ms>().ok())
        .filter(|n| *n > 0)
        .and_then(|n| n.checked_mul(unit_ms))
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let default_maintenance_duration_ms = scaled_ms(
            std::env::var("FLEETPLAN_MAINTENANCE_DEFAULT_MINUTES").ok(),
            MINUTE_MS,
        )
        .unwrap_or(defaults.default_maintenance_duration_ms);
        let fetch_timeout = std::env::var("FLEETPLAN_FETCH_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.fetch_timeout);
        let next_availability_horizon_ms =
            scaled_ms(std::env::var("FLEETPLAN_HORIZON_DAYS").ok(), DAY_MS)
                .unwrap_or(defaults.next_availability_horizon_ms);

        Self {
            default_maintenance_duration_ms,
            fetch_timeout,
            next_availability_horizon_ms,
        }
    }
}
