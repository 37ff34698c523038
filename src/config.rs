use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::{OperatingHours, OverlapPrecision, ScoringWeights};
use crate::engine::ranking::DEFAULT_LIMIT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub hours: OperatingHours,
    pub precision: OverlapPrecision,
    pub weights: ScoringWeights,
    /// How many alternatives a conflict check ranks before dropping the
    /// conflicting resource.
    pub suggestion_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hours: OperatingHours::default(),
            precision: OverlapPrecision::default(),
            weights: ScoringWeights::default(),
            suggestion_limit: DEFAULT_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Read `DESKSLOT_*` overrides from the environment. Unset or unparseable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        let open: Option<u32> = lookup("DESKSLOT_OPEN_HOUR").and_then(|s| s.parse().ok());
        let close: Option<u32> = lookup("DESKSLOT_CLOSE_HOUR").and_then(|s| s.parse().ok());
        let hours = OperatingHours {
            open: open.unwrap_or(config.hours.open),
            close: close.unwrap_or(config.hours.close),
        };
        if hours.is_valid() {
            config.hours = hours;
        } else {
            warn!(open = hours.open, close = hours.close, "ignoring invalid operating hours");
        }

        match lookup("DESKSLOT_PRECISION").as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("hour") => config.precision = OverlapPrecision::Hour,
            Some("exact") | None => {}
            Some(other) => warn!("unknown DESKSLOT_PRECISION {other:?}, using exact"),
        }

        if let Some(limit) = lookup("DESKSLOT_SUGGESTION_LIMIT")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0 && n <= crate::limits::MAX_SUGGESTION_LIMIT)
        {
            config.suggestion_limit = limit;
        }

        config
    }
}
