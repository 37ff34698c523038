use serde::{Deserialize, Serialize};

use crate::model::{Resource, TimeWindow};

// Product-tuned heuristics. Keep these exact; clients compare scores across
// releases.
pub const BASE_CONFIDENCE: f64 = 0.5;
pub const MORNING_BONUS: f64 = 0.20;
pub const AFTERNOON_BONUS: f64 = 0.15;
pub const OFF_HOURS_PENALTY: f64 = 0.10;
pub const AMENITY_WEIGHT: f64 = 0.30;
pub const HIGHLY_RECOMMENDED_ABOVE: f64 = 0.8;

const MORNING_HOURS: std::ops::RangeInclusive<u32> = 9..=11;
const AFTERNOON_HOURS: std::ops::RangeInclusive<u32> = 14..=16;
const EARLIEST_REGULAR_HOUR: u32 = 8;
const LATEST_REGULAR_HOUR: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub base: f64,
    pub morning_bonus: f64,
    pub afternoon_bonus: f64,
    pub off_hours_penalty: f64,
    pub amenity_weight: f64,
    pub highly_recommended_above: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            base: BASE_CONFIDENCE,
            morning_bonus: MORNING_BONUS,
            afternoon_bonus: AFTERNOON_BONUS,
            off_hours_penalty: OFF_HOURS_PENALTY,
            amenity_weight: AMENITY_WEIGHT,
            highly_recommended_above: HIGHLY_RECOMMENDED_ABOVE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    pub confidence: f64,
    pub reason: String,
}

/// Score one free window. Confidence is clamped to `[0, 1]`.
///
/// Reason clauses, in order: "Highly recommended", "Popular morning time
/// slot", "Includes <first two amenities>". Falls back to "Available space".
pub fn score(resource: &Resource, window: &TimeWindow, requested_amenities: &[String], weights: &ScoringWeights) -> Score {
    let hour = window.hour;
    let morning = MORNING_HOURS.contains(&hour);

    let mut confidence = weights.base;
    if morning {
        confidence += weights.morning_bonus;
    } else if AFTERNOON_HOURS.contains(&hour) {
        confidence += weights.afternoon_bonus;
    } else if !(EARLIEST_REGULAR_HOUR..=LATEST_REGULAR_HOUR).contains(&hour) {
        confidence -= weights.off_hours_penalty;
    }

    if !requested_amenities.is_empty() {
        let matched = requested_amenities
            .iter()
            .filter(|a| resource.has_amenity(a))
            .count();
        confidence += weights.amenity_weight * (matched as f64 / requested_amenities.len() as f64);
    }
    let confidence = confidence.clamp(0.0, 1.0);

    let mut clauses: Vec<String> = Vec::with_capacity(3);
    if confidence > weights.highly_recommended_above {
        clauses.push("Highly recommended".into());
    }
    if morning {
        clauses.push("Popular morning time slot".into());
    }
    if !resource.amenities.is_empty() {
        let shown: Vec<&str> = resource.amenities.iter().take(2).map(String::as_str).collect();
        clauses.push(format!("Includes {}", shown.join(", ")));
    }
    let reason = if clauses.is_empty() {
        "Available space".to_string()
    } else {
        clauses.join(", ")
    };

    Score { confidence, reason }
}
