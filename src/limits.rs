//! Hard input limits, checked before any computation.

/// Upper bound on the number of suggestions a caller may ask for.
pub const MAX_SUGGESTION_LIMIT: usize = 100;

/// Upper bound on requested amenities per query.
pub const MAX_AMENITIES: usize = 64;

/// Max length of resource names, amenity names and booking labels.
pub const MAX_NAME_LEN: usize = 256;

/// Longest single booking (7 days).
pub const MAX_BOOKING_DURATION_MS: i64 = 7 * 24 * 3_600_000;
