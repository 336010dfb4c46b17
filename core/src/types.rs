//! Shared primitive types used across the entire pipeline.

/// A platform user identifier (Drupal uid in the source system).
pub type UserId = i64;

/// A calendar year as carried by usage rows.
pub type Year = i32;

/// A calendar month, 1..=12 once past the normalizer.
pub type Month = u32;
