//! Shared primitive types used across the grading engine.

/// An ordinal grade. 1..=30 for assigned tiers, 30 is best.
/// 0 only ever appears as a previous tier whose label could not be parsed.
pub type Tier = u8;

/// Lowest assignable tier.
pub const TIER_MIN: Tier = 1;

/// Highest assignable tier.
pub const TIER_MAX: Tier = 30;

/// Number of assignable tiers.
pub const TIER_COUNT: usize = TIER_MAX as usize;

/// License number of a retail license holder.
pub type EntityId = String;

/// The canonical run identifier.
pub type RunId = String;

/// Two-character district key derived from a marketing route.
pub type DistrictKey = String;
