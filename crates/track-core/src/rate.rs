//! # Rate Calculation
//!
//! The pure time-billing function: (entry, as-of, pauses, rate) → charge.
//!
//! ## Calculation Pipeline
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  entered_at ──┐                                                  │
//! │  as_of ───────┼──► span minutes ──► − paused minutes             │
//! │  pauses ──────┘                          │                       │
//! │                                          ▼                       │
//! │                                   real_minutes (>= 0)            │
//! │                                          │                       │
//! │                             max(real, minimum_minutes)           │
//! │                                          │                       │
//! │                                          ▼                       │
//! │                        rounding policy (up / down / standard)    │
//! │                                          │                       │
//! │                                          ▼                       │
//! │                chargeable_minutes ──► × price/hour, half-up      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is deterministic and side-effect free. Timestamps come
//! in as arguments; nothing reads the wall clock. That keeps the whole
//! module table-testable and lets the engine call it both at close time
//! and for read-only running-cost previews.

use chrono::{DateTime, Utc};

use crate::types::{PauseInterval, RateDefinition, RoundingPolicy, TimeCharge};

// =============================================================================
// Public API
// =============================================================================

/// Computes the time charge for a visit.
///
/// `pauses` may include one still-open interval; it is treated as ending
/// at `as_of`. An `as_of` at or before `entered_at` yields zero real
/// minutes (the minimum still applies).
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc, Duration};
/// use track_core::rate::compute_time_charge;
/// use track_core::types::{RateDefinition, RoundingPolicy};
///
/// let entry = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
/// let rate = RateDefinition {
///     id: "r1".into(),
///     name: "Standard".into(),
///     price_per_hour_cents: 10000,
///     minimum_minutes: 60,
///     rounding: RoundingPolicy::RoundUp,
///     active: true,
///     valid_from: None,
///     valid_until: None,
///     created_at: entry,
///     updated_at: entry,
/// };
///
/// // 90 minutes, round-up: charged as 2 full hours
/// let charge = compute_time_charge(entry, entry + Duration::minutes(90), &[], &rate);
/// assert_eq!(charge.chargeable_minutes, 120);
/// assert_eq!(charge.time_cents, 20000);
/// ```
pub fn compute_time_charge(
    entered_at: DateTime<Utc>,
    as_of: DateTime<Utc>,
    pauses: &[PauseInterval],
    rate: &RateDefinition,
) -> TimeCharge {
    let real_minutes = real_minutes(entered_at, as_of, pauses);
    let minimum = rate.minimum_minutes.max(0);
    let billable = real_minutes.max(minimum);
    // Re-clamp after rounding: truncation must never undercut the minimum
    // (a round-down rate with a 90-minute minimum still bills 90)
    let chargeable = chargeable_minutes(billable, rate.rounding).max(minimum);
    let cost = rate.price_per_hour().prorate_minutes(chargeable);

    TimeCharge {
        real_minutes,
        chargeable_minutes: chargeable,
        time_cents: cost.cents(),
    }
}

/// Wall-clock minutes on the track: the entry→as_of span minus every
/// pause, clamped to zero.
pub fn real_minutes(
    entered_at: DateTime<Utc>,
    as_of: DateTime<Utc>,
    pauses: &[PauseInterval],
) -> i64 {
    let span = (as_of - entered_at).num_minutes().max(0);
    let paused: i64 = pauses.iter().map(|p| p.minutes_until(as_of)).sum();
    (span - paused).max(0)
}

/// Applies the rounding policy to billable minutes.
///
/// Knows nothing about the rate minimum; [`compute_time_charge`] applies
/// the minimum both before and after this step.
pub fn chargeable_minutes(billable: i64, rounding: RoundingPolicy) -> i64 {
    let billable = billable.max(0);

    match rounding {
        RoundingPolicy::RoundUp => {
            if billable == 0 {
                0
            } else {
                ((billable + 59) / 60) * 60
            }
        }
        RoundingPolicy::RoundDown => {
            // Truncation only ever drops partial hours beyond the first;
            // under one hour the (minimum-floored) minutes stand as-is
            if billable < 60 {
                billable
            } else {
                (billable / 60) * 60
            }
        }
        RoundingPolicy::Standard {
            block_minutes,
            grace_minutes,
        } => {
            if billable <= 60 || block_minutes <= 0 {
                return billable;
            }
            let extra = billable - 60;
            let mut blocks = extra / block_minutes;
            let remainder = extra % block_minutes;
            if remainder > grace_minutes.max(0) {
                blocks += 1;
            }
            60 + blocks * block_minutes
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
