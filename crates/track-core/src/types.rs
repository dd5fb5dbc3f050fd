//! # Domain Types
//!
//! Core domain types for the track-time billing system.
//!
//! ## Type Hierarchy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                             │
//! │                                                                  │
//! │  ┌───────────────┐  ┌──────────────────┐  ┌──────────────────┐  │
//! │  │    Ticket     │  │  RateDefinition  │  │ServiceCatalogEntry│ │
//! │  │  ───────────  │  │  ──────────────  │  │  ──────────────  │  │
//! │  │  id (UUID)    │  │  id (UUID)       │  │  id (UUID)       │  │
//! │  │  code (biz)   │  │  price_per_hour  │  │  price_cents     │  │
//! │  │  state        │  │  minimum_minutes │  │  track_inventory │  │
//! │  │  entered_at   │  │  rounding        │  │  current_stock   │  │
//! │  └───────┬───────┘  └──────────────────┘  └──────────────────┘  │
//! │          │                                                       │
//! │  ┌───────┴────────┐  ┌──────────────────┐  ┌────────────────┐   │
//! │  │ PauseInterval  │  │TicketServiceLine │  │     Client     │   │
//! │  │  started_at    │  │  price snapshot  │  │  membership    │   │
//! │  │  ended_at?     │  │  line_total      │  │  discount %    │   │
//! │  └────────────────┘  └──────────────────┘  └────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for relations
//! - Business code where customers see one (`code` on Ticket and Client) -
//!   human-readable, printed on the physical ticket

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Ticket State
// =============================================================================

/// The lifecycle state of a ticket (one customer visit).
///
/// ## Transition Graph
/// ```text
/// Active ──► Paused ──► Active      (pause / resume, any number of times)
/// Active ──► Closed                 (close, terminal)
/// Active ──► Cancelled              (cancel, terminal)
/// Paused ──► Closed                 (close, terminal)
/// Paused ──► Cancelled              (cancel, terminal)
/// ```
/// `Closed` and `Cancelled` are terminal: no operation may leave them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Customer is on the track, clock running.
    Active,
    /// Clock stopped; exactly one open pause interval exists.
    Paused,
    /// Billed and paid. Terminal.
    Closed,
    /// Visit voided with a recorded reason. Terminal.
    Cancelled,
}

impl TicketState {
    /// A terminal ticket accepts no further transitions.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, TicketState::Closed | TicketState::Cancelled)
    }

    /// States from which close/cancel/attach are legal.
    #[inline]
    pub const fn is_open(&self) -> bool {
        matches!(self, TicketState::Active | TicketState::Paused)
    }

    /// Whether the transition graph allows `self → next`.
    pub const fn can_transition_to(&self, next: TicketState) -> bool {
        match (*self, next) {
            (TicketState::Active, TicketState::Paused)
            | (TicketState::Active, TicketState::Closed)
            | (TicketState::Active, TicketState::Cancelled)
            | (TicketState::Paused, TicketState::Active)
            | (TicketState::Paused, TicketState::Closed)
            | (TicketState::Paused, TicketState::Cancelled) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TicketState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TicketState::Active => "active",
            TicketState::Paused => "paused",
            TicketState::Closed => "closed",
            TicketState::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a closed ticket was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// Bank transfer.
    Transfer,
    /// Anything the operator records manually.
    Other,
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Other => "other",
        };
        f.write_str(s)
    }
}

// =============================================================================
// Rounding Policy
// =============================================================================

/// How billable minutes are rounded into chargeable minutes.
///
/// Block and grace sizes are per-rate configuration, not constants: the
/// business rule ("15-minute blocks, 5 minutes of tolerance") has changed
/// before and will change again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round up to the next full hour.
    RoundUp,
    /// Truncate to the completed full hour (never below the minimum).
    RoundDown,
    /// First hour as-is; afterwards bill per started block of
    /// `block_minutes`, forgiving a remainder of up to `grace_minutes`.
    Standard {
        block_minutes: i64,
        grace_minutes: i64,
    },
}

impl RoundingPolicy {
    /// The configuration the track runs today: 15-minute blocks with a
    /// 5-minute grace window after the first hour.
    pub const fn standard_default() -> Self {
        RoundingPolicy::Standard {
            block_minutes: crate::DEFAULT_BLOCK_MINUTES,
            grace_minutes: crate::DEFAULT_GRACE_MINUTES,
        }
    }
}

// =============================================================================
// Rate Definition
// =============================================================================

/// A priced policy for track time, fixed on the ticket at open time.
///
/// Later edits to a rate never affect tickets already opened under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateDefinition {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name ("Entre semana", "Weekend peak", ...).
    pub name: String,

    /// Price per hour of track time, in cents.
    pub price_per_hour_cents: i64,

    /// Minimum billable minutes per visit.
    pub minimum_minutes: i64,

    /// How billable minutes round into chargeable minutes.
    pub rounding: RoundingPolicy,

    /// Whether the rate may be used for new tickets.
    pub active: bool,

    /// Optional applicability window (inclusive start).
    pub valid_from: Option<DateTime<Utc>>,

    /// Optional applicability window (exclusive end).
    pub valid_until: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RateDefinition {
    /// Returns the hourly price as Money.
    #[inline]
    pub fn price_per_hour(&self) -> Money {
        Money::from_cents(self.price_per_hour_cents)
    }

    /// Whether this rate can be assigned to a ticket opened at `at`.
    pub fn is_usable_at(&self, at: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if at < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if at >= until {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Ticket
// =============================================================================

/// One customer visit, from entry to close or cancellation.
///
/// ## Invariants
/// - `exited_at`, `billed_minutes`, the three amounts, and `payment_method`
///   are all `None` until the ticket is Closed, and all `Some` thereafter.
/// - `cancel_reason` is `Some` iff the ticket is Cancelled.
/// - `code` and `entered_at` never change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable business code, printed on the physical ticket.
    pub code: String,

    /// Client this visit belongs to.
    pub client_id: String,

    /// Party size (drivers on the track under this ticket). Always >= 1.
    pub party_size: i64,

    /// Current lifecycle state.
    pub state: TicketState,

    /// When the visit began. Immutable.
    pub entered_at: DateTime<Utc>,

    /// When the visit was billed. Set only at close.
    pub exited_at: Option<DateTime<Utc>>,

    /// Rate the ticket was opened under. Fixed at creation.
    pub rate_id: String,

    /// Operator who opened the ticket.
    pub opened_by: String,

    /// Operator who closed it. Set only at close.
    pub closed_by: Option<String>,

    /// Chargeable minutes, frozen at close.
    pub billed_minutes: Option<i64>,

    /// Time subtotal after membership discount, in cents. Set at close.
    pub time_cents: Option<i64>,

    /// Sum of service line totals, in cents. Set at close.
    pub services_cents: Option<i64>,

    /// Final total, in cents. Set at close.
    pub total_cents: Option<i64>,

    /// How the ticket was paid. Set only at close.
    pub payment_method: Option<PaymentMethod>,

    /// Why the ticket was cancelled. Set only when cancelled.
    pub cancel_reason: Option<String>,

    /// Free-form operator notes.
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Pause Interval
// =============================================================================

/// One pause span belonging to a ticket.
///
/// At most one interval per ticket has `ended_at = None` at any time;
/// that interval existing is what "currently paused" means. Intervals are
/// closed on resume (or at close time) and never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseInterval {
    pub id: String,
    pub ticket_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PauseInterval {
    /// Whether the pause is still running.
    #[inline]
    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Whole minutes this pause removed from billable time. An open
    /// interval is clamped to `as_of`; a closed one never counts past it.
    pub fn minutes_until(&self, as_of: DateTime<Utc>) -> i64 {
        let end = match self.ended_at {
            Some(e) if e < as_of => e,
            _ => as_of,
        };
        let end = if end < self.started_at {
            self.started_at
        } else {
            end
        };
        (end - self.started_at).num_minutes()
    }
}

// =============================================================================
// Service Catalog
// =============================================================================

/// How a catalog service is priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    /// One-off price per unit (rental helmet, snack).
    Flat,
    /// Priced by time; billed through the rate engine, not the line total.
    TimeBased,
    /// Bundled package price.
    Package,
}

/// A purchasable or rentable catalog item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCatalogEntry {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the operator and on the bill.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Pricing model for the service.
    pub cost_type: CostType,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Whether stock is tracked for this service.
    pub track_inventory: bool,

    /// Current stock level. `Some` iff `track_inventory`; never negative.
    pub current_stock: Option<i64>,

    /// Maximum quantity attachable to a single ticket.
    pub max_per_ticket: i64,

    /// Whether the service may be attached to new tickets (soft delete).
    pub active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceCatalogEntry {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Ticket Service Line
// =============================================================================

/// A quantity of a catalog service attached to a ticket.
/// Uses the snapshot pattern: name and unit price are frozen at attach
/// time and unaffected by later catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketServiceLine {
    pub id: String,
    pub ticket_id: String,
    pub service_id: String,
    /// Service name at attach time (frozen).
    pub name_snapshot: String,
    /// Quantity attached. 1..=max_per_ticket.
    pub quantity: i64,
    /// Unit price in cents at attach time (frozen).
    pub unit_price_cents: i64,
    /// quantity × unit price.
    pub line_total_cents: i64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TicketServiceLine {
    /// Returns the line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Client
// =============================================================================

/// Membership tier of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipTier {
    None,
    Basic,
    Premium,
    Vip,
}

impl Default for MembershipTier {
    fn default() -> Self {
        MembershipTier::None
    }
}

/// A registered client, as far as billing cares.
///
/// `discount_percent` is derived from the tier when the client is created
/// but stored explicitly, so an individual arrangement can diverge from
/// the tier default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Human-readable business code.
    pub code: String,

    pub name: String,

    pub membership: MembershipTier,

    /// Discount applied to the time subtotal at close. 0-100.
    pub discount_percent: u32,

    pub phone: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Calculation Outputs
// =============================================================================

/// The output of the rate calculation for one ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeCharge {
    /// Wall-clock minutes on the track, pauses already subtracted.
    pub real_minutes: i64,
    /// Minutes actually charged, after minimum and rounding policy.
    pub chargeable_minutes: i64,
    /// Cost of the chargeable time before any discount, in cents.
    pub time_cents: i64,
}

impl TimeCharge {
    /// Returns the time cost as Money.
    #[inline]
    pub fn time_cost(&self) -> Money {
        Money::from_cents(self.time_cents)
    }
}

/// The full monetary breakdown of a close (or a running preview).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    /// Rate-engine output for the visit.
    pub time: TimeCharge,
    /// Membership discount percent applied to the time subtotal.
    pub discount_percent: u32,
    /// Time subtotal after discount, in cents.
    pub time_cents_after_discount: i64,
    /// Sum of service line totals, in cents. Never discounted.
    pub services_cents: i64,
    /// Discounted time plus services, in cents.
    pub total_cents: i64,
}

impl Bill {
    /// Returns the final total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_transition_graph() {
        use TicketState::*;

        assert!(Active.can_transition_to(Paused));
        assert!(Active.can_transition_to(Closed));
        assert!(Active.can_transition_to(Cancelled));
        assert!(Paused.can_transition_to(Active));
        assert!(Paused.can_transition_to(Closed));
        assert!(Paused.can_transition_to(Cancelled));

        // Terminal states accept nothing
        for next in [Active, Paused, Closed, Cancelled] {
            assert!(!Closed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }

        // No self-loops on the open states either
        assert!(!Active.can_transition_to(Active));
        assert!(!Paused.can_transition_to(Paused));
    }

    #[test]
    fn test_terminal_and_open() {
        assert!(TicketState::Closed.is_terminal());
        assert!(TicketState::Cancelled.is_terminal());
        assert!(TicketState::Active.is_open());
        assert!(TicketState::Paused.is_open());
        assert!(!TicketState::Closed.is_open());
    }

    #[test]
    fn test_pause_minutes_clamps_open_interval() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let pause = PauseInterval {
            id: "p1".to_string(),
            ticket_id: "t1".to_string(),
            started_at: t0,
            ended_at: None,
            created_at: t0,
        };

        let as_of = t0 + chrono::Duration::minutes(12);
        assert_eq!(pause.minutes_until(as_of), 12);

        // as_of before the pause started never goes negative
        assert_eq!(pause.minutes_until(t0 - chrono::Duration::minutes(5)), 0);
    }

    #[test]
    fn test_rate_usable_window() {
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let rate = RateDefinition {
            id: "r1".to_string(),
            name: "Weekend".to_string(),
            price_per_hour_cents: 15000,
            minimum_minutes: 60,
            rounding: RoundingPolicy::RoundUp,
            active: true,
            valid_from: Some(t0),
            valid_until: Some(t0 + chrono::Duration::days(1)),
            created_at: t0,
            updated_at: t0,
        };

        assert!(rate.is_usable_at(t0));
        assert!(rate.is_usable_at(t0 + chrono::Duration::hours(5)));
        assert!(!rate.is_usable_at(t0 - chrono::Duration::minutes(1)));
        assert!(!rate.is_usable_at(t0 + chrono::Duration::days(1)));

        let inactive = RateDefinition {
            active: false,
            ..rate
        };
        assert!(!inactive.is_usable_at(t0));
    }

    #[test]
    fn test_state_serde_snake_case() {
        let s = serde_json::to_string(&TicketState::Cancelled).unwrap();
        assert_eq!(s, "\"cancelled\"");
        let back: TicketState = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(back, TicketState::Paused);
    }
}
