//! # Membership Discounts
//!
//! Applies a client's membership discount to the time subtotal.
//!
//! ## Policy
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Discount applies to TIME only                                   │
//! │                                                                  │
//! │  time subtotal ──► × (1 − pct/100) ──┐                           │
//! │                                      ├──► total                  │
//! │  services subtotal ──────────────────┘                           │
//! │                                                                  │
//! │  Flat-fee service lines are never discounted.                    │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The percentage is read from the client at close time, not frozen when
//! the ticket opens: a membership change mid-visit affects the final bill.
//! That is the current business rule, not an accident.

use crate::money::Money;
use crate::types::{Bill, MembershipTier, TimeCharge};

// =============================================================================
// Tier Defaults
// =============================================================================

/// Default discount percent for a membership tier.
///
/// Clients store their percent explicitly (an individual arrangement can
/// diverge); this table only seeds new clients.
pub const fn tier_default_percent(tier: MembershipTier) -> u32 {
    match tier {
        MembershipTier::None => 0,
        MembershipTier::Basic => 5,
        MembershipTier::Premium => 10,
        MembershipTier::Vip => 15,
    }
}

// =============================================================================
// Discount Application
// =============================================================================

/// Applies a percent discount (0-100) to an amount, half-up to the cent.
///
/// Percentages above 100 are clamped; a bill never goes negative.
pub fn apply_discount(amount: Money, percent: u32) -> Money {
    let percent = percent.min(100);
    amount.apply_percentage_discount(percent * 100)
}

/// Assembles the full bill from the time charge and the services subtotal.
///
/// ## Example
/// ```rust
/// use track_core::discount::assemble_bill;
/// use track_core::types::TimeCharge;
///
/// let time = TimeCharge { real_minutes: 60, chargeable_minutes: 60, time_cents: 10000 };
/// let bill = assemble_bill(time, 2000, 10);
///
/// // $100.00 time at 10% off + $20.00 services = $110.00
/// assert_eq!(bill.time_cents_after_discount, 9000);
/// assert_eq!(bill.total_cents, 11000);
/// ```
pub fn assemble_bill(time: TimeCharge, services_cents: i64, discount_percent: u32) -> Bill {
    let discounted = apply_discount(time.time_cost(), discount_percent);
    let total = discounted + Money::from_cents(services_cents);

    Bill {
        time,
        discount_percent: discount_percent.min(100),
        time_cents_after_discount: discounted.cents(),
        services_cents,
        total_cents: total.cents(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn time(cents: i64) -> TimeCharge {
        TimeCharge {
            real_minutes: 60,
            chargeable_minutes: 60,
            time_cents: cents,
        }
    }

    #[test]
    fn test_tier_defaults() {
        assert_eq!(tier_default_percent(MembershipTier::None), 0);
        assert_eq!(tier_default_percent(MembershipTier::Basic), 5);
        assert_eq!(tier_default_percent(MembershipTier::Premium), 10);
        assert_eq!(tier_default_percent(MembershipTier::Vip), 15);
    }

    #[test]
    fn test_discount_applies_to_time_only() {
        // $100.00 time + $20.00 services at 10% → $90.00 + $20.00 = $110.00
        let bill = assemble_bill(time(10000), 2000, 10);

        assert_eq!(bill.time_cents_after_discount, 9000);
        assert_eq!(bill.services_cents, 2000);
        assert_eq!(bill.total_cents, 11000);
    }

    #[test]
    fn test_zero_percent_is_identity() {
        let bill = assemble_bill(time(12345), 500, 0);
        assert_eq!(bill.time_cents_after_discount, 12345);
        assert_eq!(bill.total_cents, 12845);
    }

    #[test]
    fn test_percent_clamped_at_hundred() {
        let bill = assemble_bill(time(10000), 2000, 250);
        assert_eq!(bill.time_cents_after_discount, 0);
        assert_eq!(bill.total_cents, 2000);
        assert_eq!(bill.discount_percent, 100);
    }

    #[test]
    fn test_discount_rounds_half_up() {
        // 15% of $0.99 = 14.85 cents → discount 15, remainder 84
        let bill = assemble_bill(time(99), 0, 15);
        assert_eq!(bill.time_cents_after_discount, 84);
    }
}
