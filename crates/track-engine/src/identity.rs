//! # Caller Identity
//!
//! The opaque identity the engine receives with every operation.
//!
//! The engine does not authenticate anyone. It records the caller on
//! every audit record and enforces exactly one capability gate itself
//! (cancellation). Which roles get which capabilities is policy
//! configuration resolved by the caller's layer; the engine only looks
//! at the consolidated [`CapabilitySet`], never at the role.

use serde::{Deserialize, Serialize};

// =============================================================================
// Role
// =============================================================================

/// Operator roles, as supplied by the identity collaborator.
///
/// Kept for audit context; the engine makes no decisions on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Operator,
    Supervisor,
    Admin,
}

impl Role {
    /// The default capability mapping the business runs today.
    /// Callers may override per deployment; this is a convenience, not
    /// engine logic.
    pub const fn default_capabilities(&self) -> CapabilitySet {
        match self {
            Role::Operator => CapabilitySet {
                can_cancel: false,
                can_modify_others: false,
            },
            Role::Supervisor => CapabilitySet {
                can_cancel: true,
                can_modify_others: false,
            },
            Role::Admin => CapabilitySet {
                can_cancel: true,
                can_modify_others: true,
            },
        }
    }
}

// =============================================================================
// Capability Set
// =============================================================================

/// The consolidated permission flags the engine consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    /// May cancel open tickets.
    pub can_cancel: bool,
    /// May operate on tickets opened by other operators.
    pub can_modify_others: bool,
}

// =============================================================================
// Caller
// =============================================================================

/// The identity attached to one engine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Caller {
    /// Stable user id from the identity collaborator.
    pub user_id: String,
    /// Display name, recorded on audit entries.
    pub name: String,
    pub role: Role,
    pub capabilities: CapabilitySet,
}

impl Caller {
    /// Builds a caller with the role's default capabilities.
    pub fn with_role(user_id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Caller {
            user_id: user_id.into(),
            name: name.into(),
            role,
            capabilities: role.default_capabilities(),
        }
    }

    /// Whether this caller may cancel tickets.
    #[inline]
    pub const fn can_cancel(&self) -> bool {
        self.capabilities.can_cancel
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
