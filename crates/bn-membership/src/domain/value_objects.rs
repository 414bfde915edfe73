//! # Domain Value Objects
//!
//! Identifiers, parties, statuses and roles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Unique, immutable identifier of a membership or group record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinearId(Uuid);

impl LinearId {
    /// Fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LinearId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LinearId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a business network.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NetworkId(Uuid);

impl NetworkId {
    /// Fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a node operator, e.g. `O=Party0, L=Dublin, C=IE`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Party {
    name: String,
}

impl Party {
    /// Create a party from its distinguished name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Distinguished name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Membership status state machine.
///
/// ```text
/// PENDING ──activate──▶ ACTIVE ◀──activate── SUSPENDED
///                          └──────suspend──────▶┘
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipStatus {
    /// Requested by the candidate, awaiting activation.
    #[default]
    Pending,
    /// Activated by an authority.
    Active,
    /// Suspended by an authority; may be reactivated.
    Suspended,
}

impl MembershipStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: MembershipStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Active, Self::Suspended)
                | (Self::Suspended, Self::Active)
        )
    }

    /// Whether this status blocks a new request for the same party.
    pub fn blocks_new_request(&self) -> bool {
        matches!(self, Self::Pending | Self::Active)
    }

    /// Upper-case status label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
        }
    }
}

impl fmt::Display for MembershipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission carried by a role.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Activate pending or suspended memberships.
    CanActivateMembership,
    /// Suspend active memberships.
    CanSuspendMembership,
    /// Create and modify groups.
    CanModifyGroups,
    /// Change the roles of memberships.
    CanModifyRoles,
    /// Application-defined permission (e.g. `CAN_ISSUE_LOAN`).
    Custom(String),
}

impl Permission {
    /// Application-defined permission.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CanActivateMembership => f.write_str("CAN_ACTIVATE_MEMBERSHIP"),
            Self::CanSuspendMembership => f.write_str("CAN_SUSPEND_MEMBERSHIP"),
            Self::CanModifyGroups => f.write_str("CAN_MODIFY_GROUPS"),
            Self::CanModifyRoles => f.write_str("CAN_MODIFY_ROLES"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

/// Named set of permissions.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Role name.
    pub name: String,
    /// Permissions granted by this role.
    pub permissions: BTreeSet<Permission>,
}

/// Name of the role held by the network's founding authority.
pub const AUTHORITY_ROLE_NAME: &str = "BNO";

impl Role {
    /// Create a role.
    pub fn new(name: impl Into<String>, permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            name: name.into(),
            permissions: permissions.into_iter().collect(),
        }
    }

    /// The network operator role, holding every administrative permission.
    pub fn authority() -> Self {
        Self::new(
            AUTHORITY_ROLE_NAME,
            [
                Permission::CanActivateMembership,
                Permission::CanSuspendMembership,
                Permission::CanModifyGroups,
                Permission::CanModifyRoles,
            ],
        )
    }

    /// Whether the role grants `permission`.
    pub fn grants(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }
}
