//! Owner identities and the dual-scope visibility model.
//!
//! Every read filters by an ordered owner set {caller, system default} and
//! every write re-checks that the resolved entity is owned by the caller
//! itself. Visibility does not grant mutability.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Opaque owner identity (the authenticated subject, or the shared
/// system-default pseudo-owner). Externally issued, so a string rather
/// than a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(Cow<'static, str>);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// Const constructor for fixed identities in tests.
    pub const fn from_static(id: &'static str) -> Self {
        Self(Cow::Borrowed(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self(Cow::Owned(value))
    }
}

/// Produces the visibility scope for a caller. Pure function of the
/// configured system-default identity; holds no other state.
#[derive(Debug, Clone)]
pub struct TenancyResolver {
    system: OwnerId,
}

impl TenancyResolver {
    pub fn new(system: OwnerId) -> Self {
        Self { system }
    }

    /// The shared pseudo-owner whose entities are visible to everyone.
    pub fn system_owner(&self) -> &OwnerId {
        &self.system
    }

    pub fn scope(&self, caller: OwnerId) -> VisibilityScope {
        VisibilityScope::new(caller, self.system.clone())
    }
}

/// Ordered, fixed-size owner set used as the filter for every read and as
/// the ownership reference for every write. The caller's own scope comes
/// first; queries that resolve by name rely on that order as a tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityScope {
    owners: [OwnerId; 2],
}

impl VisibilityScope {
    pub fn new(caller: OwnerId, system: OwnerId) -> Self {
        Self {
            owners: [caller, system],
        }
    }

    pub fn caller(&self) -> &OwnerId {
        &self.owners[0]
    }

    pub fn system_default(&self) -> &OwnerId {
        &self.owners[1]
    }

    /// The full owner set, caller first.
    pub fn owners(&self) -> &[OwnerId] {
        &self.owners
    }

    /// Whether an entity owned by `owner` may be mutated by this caller.
    pub fn can_mutate(&self, owner: &OwnerId) -> bool {
        owner == self.caller()
    }
}
