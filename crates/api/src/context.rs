use stockbook_core::OwnerId;

/// Authenticated caller for a request.
///
/// This is immutable and must be present for all `/api` routes; the auth
/// middleware inserts it after resolving the bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerContext {
    owner: OwnerId,
}

impl CallerContext {
    pub fn new(owner: OwnerId) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }
}
