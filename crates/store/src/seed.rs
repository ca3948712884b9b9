//! Boot-time seeding of the shared default categories.

use stockbook_core::{DomainError, DomainResult, EntityName, OwnerId};

use crate::repo::CategoryRepo;

/// Categories every user sees from their first request.
pub const DEFAULT_CATEGORY_NAMES: [&str; 5] =
    ["Food", "Appliances", "Books", "Clothing", "Furniture"];

/// Ensures the default categories exist under the system owner. Runs on
/// every boot; names that already exist are left alone, so the call is
/// idempotent. Returns how many categories were actually created.
pub async fn seed_default_categories<S>(store: &S, system: &OwnerId) -> DomainResult<usize>
where
    S: CategoryRepo,
{
    let mut created = 0;
    for raw in DEFAULT_CATEGORY_NAMES {
        let name =
            EntityName::new(raw).map_err(|err| DomainError::validation(err.to_string()))?;
        match store.create(system, &name).await {
            Ok(outcome) => {
                created += 1;
                tracing::info!(
                    category = raw,
                    resurrected = outcome.resurrected,
                    "seeded default category"
                );
            }
            Err(DomainError::Conflict(_)) => {
                tracing::debug!(category = raw, "default category already present");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(created)
}
