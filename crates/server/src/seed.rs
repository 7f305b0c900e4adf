//! Startup registration of the applications listed in the service configuration.

use crate::AppResources;
use crate::error::StoreError;
use crate::oauth2::ApplicationRegistry;

/// Registers every configured application that does not exist yet.
///
/// Returns the number of applications created. Existing records are left alone.
#[tracing::instrument(skip(resources))]
pub async fn seed_applications(resources: &AppResources) -> Result<usize, StoreError> {
    let registry = ApplicationRegistry::new(resources.db.clone(), resources.events.clone());
    let mut created = 0;
    for app in &resources.config.seed_applications {
        if registry.ensure(app).await? {
            created += 1;
        }
    }
    if created > 0 {
        tracing::info!(created, "Seeded applications");
    }
    Ok(created)
}
