//! Shared state for the OAuth2 and ticket routers.

use crate::AppResources;
use crate::configuration::ConfigurationService;
use crate::oauth2::authorization::AuthorizationStore;
use crate::oauth2::directory::UserDirectory;
use crate::oauth2::grant::GrantOrchestrator;
use crate::oauth2::realm::Realm;
use crate::oauth2::registrar::ApplicationRegistry;
use crate::oauth2::ticket::TicketStore;
use crate::oauth2::validator::AuthorizationValidator;

/// Every component the grant flows need. Cloning is cheap.
#[derive(Clone)]
pub struct OAuth2State {
    pub registry: ApplicationRegistry,
    pub directory: UserDirectory,
    pub authorizations: AuthorizationStore,
    pub tickets: TicketStore,
    pub validator: AuthorizationValidator,
    pub realm: Realm,
    pub configuration: ConfigurationService,
}

impl OAuth2State {
    pub fn new(resources: &AppResources) -> Self {
        let directory = UserDirectory::new(resources.db.clone());
        let realm = Realm;
        Self {
            registry: ApplicationRegistry::new(resources.db.clone(), resources.events.clone()),
            validator: AuthorizationValidator::new(directory.clone(), realm),
            directory,
            authorizations: AuthorizationStore::new(
                resources.db.clone(),
                resources.config.oauth2.clone(),
            ),
            tickets: TicketStore::new(resources.db.clone(), resources.config.tickets.clone()),
            realm,
            configuration: resources.configuration.clone(),
        }
    }

    /// Assembles the grant state machine for one request.
    pub fn orchestrator(&self) -> GrantOrchestrator<'_> {
        GrantOrchestrator {
            registry: &self.registry,
            directory: &self.directory,
            authorizations: &self.authorizations,
            tickets: &self.tickets,
            validator: &self.validator,
            configuration: &self.configuration,
        }
    }
}
