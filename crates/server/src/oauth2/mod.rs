//! OAuth2 grant and ticket authority.
//!
//! ## Supported Flows
//!
//! - Authorization Code (`/oauth/authz` then `/oauth/token`)
//! - Resource Owner Password (`/oauth/token`)
//!
//! Access tokens are ticket ids. An identity token is attached to
//! authorization-code exchanges whose scopes include `openid`.

pub mod authorization;
pub mod codec;
pub mod directory;
pub mod endpoints;
pub mod grant;
pub mod realm;
pub mod registrar;
mod state;
pub mod ticket;
pub mod validator;

pub use authorization::AuthorizationStore;
pub use codec::TokenCodec;
pub use directory::UserDirectory;
pub use endpoints::router;
pub use grant::{GrantOrchestrator, TokenResponse};
pub use realm::{Realm, hash_password, verify_password};
pub use registrar::ApplicationRegistry;
pub use state::OAuth2State;
pub use ticket::TicketStore;
pub use validator::AuthorizationValidator;

/// OpenAPI tag for OAuth2 endpoints
pub const OAUTH2_TAG: &str = "OAuth2";
