//! OpenAPI/Utoipa configuration.

use crate::api::{health::MISC_TAG, ticket::TICKET_TAG};
use crate::oauth2::OAUTH2_TAG;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

/// Security schemes accepted by the authorize endpoint.
pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);

        let bearer = HttpBuilder::new()
            .scheme(HttpAuthScheme::Bearer)
            .description(Some(
                "Access token returned by `/oauth/token` (the ticket id).",
            ))
            .build();
        components.add_security_scheme("bearer_auth", SecurityScheme::Http(bearer));

        let basic = HttpBuilder::new()
            .scheme(HttpAuthScheme::Basic)
            .description(Some("Username (or email) and password of the user."))
            .build();
        components.add_security_scheme("basic_auth", SecurityScheme::Http(basic));
    }
}

/// OpenAPI documentation configuration.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "OAuth Ticket Server API",
        version = "1.0.0",
        description = "OAuth2 grants and bearer session tickets for registered applications."
    ),
    tags(
        (name = MISC_TAG, description = "Miscellaneous endpoints"),
        (name = OAUTH2_TAG, description = "OAuth2 authorization and token endpoints"),
        (name = TICKET_TAG, description = "Ticket introspection and logout")
    )
)]
pub struct ApiDoc;
