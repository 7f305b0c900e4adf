//! Ticket introspection and logout.

use crate::api::auth::AuthError;
use crate::entity::ticket;
use crate::error::StoreError;
use crate::oauth2::OAuth2State;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Tag for OpenAPI documentation.
pub const TICKET_TAG: &str = "Tickets";

pub fn router(state: OAuth2State) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(subject))
        .routes(routes!(username))
        .routes(routes!(logout))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub username: String,
    pub groups: Vec<String>,
}

async fn active_ticket(state: &OAuth2State, id: &str) -> Result<ticket::Model, AuthError> {
    state.tickets.find_active(id).await.map_err(lookup_error)
}

fn lookup_error(err: StoreError) -> AuthError {
    if err.is_not_found() {
        AuthError::not_found("Ticket not found")
    } else {
        tracing::error!(error = %err, "Ticket lookup failed");
        AuthError::server_error()
    }
}

/// Who a ticket belongs to, with the user's groups.
#[tracing::instrument(skip(state, ticket))]
#[utoipa::path(
    get,
    path = "/{ticket}/subject",
    tag = TICKET_TAG,
    operation_id = "Ticket Subject",
    summary = "Resolve the subject of a ticket",
    description = "Returns the username and groups of the ticket owner. Groups are empty when the \
                   user no longer exists. Expired tickets are reported as not found.",
    params(("ticket" = String, Path, description = "Ticket id (the access token)")),
    responses(
        (status = 200, description = "Ticket subject", body = Subject),
        (status = 404, description = "Unknown or expired ticket", body = AuthError),
    )
)]
pub async fn subject(State(state): State<OAuth2State>, Path(ticket): Path<String>) -> Response {
    let found = match active_ticket(&state, &ticket).await {
        Ok(found) => found,
        Err(e) => return e.into_response(),
    };
    match state.directory.groups_of(&found.username).await {
        Ok(groups) => Json(Subject {
            username: found.username,
            groups,
        })
        .into_response(),
        Err(e) => lookup_error(e).into_response(),
    }
}

/// Bare username of the ticket owner.
#[tracing::instrument(skip(state, ticket))]
#[utoipa::path(
    get,
    path = "/{ticket}/username",
    tag = TICKET_TAG,
    operation_id = "Ticket Username",
    summary = "Resolve the username of a ticket",
    params(("ticket" = String, Path, description = "Ticket id (the access token)")),
    responses(
        (status = 200, description = "Username", body = str, content_type = "text/plain", example = "alice"),
        (status = 404, description = "Unknown or expired ticket", body = AuthError),
    )
)]
pub async fn username(State(state): State<OAuth2State>, Path(ticket): Path<String>) -> Response {
    match active_ticket(&state, &ticket).await {
        Ok(found) => found.username.into_response(),
        Err(e) => e.into_response(),
    }
}

/// Ends the session. Deleting an unknown ticket also succeeds.
#[tracing::instrument(skip(state, ticket))]
#[utoipa::path(
    delete,
    path = "/{ticket}",
    tag = TICKET_TAG,
    operation_id = "Ticket Logout",
    summary = "Delete a ticket",
    params(("ticket" = String, Path, description = "Ticket id (the access token)")),
    responses(
        (status = 204, description = "Ticket removed"),
    )
)]
pub async fn logout(State(state): State<OAuth2State>, Path(ticket): Path<String>) -> Response {
    match state.tickets.delete(&ticket).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => lookup_error(e).into_response(),
    }
}
