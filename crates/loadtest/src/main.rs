use goose::prelude::*;
use std::env;

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

async fn health_check(user: &mut GooseUser) -> TransactionResult {
    let _goose_metrics = user.get("/healthz").await?;
    Ok(())
}

/// Password grant followed by introspection and logout of the issued ticket.
async fn password_session(user: &mut GooseUser) -> TransactionResult {
    let client_id = env_or("CLIENT_ID", "loadtest");
    let client_secret = env_or("CLIENT_SECRET", "loadtest-secret");
    let username = env_or("LOGIN_USER", "loadtest");
    let password = env_or("LOGIN_PASSWORD", "loadtest");

    let params = [
        ("grant_type", "password"),
        ("client_id", client_id.as_str()),
        ("client_secret", client_secret.as_str()),
        ("username", username.as_str()),
        ("password", password.as_str()),
    ];
    let mut goose = user.post_form("/oauth/token", &params).await?;

    let body = match goose.response {
        Ok(response) => response
            .text()
            .await
            .ok()
            .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).ok()),
        Err(_) => None,
    };
    let Some(token) = body
        .as_ref()
        .and_then(|b| b["access_token"].as_str())
        .map(str::to_string)
    else {
        return user.set_failure(
            "no access token in token response",
            &mut goose.request,
            None,
            None,
        );
    };

    let _goose_metrics = user.get(&format!("/ticket/{token}/subject")).await?;
    let _goose_metrics = user.delete(&format!("/ticket/{token}")).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), GooseError> {
    println!(
        "Load testing as {} through application {}",
        env_or("LOGIN_USER", "loadtest"),
        env_or("CLIENT_ID", "loadtest")
    );

    GooseAttack::initialize()?
        .register_scenario(
            scenario!("HealthCheck").register_transaction(transaction!(health_check)),
        )
        .register_scenario(
            scenario!("PasswordSessions").register_transaction(transaction!(password_session)),
        )
        .execute()
        .await?;

    Ok(())
}
