use color_eyre::eyre::WrapErr;
use oauth_ticket_server::AppResources;
use oauth_ticket_server::api::start_webserver;
use oauth_ticket_server::config::load_config;
use oauth_ticket_server::events::spawn_application_cleanup;
use oauth_ticket_server::seed::seed_applications;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "oauth_ticket_server=info,sea_orm=info";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    initialize_tracing();

    let config = Arc::new(load_config().wrap_err("Failed to load configuration")?);

    let db = Arc::new(
        Database::connect(&config.database_url)
            .await
            .wrap_err("Failed to connect to database")?,
    );

    let resources = AppResources::new(db, config);

    seed_applications(&resources)
        .await
        .wrap_err("Failed to seed applications")?;

    // Creates the record and its secret key on first start
    let configuration = resources
        .configuration
        .get()
        .await
        .wrap_err("Failed to load deployment configuration")?;
    tracing::info!(name = %configuration.name, "Configuration loaded");

    spawn_application_cleanup(
        resources.db.clone(),
        resources.config.clone(),
        &resources.events,
    );

    start_webserver(resources).await?;
    Ok(())
}
