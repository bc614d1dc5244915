use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinegraph::{
    api::{create_router, shutdown_on, AppState},
    config::Config,
    db::Neo4jStore,
    services::{providers::Clients, Pipeline},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinegraph=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = Neo4jStore::connect(
        &config.neo4j_uri,
        &config.neo4j_user,
        &config.neo4j_password,
        config.store_retry_policy(),
    )
    .await?;

    let clients = Clients::from_config(&config)?;
    let pipeline = Pipeline::new(
        Arc::new(store),
        clients,
        config.enrichment_settings()?,
        config.similarity_settings(),
    );

    let state = AppState::new(pipeline);
    let cancel = state.cancel.clone();
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_on(tokio::signal::ctrl_c(), cancel))
        .await?;

    Ok(())
}
