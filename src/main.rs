use std::sync::Arc;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ironclub::{
    api,
    config::Settings,
    payments::{MercadoPagoClient, PaymentGateway},
    repository::{SqliteMembershipRepository, SqlitePaymentRequestRepository},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ironclub=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!("Starting Ironclub server on {}:{}", settings.server.host, settings.server.port);

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await?;

    // Initialize repositories
    let payment_request_repo = Arc::new(SqlitePaymentRequestRepository::new(db_pool.clone()));
    let membership_repo = Arc::new(SqliteMembershipRepository::new(db_pool.clone()));

    // Initialize payment gateway client if configured
    let gateway: Option<Arc<dyn PaymentGateway>> = if settings.gateway.enabled {
        if let Some(access_token) = settings.gateway.access_token.clone() {
            tracing::info!("Online payment gateway enabled");
            Some(Arc::new(MercadoPagoClient::new(
                access_token,
                &settings.gateway,
                &settings.server.base_url,
            )))
        } else {
            tracing::warn!("Payment gateway enabled but missing access token");
            None
        }
    } else {
        tracing::info!("Online payment gateway disabled");
        None
    };

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        payment_request_repo,
        membership_repo,
        gateway,
        db_pool.clone(),
    ));

    // Create API app
    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(
        format!("{}:{}", settings.server.host, settings.server.port)
    ).await?;

    tracing::info!("Server listening on http://{}:{}", settings.server.host, settings.server.port);

    axum::serve(listener, app).await?;

    Ok(())
}
