use std::net::SocketAddr;
use std::sync::Arc;

use campus_lost_found::auth::SessionKeys;
use campus_lost_found::config::Config;
use campus_lost_found::dashboard::{ConfirmationRegistry, DashboardActions};
use campus_lost_found::db::{
    create_pool, run_migrations, IdentityStore, ItemStore, MemoryIdentityStore, MemoryItemStore,
    PgIdentityStore, PgItemStore,
};
use campus_lost_found::middleware::AuthLayer;
use campus_lost_found::proto::auth::auth_service_server::AuthServiceServer;
use campus_lost_found::proto::dashboard::dashboard_service_server::DashboardServiceServer;
use campus_lost_found::proto::health::health_server::HealthServer;
use campus_lost_found::proto::items::items_service_server::ItemsServiceServer;
use campus_lost_found::proto::FILE_DESCRIPTOR_SET;
use campus_lost_found::services::{
    AuthServiceImpl, DashboardServiceImpl, HealthServiceImpl, ItemsServiceImpl,
};
use campus_lost_found::storage::backend_from_config;

use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_lost_found=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    tracing::info!("Starting campus-lost-found gRPC server...");

    let (items, identities): (Arc<dyn ItemStore>, Arc<dyn IdentityStore>) =
        match &config.database_url {
            Some(url) => {
                tracing::info!("Connecting to database...");
                let pool = create_pool(url).await?;
                run_migrations(&pool).await?;
                tracing::info!("Database connection established, migrations applied");
                (
                    Arc::new(PgItemStore::new(pool.clone())),
                    Arc::new(PgIdentityStore::new(pool)),
                )
            }
            None => {
                tracing::warn!("DATABASE_URL not set, using in-memory stores");
                (
                    Arc::new(MemoryItemStore::new()),
                    Arc::new(MemoryIdentityStore::new()),
                )
            }
        };

    let storage = backend_from_config(&config).await;
    let keys = Arc::new(SessionKeys::new(
        config.jwt_secret.clone(),
        config.session_ttl_hours,
    ));
    let confirmations = Arc::new(ConfirmationRegistry::new());

    let items_service =
        ItemsServiceImpl::new(items.clone(), storage.clone(), config.photo_policy());
    let dashboard_service = DashboardServiceImpl::new(
        DashboardActions::new(items.clone(), identities.clone(), storage),
        confirmations.clone(),
    );
    let auth_service = AuthServiceImpl::new(
        identities.clone(),
        keys.clone(),
        config.sign_up_policy(),
        confirmations,
    );
    let health_service = HealthServiceImpl::new(items);

    // CORS layer for gRPC-Web
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
        .expose_headers(Any);

    let reflection_service = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!("Listening on {}", addr);

    Server::builder()
        .accept_http1(true) // Required for gRPC-Web
        .layer(cors)
        .layer(tonic_web::GrpcWebLayer::new())
        .layer(AuthLayer::new(keys, identities))
        .add_service(reflection_service)
        .add_service(ItemsServiceServer::new(items_service))
        .add_service(DashboardServiceServer::new(dashboard_service))
        .add_service(AuthServiceServer::new(auth_service))
        .add_service(HealthServer::new(health_service))
        .serve(addr)
        .await?;

    Ok(())
}
