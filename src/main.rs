use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use cesta_hub::config::AppConfig;
use cesta_hub::error::AppError;
use cesta_hub::telemetry;
use cesta_hub::workflows::distribution::{
    distribution_router, load_example_data, summarize, DistributionService, DistributionState,
    InMemoryDeliveryRepository, InMemoryFamilyRepository, InMemoryInstitutionRepository,
    InMemoryUserRepository, Session, SessionManager, UserId, UserRole,
};
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
}

#[derive(Parser, Debug)]
#[command(
    name = "Cesta Hub",
    about = "Run the municipal basic-food-basket distribution service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Load the example dataset into a fresh store and print what was created
    Seed,
    /// Render a dashboard summary for the example dataset
    Report,
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Seed => run_seed(),
        Command::Report => run_report(),
    }
}

struct Stores {
    families: Arc<InMemoryFamilyRepository>,
    institutions: Arc<InMemoryInstitutionRepository>,
    deliveries: Arc<InMemoryDeliveryRepository>,
    users: Arc<InMemoryUserRepository>,
}

impl Stores {
    fn new() -> Self {
        Self {
            families: Arc::new(InMemoryFamilyRepository::default()),
            institutions: Arc::new(InMemoryInstitutionRepository::default()),
            deliveries: Arc::new(InMemoryDeliveryRepository::default()),
            users: Arc::new(InMemoryUserRepository::default()),
        }
    }

    fn seed(&self) -> cesta_hub::workflows::distribution::SeedSummary {
        load_example_data(
            &self.families,
            &self.institutions,
            &self.deliveries,
            &self.users,
        )
    }
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let stores = Stores::new();
    if config.seed_on_start {
        let summary = stores.seed();
        info!(
            families = summary.families,
            institutions = summary.institutions,
            users = summary.users,
            "example data loaded"
        );
    }

    let service = DistributionService::new(
        stores.families.clone(),
        stores.institutions.clone(),
        stores.deliveries.clone(),
    );
    let sessions = SessionManager::new(stores.users.clone());
    let dist_state = Arc::new(DistributionState { service, sessions });

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .with_state(state)
        .merge(distribution_router(dist_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "basket distribution service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_seed() -> Result<(), AppError> {
    let stores = Stores::new();
    let summary = stores.seed();

    println!("Example data loaded");
    println!("- families: {}", summary.families);
    println!("- institutions: {}", summary.institutions);
    println!("- users: {}", summary.users);
    println!("- deliveries: {}", summary.deliveries);

    Ok(())
}

fn run_report() -> Result<(), AppError> {
    let stores = Stores::new();
    stores.seed();

    let service = DistributionService::new(
        stores.families.clone(),
        stores.institutions.clone(),
        stores.deliveries.clone(),
    );

    // CLI report covers the whole municipality, so use an administrator view.
    let admin = Session {
        user_id: UserId("cli".to_string()),
        email: "cli@localhost".to_string(),
        name: "CLI".to_string(),
        role: UserRole::Admin,
        institution_id: None,
    };

    let families = service.families()?;
    let institutions = service.institutions()?;
    let deliveries = service.deliveries_for(&admin)?;
    let summary = summarize(&admin, &families, &institutions, &deliveries);

    println!("Distribution overview");
    println!("- deliveries recorded: {}", summary.deliveries);
    println!("- institutions: {}", summary.institutions);
    println!("- active families: {}", summary.active_families);
    println!("- blocked families: {}", summary.blocked_families);

    println!("\nInstitution stock");
    for institution in &institutions {
        println!(
            "- {}: {} basket(s)",
            institution.name,
            institution.inventory.baskets()
        );
    }

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
