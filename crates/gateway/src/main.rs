use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use sufra_catalog::{MenuCatalog, MenuSearch, PineconeBackend, VectorBackend};
use sufra_domain::config::Config;
use sufra_domain::hours::OpeningHours;
use sufra_gateway::api;
use sufra_gateway::runtime::session_lock::SessionLockMap;
use sufra_gateway::runtime::tools::ToolRegistry;
use sufra_gateway::state::AppState;
use sufra_providers::OpenRouterProvider;
use sufra_store::{CoverageRepo, MenuRepo, OrderRepo, PromoRepo, SessionRepo};

#[derive(Parser)]
#[command(name = "sufra", about = "Conversational restaurant ordering service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the gateway server (default).
    Serve,
    /// Apply database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();
    let config = Arc::new(Config::from_env().context("loading configuration")?);

    match cli.command {
        None | Some(Command::Serve) => run_server(config).await,
        Some(Command::Migrate) => {
            let pool = sufra_store::connect(&config.database).await?;
            sufra_store::migrate(&pool).await?;
            Ok(())
        }
    }
}

/// Structured JSON tracing with env-filter overrides.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sufra_gateway=debug")),
        )
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("sufra starting");

    // ── Database pool + repositories ─────────────────────────────────
    let pool = sufra_store::connect(&config.database)
        .await
        .context("connecting to database")?;
    let menu = MenuRepo::new(pool.clone());
    let coverage = CoverageRepo::new(pool.clone());
    let promos = PromoRepo::new(pool.clone());
    let orders = OrderRepo::new(pool.clone());
    let sessions = SessionRepo::new(pool.clone(), config.restaurant.session_expiry_hours);

    // ── Menu catalog (warm at startup) ───────────────────────────────
    let catalog = Arc::new(MenuCatalog::new());
    match catalog.warm(&menu).await {
        Ok(count) => tracing::info!(items = count, "menu catalog ready"),
        Err(e) => tracing::warn!(error = %e, "menu warm-up failed — search starts empty"),
    }

    // ── Vector search backend ────────────────────────────────────────
    let backend: Option<Arc<dyn VectorBackend>> = if config.vector.api_key.is_empty() {
        tracing::info!("no vector API key — menu search is lexical only");
        None
    } else {
        let pinecone = PineconeBackend::from_config(&config.vector)
            .context("initializing vector backend")?;
        tracing::info!(index = %config.vector.index, "vector backend ready");
        Some(Arc::new(pinecone))
    };
    let search = Arc::new(MenuSearch::new(catalog.clone(), backend));

    // ── LLM provider ─────────────────────────────────────────────────
    if config.llm.api_key.is_empty() {
        tracing::warn!("LLM_API_KEY is empty — agent turns will fail");
    }
    let llm = Arc::new(OpenRouterProvider::from_config(&config.llm)?);
    tracing::info!(model = %config.llm.model, "LLM provider ready");

    // ── Tool registry ────────────────────────────────────────────────
    let tools = Arc::new(ToolRegistry::new(
        catalog.clone(),
        search,
        menu.clone(),
        coverage,
        promos,
        orders,
        config.restaurant.clone(),
    ));

    // ── Session locks (per-session serialization) ────────────────────
    let locks = Arc::new(SessionLockMap::new());

    let state = AppState {
        config: config.clone(),
        hours: OpeningHours::from_config(&config.restaurant),
        llm,
        sessions: sessions.clone(),
        tools,
        locks: locks.clone(),
    };

    // ── Periodic expired-session cleanup ─────────────────────────────
    {
        let sessions = sessions.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(600));
            loop {
                interval.tick().await;
                match sessions.cleanup_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!(removed = n, "expired sessions cleaned up"),
                    Err(e) => tracing::warn!(error = %e, "session cleanup failed"),
                }
            }
        });
    }

    // ── Periodic menu cache reindex + lock pruning ───────────────────
    {
        let catalog = catalog.clone();
        let menu = menu.clone();
        let locks = locks.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(3600));
            // The first tick fires immediately; the warm-up above
            // already covered it.
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = catalog.warm(&menu).await {
                    tracing::warn!(error = %e, "menu reindex failed");
                }
                locks.prune_idle();
            }
        });
    }

    // ── Router ───────────────────────────────────────────────────────
    let max_concurrent = std::env::var("SUFRA_MAX_CONCURRENT_REQUESTS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(256);

    let app = api::router()
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_concurrent))
        .with_state(state);

    // ── Bind ─────────────────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;

    tracing::info!(addr = %addr, "sufra listening");

    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}
