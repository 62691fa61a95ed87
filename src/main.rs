use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tracing_subscriber::EnvFilter;

use cycleconnect_backend::app;
use cycleconnect_backend::config::Config;
use cycleconnect_backend::insights::{OpenAiText, TextGenerator};
use cycleconnect_backend::notify::{self, Dispatcher, SmsSender, TwilioSms};
use cycleconnect_backend::state::AppState;
use cycleconnect_backend::store::{PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let sms: Arc<dyn SmsSender> = Arc::new(TwilioSms::new(config.twilio.clone()));
    let llm: Arc<dyn TextGenerator> = Arc::new(OpenAiText::new(config.openai.clone()));
    let dispatcher = Arc::new(Dispatcher::new(sms, Arc::clone(&store)));
    let notify_tx = notify::spawn_worker(Arc::clone(&dispatcher), Arc::clone(&store));

    let state = AppState {
        config: Arc::new(config),
        store,
        dispatcher,
        llm,
        notify_tx,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    tracing::info!("server running at {}", addr);

    axum::serve(
        TcpListener::bind(addr).await?,
        app(state).into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let interrupt = async {
        ctrl_c().await.expect("failed to install Ctrl+C handler");
        tracing::info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
        tracing::info!("received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    }
}
