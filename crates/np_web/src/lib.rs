use axum::{
    routing::{get, post},
    Router,
};
use np_core::{FoodLog, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod config;
pub mod error;
pub mod handlers;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/poll-updates", get(handlers::poll_updates))
        .route("/set-amount", post(handlers::set_amount))
        .route("/get-amount", get(handlers::get_amount))
        .route("/set-meal-mode", post(handlers::set_meal_mode))
        .route("/get-meal-mode", get(handlers::get_meal_mode))
        .route("/log", post(handlers::log_food))
        .route("/delete-entry", post(handlers::delete_entry))
        .route("/api/entries", get(handlers::list_entries))
        .route("/get-meal-items", get(handlers::get_meal_items))
        .route("/meals/create", post(handlers::create_meal))
        .route("/api/meals", get(handlers::list_meals))
        .route("/log-meal", post(handlers::log_meal))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: ServerConfig, log: Arc<dyn FoodLog>) -> Result<()> {
    let state = AppState::new(&config, log)?;
    let app = create_app(state);

    let address = config.address();
    let listener = TcpListener::bind(&address).await?;
    info!("🥗 Server running on {} (poll timeout {}s)", address, config.poll_timeout.as_secs());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
