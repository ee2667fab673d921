//! Agromart backend: a REST API for an agricultural marketplace where
//! farmers, veterinarians, and traders exchange products, request
//! consultations, and execute trades, with a reputation mechanism
//! layered across all of it.
//!
//!
//!
//! # General Infrastructure
//! - Requests arrive through a reverse proxy that owns authentication;
//!   the proxy forwards the verified account id in the `x-user-id`
//!   header and this backend re-resolves it against the store
//! - MongoDB holds all state; handlers are request-scoped and keep
//!   nothing authoritative in memory between requests
//! - Emails go out through a relay endpoint, best-effort: a failed send
//!   is logged, never surfaced to the caller
//!
//!
//!
//! # Surface
//!
//! Everything is mounted under `/api/v1`. Responses are JSON with a
//! `success` flag; errors carry an HTTP status and a message body.
//! Product listing is public, everything else requires a principal, and
//! the `/admin` routes require the admin role.
use std::{sync::Arc, time::Duration};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post, put},
    Router,
};
use signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod notify;
pub mod policy;
pub mod query;
pub mod rating;
pub mod routes;
pub mod state;

use routes::{consultation, product, trade, user};
use state::AppState;

pub async fn start_server() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await;

    info!("Starting server...");

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let app = Router::new()
        .nest("/api/v1", api_router())
        .layer(cors)
        .with_state(state.clone());

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await.unwrap();
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    println!("Server shutting down...");
}

fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // products
        .route("/products", get(product::list_products))
        .route("/product/:id", get(product::get_product))
        .route("/review", put(product::upsert_review))
        .route("/admin/product/new", post(product::new_product))
        .route(
            "/admin/product/:id",
            put(product::update_product).delete(product::delete_product),
        )
        // trades
        .route("/trade/new", post(trade::new_trade))
        .route("/trades/me", get(trade::my_trades))
        .route("/trade/:id", get(trade::get_trade).put(trade::update_trade))
        .route("/trade/rate/:id", post(trade::rate_trade))
        // consultations
        .route("/consultation/new", post(consultation::new_consultation))
        .route("/consultations/me", get(consultation::my_consultations))
        .route(
            "/consultation/:id",
            get(consultation::get_consultation).put(consultation::update_consultation),
        )
        .route("/consultation/rate/:id", post(consultation::rate_consultation))
        // users
        .route("/me", get(user::get_profile))
        .route("/me/update", put(user::update_profile))
        .route("/users/search", get(user::search_users))
        .route("/users/rate/:id", post(user::rate_user))
        .route("/admin/users", get(user::all_users))
        .route("/admin/user/:id", get(user::get_user_details))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
