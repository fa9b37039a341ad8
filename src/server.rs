use axum::{
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any as AnyOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::database::{DataStore, DatabaseManager};
use crate::error::ApiError;
use crate::handlers::{protected, public};
use crate::lifecycle::shutdown_signal;
use crate::middleware::{
    auth_middleware, content_type_middleware, deadline_middleware, signature_middleware, tracker_middleware,
};
use crate::state::AppState;

/// Full router. Layers, outermost first: CORS, trace, panic boundary,
/// in-flight tracking, deadline, request signature.
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        .nest("/api/v1", api_routes(state.clone()))
        .fallback(not_found)
        .layer(from_fn_with_state(state.clone(), signature_middleware))
        .layer(from_fn_with_state(state.clone(), deadline_middleware))
        .layer(from_fn_with_state(state.clone(), tracker_middleware))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors(&state.config))
        .with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(protected_routes(state))
        .layer(from_fn(content_type_middleware))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(public::register_post))
        .route("/auth/login", post(public::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(protected::me_get))
        .route("/users", get(protected::users_list))
        .route(
            "/users/:id",
            get(protected::user_get)
                .put(protected::user_put)
                .delete(protected::user_delete),
        )
        .route("/users/:id/purge", delete(protected::user_purge))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

fn cors(config: &AppConfig) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ORIGIN,
            HeaderName::from_static("timestamp"),
            HeaderName::from_static("hash"),
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::LINK, header::CONTENT_LENGTH])
        .max_age(Duration::from_secs(config.security.cors_max_age_secs))
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::internal_server_error("Internal Server Error").to_json()),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Connects, serves until a termination signal, drains in-flight requests, closes the pool
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    config.validate()?;
    tracing::info!("Starting starter-kit in {:?} mode", config.environment);

    let pool = DatabaseManager::connect(&config.database).await?;
    let store = DataStore::postgres(pool.clone(), &config.database);
    let port = config.server.port;
    let drain_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);

    let state = AppState::new(config, store, Arc::new(SystemClock));
    let jobs = state.jobs.clone();

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on http://{}", bind_addr);

    let shutdown_jobs = jobs.clone();
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_jobs.begin_shutdown();
        })
        .await?;

    if jobs.wait_idle(drain_timeout).await {
        tracing::info!("all in-flight requests finished");
    } else {
        tracing::warn!(running = jobs.running(), "shutdown timeout reached with requests still running");
    }

    DatabaseManager::close(&pool).await;
    Ok(())
}
