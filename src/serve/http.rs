//! HTTP front end for published artifacts.
//!
//! # Responsibilities
//! - Serve GeoJSON artifacts under the configured path prefix
//! - Gate every request through the per-client rate limiter
//! - Reflect the configured CORS origin
//! - Optionally resolve a missing artifact on demand
//! - Graceful shutdown on ctrl-c

use std::net::SocketAddr;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::cors::{self, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{AppConfig, ServerConfig};
use crate::error::{AppError, AppResult};
use crate::osm::client::OsmClient;
use crate::osm::resolver::{ResolveError, Resolver};
use crate::output::paths::{parse_artifact, ResolutionRequest};
use crate::output::store::{OutputStore, StoreError};
use crate::pipeline::ensure_artifact;
use crate::serve::rate_limit::RateLimiter;

const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<OutputStore>,
    pub limiter: Arc<RateLimiter>,
    /// Present only when resolve-on-miss is enabled.
    pub resolver: Option<Arc<Resolver<OsmClient>>>,
    pub out_dir: PathBuf,
    pub config: Arc<ServerConfig>,
}

/// HTTP server publishing the output directory.
pub struct GeoServer {
    router: Router,
    config: ServerConfig,
    limiter: Arc<RateLimiter>,
}

impl GeoServer {
    /// Create a new server from the application configuration.
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let limiter = Arc::new(RateLimiter::new(
            config.server.rate,
            config.server.burst,
            Duration::from_secs(config.server.rate_ttl_secs),
        ));

        let resolver = if config.server.resolve_on_miss {
            let client = OsmClient::new(&config.upstream)?;
            Some(Arc::new(Resolver::new(client, &config.resolve)))
        } else {
            None
        };

        let state = AppState {
            store: Arc::new(OutputStore::new()),
            limiter: limiter.clone(),
            resolver,
            out_dir: PathBuf::from(&config.resolve.out_dir),
            config: Arc::new(config.server.clone()),
        };

        let router = Self::build_router(&config.server, state)?;
        Ok(Self {
            router,
            config: config.server.clone(),
            limiter,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> AppResult<Router> {
        let cors = if config.origin == "*" {
            CorsLayer::new().allow_origin(cors::Any)
        } else {
            let origin = config
                .origin
                .parse::<HeaderValue>()
                .map_err(|_| AppError::InvalidInput(format!("invalid origin {:?}", config.origin)))?;
            CorsLayer::new().allow_origin(origin)
        };

        let prefix = config.prefix.trim_end_matches('/');
        Ok(Router::new()
            .route(&format!("{prefix}/{{artifact}}"), get(serve_artifact))
            .with_state(state.clone())
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(middleware::from_fn_with_state(state, rate_limit_middleware)))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.prefix,
            origin = %self.config.origin,
            "HTTP server starting"
        );

        // Periodic eviction of idle client buckets.
        let limiter = self.limiter.clone();
        let sweep_every = Duration::from_secs(self.config.sweep_interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_every);
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Admission gate in front of every route.
async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let client = addr.ip().to_string();
    if state.limiter.allow(&client) {
        next.run(request).await
    } else {
        // Expected under load; not an error.
        tracing::warn!(client = %client, "rate limit exceeded");
        let mut response = Response::new(Body::from("rate limit exceeded"));
        *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
        response
    }
}

/// Serve one artifact, resolving it first when configured to.
async fn serve_artifact(
    Path(artifact): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let Some((root, raw, separate)) = parse_artifact(&artifact) else {
        return (StatusCode::NOT_FOUND, "no such artifact").into_response();
    };
    let req = ResolutionRequest {
        root,
        raw,
        separate,
        out_dir: state.out_dir.clone(),
    };

    match state.store.lookup(&req).await {
        Ok(Some(path)) => serve_file(&path).await,
        Ok(None) => match &state.resolver {
            Some(resolver) if state.config.resolve_on_miss => {
                resolve_then_serve(resolver, &state.store, &req).await
            }
            _ => (StatusCode::NOT_FOUND, "no such artifact").into_response(),
        },
        Err(StoreError::StorageUnavailable { dir, source }) => {
            tracing::error!(dir = %dir.display(), error = %source, "output directory unavailable");
            (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable").into_response()
        }
        Err(err) => {
            tracing::error!(artifact = %artifact, error = %err, "artifact lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "lookup failed").into_response()
        }
    }
}

async fn resolve_then_serve(
    resolver: &Resolver<OsmClient>,
    store: &OutputStore,
    req: &ResolutionRequest,
) -> Response {
    tracing::info!(relation = %req.root, "resolving artifact on miss");
    match ensure_artifact(resolver, store, req, false).await {
        Ok(path) => serve_file(&path).await,
        Err(AppError::Resolve(ResolveError::Root { id, source })) if !source.is_retryable() => {
            tracing::warn!(relation = %id, error = %source, "root relation unavailable");
            (StatusCode::NOT_FOUND, "no such relation").into_response()
        }
        Err(AppError::Store(StoreError::StorageUnavailable { dir, source })) => {
            tracing::error!(dir = %dir.display(), error = %source, "output directory unavailable");
            (StatusCode::INTERNAL_SERVER_ERROR, "storage unavailable").into_response()
        }
        Err(err) => {
            // Internal fetch details stay out of the response body.
            tracing::error!(relation = %req.root, error = %err, "on-miss resolution failed");
            (StatusCode::BAD_GATEWAY, "resolution failed").into_response()
        }
    }
}

async fn serve_file(path: &FsPath) -> Response {
    match tokio::fs::read(path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, GEOJSON_CONTENT_TYPE)],
            bytes,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "could not read artifact");
            (StatusCode::INTERNAL_SERVER_ERROR, "artifact unreadable").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
