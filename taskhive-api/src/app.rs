/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
use crate::config::Config;
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskhive_shared::{auth::service::AuthService, mail::Mailer};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Account lifecycle service
    pub auth: Arc<AuthService>,

    /// Outbound mail transport
    pub mailer: Arc<dyn Mailer>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, auth: AuthService, mailer: Arc<dyn Mailer>, config: Config) -> Self {
        Self {
            db,
            auth: Arc::new(auth),
            mailer,
            config: Arc::new(config),
        }
    }
}

/// Identity of the authenticated caller
///
/// Injected into request extensions by [`jwt_auth_layer`] after the access
/// token is verified.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Username from the token's subject claim
    pub username: String,

    /// Email address bound into the token
    pub email: String,
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// The router is organized as follows:
/// ```text
/// /
/// ├── /health                           # Health check (public)
/// ├── /v1/                              # API v1 (versioned)
/// │   ├── /auth/                        # Account endpoints (public)
/// │   │   ├── POST /sign_up
/// │   │   ├── GET  /activate?token=...
/// │   │   ├── POST /sign_in
/// │   │   ├── POST /refresh
/// │   │   ├── POST /request_password_reset
/// │   │   └── POST /password_reset
/// │   └── /tasks/                       # Task CRUD (JWT required)
/// │       ├── GET    /
/// │       ├── POST   /
/// │       ├── GET    /:id
/// │       ├── PUT    /:id
/// │       ├── PATCH  /:id
/// │       └── DELETE /:id
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Account routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/sign_up", post(routes::auth::sign_up))
        .route("/activate", get(routes::auth::activate))
        .route("/sign_in", post(routes::auth::sign_in))
        .route("/refresh", post(routes::auth::refresh))
        .route(
            "/request_password_reset",
            post(routes::auth::request_password_reset),
        )
        .route("/password_reset", post(routes::auth::password_reset));

    // Task routes (require JWT authentication)
    let task_routes = Router::new()
        .route("/", get(routes::tasks::list_tasks))
        .route("/", post(routes::tasks::create_task))
        .route("/:id", get(routes::tasks::get_task))
        .route("/:id", put(routes::tasks::replace_task))
        .route("/:id", patch(routes::tasks::patch_task))
        .route("/:id", delete(routes::tasks::delete_task))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the bearer access token from the Authorization
/// header, then injects [`AuthContext`] into request extensions. Refresh and
/// activation tokens are rejected here; only access tokens authenticate
/// requests.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| crate::error::ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = state
        .auth
        .verify_access_token(token)
        .map_err(|_| crate::error::ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    let auth_context = AuthContext {
        username: claims.sub,
        email: claims.email,
    };

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
