//! HTTP router assembly.
//!
//! Three route groups share one [`AppState`]:
//! - public: health check and the auth flows
//! - authenticated: wallet, analytics and profile endpoints behind `auth_middleware`
//! - admin: nested inside the authenticated group and additionally behind `require_admin`

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{handlers, middleware, state::AppState};

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route("/api/v1/admin/users/lookup", get(handlers::admin::get_user))
        .route(
            "/api/v1/admin/users/status",
            put(handlers::admin::change_status),
        )
        .route("/api/v1/admin/users/role", put(handlers::admin::change_role))
        .route("/api/v1/admin/stats", get(handlers::admin::stats))
        .route(
            "/api/v1/admin/removal-requests",
            get(handlers::admin::removal_requests),
        )
        // Runs after auth_middleware has inserted AuthContext
        .route_layer(axum_middleware::from_fn(middleware::auth::require_admin));

    // Create authenticated routes (API endpoints)
    let authenticated_routes = Router::new()
        // Wallet routes
        .route("/api/v1/wallet", get(handlers::wallet::get_wallet))
        .route("/api/v1/wallet/balance", get(handlers::wallet::get_balance))
        .route("/api/v1/wallet/deposit", post(handlers::wallet::deposit))
        .route("/api/v1/wallet/withdraw", post(handlers::wallet::withdraw))
        .route("/api/v1/wallet/purchase", post(handlers::wallet::purchase))
        .route("/api/v1/wallet/transfer", post(handlers::wallet::transfer))
        // Analytics routes
        .route(
            "/api/v1/analytics/summary",
            get(handlers::analytics::summary),
        )
        .route(
            "/api/v1/analytics/statement",
            get(handlers::analytics::statement),
        )
        // Profile routes
        .route(
            "/api/v1/users/me",
            get(handlers::users::me).put(handlers::users::update_me),
        )
        .route(
            "/api/v1/users/me/request-password-reset",
            post(handlers::users::request_password_reset),
        )
        .route(
            "/api/v1/users/me/request-account-removal",
            post(handlers::users::request_account_removal),
        )
        .merge(admin_routes)
        // Apply authentication middleware to all routes in this group
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .route(
            "/api/v1/auth/verify-email",
            get(handlers::auth::verify_email_link).post(handlers::auth::verify_email),
        )
        .route(
            "/api/v1/auth/resend-verification",
            post(handlers::auth::resend_verification),
        )
        .route(
            "/api/v1/auth/request-password-reset",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/api/v1/auth/update-user-password",
            post(handlers::auth::update_user_password),
        )
        .route(
            "/api/v1/auth/password-update-confirm",
            get(handlers::auth::password_update_confirm),
        );

    let cors = cors_layer(&state.config.cors_origins());

    public_routes
        .merge(authenticated_routes)
        .layer(cors)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // Share state with all handlers via State extraction
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
