// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    routing::{get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, feedback, health, message, profile, skill, swap_request},
    state::AppState,
    utils::assets::MAX_PHOTO_BYTES,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, profile, skills, requests, feedback, admin).
/// * Applies global middleware (Trace, CORS).
/// * Injects the shared [`AppState`].
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/verify", get(auth::verify_email))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let profile_routes = Router::new()
        .route("/", get(profile::get_my_profile).post(profile::upsert_profile))
        .route("/all", get(profile::list_public_profiles))
        .route(
            "/photo",
            // Leave headroom over the photo cap for the multipart framing.
            post(profile::upload_photo).layer(DefaultBodyLimit::max(MAX_PHOTO_BYTES + 1024 * 1024)),
        );

    let user_routes = Router::new()
        .route("/", get(profile::list_public_profiles))
        .route("/{id}", get(profile::get_public_profile));

    let skill_routes = Router::new()
        .route("/", get(skill::list_skills))
        .route("/{id}", get(skill::get_skill));

    let request_routes = Router::new()
        .route(
            "/",
            get(swap_request::list_requests).post(swap_request::create_request),
        )
        .route("/{id}", patch(swap_request::update_request_status))
        .route("/{id}/status", patch(swap_request::update_request_status));

    let feedback_routes = Router::new()
        .route("/", post(feedback::create_feedback))
        .route("/{profile_id}", get(feedback::list_feedback));

    // Every admin handler takes the `AdminUser` extractor.
    let admin_routes = Router::new()
        .route("/stats", get(admin::get_stats))
        .route("/reports", get(admin::get_reports))
        .route("/users", get(admin::list_users).patch(admin::moderate_user))
        .route("/logs", get(admin::list_logs))
        .route(
            "/messages",
            get(message::list_messages).post(message::create_message),
        );

    Router::new()
        .route("/health", get(health))
        .route("/platform-messages", get(message::list_platform_messages))
        .nest("/auth", auth_routes)
        .nest("/profile", profile_routes)
        .nest("/users", user_routes)
        .nest("/skills", skill_routes)
        .nest("/request", request_routes)
        .nest("/feedback", feedback_routes)
        .nest("/admin", admin_routes)
        // Global Middleware (the last layer added is the outermost)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
