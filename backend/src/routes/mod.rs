//! Route definitions for the TradeFlow marketplace

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public, plus /me)
        .nest("/auth", auth_routes(state.clone()))
        // Operator routes (x-admin-key)
        .nest("/admin", admin_routes())
        // Protected routes - profiles and discovery
        .merge(user_routes(state.clone()))
        // Protected routes - requirements
        .nest("/bids", bid_routes(state.clone()))
        // Protected routes - negotiation
        .nest("/proposals", proposal_routes(state.clone()))
        // Protected routes - order tracking
        .nest("/orders", order_routes(state.clone()))
        // Protected routes - reviews
        .nest("/reviews", review_routes(state.clone()))
        // Protected routes - alerts
        .nest("/alerts", alert_routes(state.clone()))
        // Protected routes - stock and diary
        .nest("/stock", stock_routes(state.clone()))
        .nest("/diary", diary_routes(state.clone()))
        // Protected routes - dashboard
        .route(
            "/dashboard",
            get(handlers::get_dashboard)
                .route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
}

/// Authentication routes
fn auth_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(handlers::me).route_layer(middleware::from_fn_with_state(state, auth_middleware)),
        )
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
        .route("/logout", post(handlers::logout))
        .route("/otp/request", post(handlers::request_otp))
        .route("/otp/verify", post(handlers::verify_otp))
}

/// Operator routes, guarded by the admin key instead of a JWT
fn admin_routes() -> Router<AppState> {
    Router::new().route(
        "/users/:user_id/compliance",
        post(handlers::decide_compliance),
    )
}

/// Profile and discovery routes (protected)
fn user_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users/me", get(handlers::me).put(handlers::update_profile))
        .route("/users/me/compliance", post(handlers::submit_compliance))
        .route("/users/:user_id", get(handlers::get_profile))
        .route("/users/:user_id/reviews", get(handlers::list_user_reviews))
        .route("/suppliers", get(handlers::discover_suppliers))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Requirement routes (protected)
fn bid_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_bids).post(handlers::create_bid))
        .route(
            "/:bid_id",
            get(handlers::get_bid).delete(handlers::delete_bid),
        )
        .route("/:bid_id/close", post(handlers::close_bid))
        .route(
            "/:bid_id/proposals",
            get(handlers::list_bid_proposals).post(handlers::submit_proposal),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Proposal routes (protected)
fn proposal_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/mine", get(handlers::list_my_proposals))
        .route("/:proposal_id", get(handlers::get_proposal))
        .route("/:proposal_id/counter", post(handlers::counter_proposal))
        .route("/:proposal_id/accept", post(handlers::accept_proposal))
        .route("/:proposal_id/reject", post(handlers::reject_proposal))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Order routes (protected)
fn order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders))
        .route("/export", get(handlers::export_orders))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/ship", post(handlers::ship_order))
        .route("/:order_id/receive", post(handlers::receive_order))
        .route("/:order_id/images", post(handlers::attach_order_images))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Review routes (protected)
fn review_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_review))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Alert routes (protected)
fn alert_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_alerts))
        .route("/generate", post(handlers::generate_alert))
        .route("/read-all", post(handlers::mark_all_alerts_read))
        .route("/:alert_id/read", post(handlers::mark_alert_read))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Stock routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_stock).post(handlers::create_stock_item))
        .route(
            "/:item_id",
            get(handlers::get_stock_item)
                .put(handlers::update_stock_item)
                .delete(handlers::delete_stock_item),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Diary routes (protected)
fn diary_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_diary_entries).post(handlers::create_diary_entry),
        )
        .route(
            "/:entry_id",
            get(handlers::get_diary_entry)
                .put(handlers::update_diary_entry)
                .delete(handlers::delete_diary_entry),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
