//! HTTP router construction.
//!
//! Assembles all Axum routes, middleware, and OpenAPI docs into a single `Router`.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::api;
use crate::state::AppState;

fn cors_layer(origin: &str) -> CorsLayer {
    if origin.trim() == "*" {
        return CorsLayer::permissive();
    }
    match origin.parse::<HeaderValue>() {
        Ok(value) => CorsLayer::new()
            .allow_origin(value)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!("invalid CORS_ORIGIN '{}'; allowing any origin", origin);
            CorsLayer::permissive()
        }
    }
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/health", get(api::health))
        .route("/config", get(api::config))
        // Taxonomy
        .route("/categories", get(api::list_categories).post(api::create_category))
        .route("/categories/exists", get(api::category_exists))
        .route("/categories/{id}", delete(api::delete_category))
        .route(
            "/categories/{id}/subcategories",
            get(api::list_subcategories).post(api::create_subcategory),
        )
        .route("/subcategories/{id}", delete(api::delete_subcategory))
        .route(
            "/subcategories/{id}/nodes",
            get(api::list_nodes).post(api::create_node),
        )
        .route(
            "/nodes/{id}",
            get(api::get_node)
                .put(api::update_node)
                .delete(api::delete_node),
        )
        .route(
            "/nodes/{id}/values",
            get(api::mapped_values)
                .post(api::add_mappings)
                .delete(api::remove_mappings),
        )
        .route("/nodes/{id}/available-values", get(api::available_values))
        .route("/values", get(api::list_values).post(api::create_value))
        .route(
            "/values/{id}",
            get(api::get_value)
                .put(api::update_value)
                .delete(api::delete_value),
        )
        // Preferences
        .route("/users/{user}/sources", get(api::list_sources))
        .route(
            "/users/{user}/sources/{source}/preferences",
            get(api::list_preferences).delete(api::clear_source),
        )
        .route(
            "/users/{user}/sources/{source}/preferences/{node_id}",
            put(api::save_preference).delete(api::clear_preference),
        )
        .route("/users/{user}/sources/{source}/rename", post(api::rename_source))
        .route("/users/{user}/sources/{source}/duplicate", post(api::duplicate_source))
        // Warnings
        .route("/rules", get(api::list_rules).post(api::create_rule))
        .route(
            "/rules/{id}",
            get(api::get_rule)
                .put(api::update_rule)
                .delete(api::delete_rule),
        )
        .route("/rules/{id}/toggle", post(api::toggle_rule))
        .route("/rules/{id}/conditions", post(api::add_condition))
        .route("/conditions/{id}", delete(api::delete_condition))
        .route("/evaluate", post(api::evaluate))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
        .merge(Scalar::with_url("/docs", api::doc::ApiDoc::openapi()))
}
