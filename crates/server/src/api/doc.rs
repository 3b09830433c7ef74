//! OpenAPI documentation aggregator.
//!
//! Collects all `#[utoipa::path]`-annotated handlers and `ToSchema`-derived
//! types into a single OpenAPI document, served via Scalar UI at `/docs`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pillars API",
        version = "0.1.0",
        description = "Pillar taxonomy administration, per-user data-source preferences, and warning rules.",
    ),
    tags(
        (name = "Health", description = "Liveness and redacted configuration"),
        (name = "Taxonomy", description = "Categories, subcategories, pillar nodes and values"),
        (name = "Mappings", description = "Which values are selectable for each pillar node"),
        (name = "Preferences", description = "Per-user, per-data-source node selections"),
        (name = "Warnings", description = "Warning rule CRUD and evaluation"),
    ),
    paths(
        // Health
        crate::api::health,
        crate::api::config,
        // Taxonomy
        crate::api::list_categories,
        crate::api::category_exists,
        crate::api::create_category,
        crate::api::delete_category,
        crate::api::list_subcategories,
        crate::api::create_subcategory,
        crate::api::delete_subcategory,
        crate::api::list_nodes,
        crate::api::create_node,
        crate::api::get_node,
        crate::api::update_node,
        crate::api::delete_node,
        crate::api::list_values,
        crate::api::create_value,
        crate::api::get_value,
        crate::api::update_value,
        crate::api::delete_value,
        // Mappings
        crate::api::mapped_values,
        crate::api::available_values,
        crate::api::add_mappings,
        crate::api::remove_mappings,
        // Preferences
        crate::api::list_sources,
        crate::api::list_preferences,
        crate::api::clear_source,
        crate::api::save_preference,
        crate::api::clear_preference,
        crate::api::rename_source,
        crate::api::duplicate_source,
        // Warnings
        crate::api::list_rules,
        crate::api::create_rule,
        crate::api::get_rule,
        crate::api::update_rule,
        crate::api::delete_rule,
        crate::api::toggle_rule,
        crate::api::add_condition,
        crate::api::delete_condition,
        crate::api::evaluate,
    ),
    components(schemas(
        crate::api::ErrorResponse,
        crate::api::common::Affected,
        crate::api::HealthResponse,
        crate::api::ExistsResponse,
        crate::api::ToggleResponse,
        crate::api::EvaluateRequest,
        crate::api::EvaluateResponse,
        pillars_store::taxonomy::Category,
        pillars_store::taxonomy::Subcategory,
        pillars_store::taxonomy::PillarNode,
        pillars_store::taxonomy::PillarValue,
        pillars_store::taxonomy::ValueSummary,
        pillars_store::taxonomy::MappingChange,
        pillars_store::taxonomy::NameRequest,
        pillars_store::taxonomy::DescribedRequest,
        pillars_store::taxonomy::MappingRequest,
        pillars_store::preferences::PreferenceDetail,
        pillars_store::preferences::SelectionRequest,
        pillars_store::preferences::SourceTarget,
        pillars_store::rules::RuleSummary,
        pillars_rules::schema::Rule,
        pillars_rules::schema::Condition,
        pillars_rules::schema::Severity,
        pillars_rules::schema::RuleHit,
        pillars_rules::validation::RuleDraft,
        pillars_rules::validation::RuleMetaDraft,
        pillars_rules::validation::ConditionDraft,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/categories",
            "/categories/{id}/subcategories",
            "/nodes/{id}/available-values",
            "/users/{user}/sources/{source}/preferences/{node_id}",
            "/rules/{id}/toggle",
            "/conditions/{id}",
            "/evaluate",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
