//! Parameter store: the standard-parameter catalog, per-instance overrides,
//! and the best-effort seeding that runs at account creation.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::shared::error::ApiError;
use crate::shared::models::{
    ApiResponse, InstanceParameter, NewInstanceParameter, StandardParameter,
};
use crate::shared::schema::{instance_parameters, standard_parameters};
use crate::shared::state::AppState;

pub const ACCOUNT_SCOPE: &str = "account";
pub const PRODUCT_SCOPE: &str = "product";

/// Parameters with dedicated handling, excluded from the bulk seed.
pub const SEED_EXCLUSIONS: [&str; 3] = ["metadata", "knowledgeBase", "document"];

#[derive(Debug, Clone, Serialize)]
pub struct ParameterView {
    pub name: String,
    pub value: String,
    pub short_description: String,
    pub help_text: String,
    pub default_value: Option<String>,
}

impl From<InstanceParameter> for ParameterView {
    fn from(p: InstanceParameter) -> Self {
        Self {
            name: p.name,
            value: p.value,
            short_description: p.short_description,
            help_text: p.help_text,
            default_value: p.default_value,
        }
    }
}

/// Instance parameters for one scope entity. With `onboarding_only`, rows are
/// outer-joined by name against the catalog so that parameters whose catalog
/// entry is not onboarding-visible are excluded even when they exist on the
/// instance.
pub fn get_parameters(
    conn: &mut PgConnection,
    scope: &str,
    scope_id: i64,
    onboarding_only: bool,
) -> Result<Vec<ParameterView>, ApiError> {
    let rows: Vec<InstanceParameter> = if onboarding_only {
        instance_parameters::table
            .left_join(
                standard_parameters::table
                    .on(standard_parameters::name.eq(instance_parameters::name)),
            )
            .filter(instance_parameters::scope.eq(scope))
            .filter(instance_parameters::scope_id.eq(scope_id))
            .filter(standard_parameters::onboarding_visible.eq(true))
            .select(InstanceParameter::as_select())
            .order(instance_parameters::name.asc())
            .load(conn)?
    } else {
        instance_parameters::table
            .filter(instance_parameters::scope.eq(scope))
            .filter(instance_parameters::scope_id.eq(scope_id))
            .select(InstanceParameter::as_select())
            .order(instance_parameters::name.asc())
            .load(conn)?
    };

    Ok(rows.into_iter().map(ParameterView::from).collect())
}

/// Coerces a supplied JSON value into a non-empty parameter string. Strings
/// are used as-is when non-blank; numbers and booleans are stringified;
/// everything else is treated as absent.
pub fn coerce_supplied_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Computes the seed rows for one scope entity from the catalog and the
/// caller-supplied values: supplied wins when non-empty, else the catalog
/// default, else the empty string. Pure so the coercion rules are testable
/// without a database.
pub fn plan_standard_values(
    catalog: &[StandardParameter],
    supplied: &serde_json::Map<String, serde_json::Value>,
) -> Vec<(StandardParameter, String)> {
    catalog
        .iter()
        .filter(|p| !SEED_EXCLUSIONS.contains(&p.name.as_str()))
        .map(|p| {
            let value = supplied
                .get(&p.name)
                .and_then(coerce_supplied_value)
                .or_else(|| p.default_value.clone())
                .unwrap_or_default();
            (p.clone(), value)
        })
        .collect()
}

/// Derives the `knowledgeBase` parameter value from the onboarding
/// `metadata` input. A JSON-looking string must parse; an object is
/// serialized; anything else yields nothing.
pub fn knowledge_base_from_metadata(metadata: &serde_json::Value) -> Option<String> {
    match metadata {
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.starts_with('{') || trimmed.starts_with('[') {
                match serde_json::from_str::<serde_json::Value>(trimmed) {
                    Ok(_) => Some(trimmed.to_string()),
                    Err(e) => {
                        warn!("knowledgeBase metadata is not valid JSON, skipping: {}", e);
                        None
                    }
                }
            } else {
                warn!("knowledgeBase metadata string is not JSON-shaped, skipping");
                None
            }
        }
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
            serde_json::to_string(metadata).ok()
        }
        _ => None,
    }
}

/// Seeds every standard parameter onto a newly created scope entity. Best
/// effort by contract: failures are logged and returned as warnings, never
/// propagated, so account creation does not abort over metadata.
pub fn seed_standard_parameters(
    conn: &mut PgConnection,
    scope: &str,
    scope_id: i64,
    supplied: &serde_json::Map<String, serde_json::Value>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let catalog: Vec<StandardParameter> = match standard_parameters::table
        .select(StandardParameter::as_select())
        .order(standard_parameters::name.asc())
        .load(conn)
    {
        Ok(rows) => rows,
        Err(e) => {
            warn!("failed to load standard parameter catalog: {}", e);
            warnings.push(format!("parameter seeding skipped: {}", e));
            return warnings;
        }
    };

    let rows: Vec<NewInstanceParameter> = plan_standard_values(&catalog, supplied)
        .into_iter()
        .map(|(p, value)| NewInstanceParameter {
            scope: scope.to_string(),
            scope_id,
            name: p.name,
            value,
            short_description: p.short_description,
            help_text: p.help_text,
            default_value: p.default_value,
        })
        .collect();

    if let Err(e) = diesel::insert_into(instance_parameters::table)
        .values(&rows)
        .on_conflict_do_nothing()
        .execute(conn)
    {
        warn!("failed to seed standard parameters for {} {}: {}", scope, scope_id, e);
        warnings.push(format!("standard parameters not seeded: {}", e));
    }

    warnings
}

/// Inserts one special-cased parameter, best effort.
pub fn seed_special_parameter(
    conn: &mut PgConnection,
    scope: &str,
    scope_id: i64,
    name: &str,
    value: String,
) -> Option<String> {
    let row = NewInstanceParameter {
        scope: scope.to_string(),
        scope_id,
        name: name.to_string(),
        value,
        short_description: String::new(),
        help_text: String::new(),
        default_value: None,
    };

    match diesel::insert_into(instance_parameters::table)
        .values(&row)
        .on_conflict_do_nothing()
        .execute(conn)
    {
        Ok(_) => None,
        Err(e) => {
            warn!("failed to seed parameter '{}' for {} {}: {}", name, scope, scope_id, e);
            Some(format!("parameter '{}' not seeded: {}", name, e))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParametersQuery {
    #[serde(default)]
    pub onboarding_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpsertParameterRequest {
    pub value: String,
}

pub async fn list_account_parameters(
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<i64>,
    Query(query): Query<ListParametersQuery>,
) -> Result<Json<ApiResponse<Vec<ParameterView>>>, ApiError> {
    let mut conn = state.db()?;
    let params = get_parameters(&mut conn, ACCOUNT_SCOPE, account_id, query.onboarding_only)?;
    Ok(Json(ApiResponse::success(params)))
}

pub async fn upsert_account_parameter(
    State(state): State<Arc<AppState>>,
    Path((account_id, name)): Path<(i64, String)>,
    Json(req): Json<UpsertParameterRequest>,
) -> Result<Json<ApiResponse<ParameterView>>, ApiError> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("parameter name is required".to_string()));
    }

    let mut conn = state.db()?;

    // Carry catalog descriptions onto fresh rows so admin-created parameters
    // read the same as seeded ones.
    let catalog_entry: Option<StandardParameter> = standard_parameters::table
        .filter(standard_parameters::name.eq(&name))
        .select(StandardParameter::as_select())
        .first(&mut conn)
        .optional()?;

    let row = NewInstanceParameter {
        scope: ACCOUNT_SCOPE.to_string(),
        scope_id: account_id,
        name: name.clone(),
        value: req.value.clone(),
        short_description: catalog_entry
            .as_ref()
            .map(|c| c.short_description.clone())
            .unwrap_or_default(),
        help_text: catalog_entry
            .as_ref()
            .map(|c| c.help_text.clone())
            .unwrap_or_default(),
        default_value: catalog_entry.and_then(|c| c.default_value),
    };

    let saved: InstanceParameter = diesel::insert_into(instance_parameters::table)
        .values(&row)
        .on_conflict((
            instance_parameters::scope,
            instance_parameters::scope_id,
            instance_parameters::name,
        ))
        .do_update()
        .set(instance_parameters::value.eq(&req.value))
        .get_result(&mut conn)?;

    Ok(Json(ApiResponse::success(ParameterView::from(saved))))
}

pub fn configure_params_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/accounts/:account_id/parameters",
            get(list_account_parameters),
        )
        .route(
            "/api/accounts/:account_id/parameters/:name",
            put(upsert_account_parameter),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_entry(name: &str, default: Option<&str>, visible: bool) -> StandardParameter {
        StandardParameter {
            id: 0,
            name: name.to_string(),
            default_value: default.map(|s| s.to_string()),
            short_description: String::new(),
            help_text: String::new(),
            onboarding_visible: visible,
        }
    }

    #[test]
    fn test_coerce_string_number_bool() {
        assert_eq!(
            coerce_supplied_value(&serde_json::json!("hello")),
            Some("hello".to_string())
        );
        assert_eq!(
            coerce_supplied_value(&serde_json::json!(42)),
            Some("42".to_string())
        );
        assert_eq!(
            coerce_supplied_value(&serde_json::json!(true)),
            Some("true".to_string())
        );
    }

    #[test]
    fn test_coerce_rejects_blank_and_null() {
        assert_eq!(coerce_supplied_value(&serde_json::json!("")), None);
        assert_eq!(coerce_supplied_value(&serde_json::json!("   ")), None);
        assert_eq!(coerce_supplied_value(&serde_json::Value::Null), None);
    }

    #[test]
    fn test_plan_supplied_wins_over_default() {
        let catalog = vec![catalog_entry("welcomeMessage", Some("X"), true)];
        let mut supplied = serde_json::Map::new();
        supplied.insert("welcomeMessage".to_string(), serde_json::json!("Y"));

        let plan = plan_standard_values(&catalog, &supplied);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].1, "Y");
    }

    #[test]
    fn test_plan_falls_back_to_catalog_default() {
        let catalog = vec![catalog_entry("welcomeMessage", Some("X"), true)];
        let supplied = serde_json::Map::new();

        let plan = plan_standard_values(&catalog, &supplied);
        assert_eq!(plan[0].1, "X");
    }

    #[test]
    fn test_plan_null_default_becomes_empty_string() {
        let catalog = vec![catalog_entry("prefix", None, true)];
        let supplied = serde_json::Map::new();

        let plan = plan_standard_values(&catalog, &supplied);
        assert_eq!(plan[0].1, "");
    }

    #[test]
    fn test_plan_coerces_numeric_supplied_value() {
        let catalog = vec![catalog_entry("businessHours", Some("08:00-18:00"), true)];
        let mut supplied = serde_json::Map::new();
        supplied.insert("businessHours".to_string(), serde_json::json!(24));

        let plan = plan_standard_values(&catalog, &supplied);
        assert_eq!(plan[0].1, "24");
    }

    #[test]
    fn test_plan_excludes_special_parameters() {
        let catalog = vec![
            catalog_entry("document", None, true),
            catalog_entry("knowledgeBase", None, false),
            catalog_entry("metadata", None, false),
            catalog_entry("prefix", None, true),
        ];
        let supplied = serde_json::Map::new();

        let plan = plan_standard_values(&catalog, &supplied);
        let names: Vec<&str> = plan.iter().map(|(p, _)| p.name.as_str()).collect();
        assert_eq!(names, vec!["prefix"]);
    }

    #[test]
    fn test_knowledge_base_from_json_string() {
        let meta = serde_json::json!("{\"faq\": []}");
        assert_eq!(
            knowledge_base_from_metadata(&meta),
            Some("{\"faq\": []}".to_string())
        );
    }

    #[test]
    fn test_knowledge_base_from_invalid_json_string() {
        let meta = serde_json::json!("{not json");
        assert_eq!(knowledge_base_from_metadata(&meta), None);
    }

    #[test]
    fn test_knowledge_base_from_plain_string() {
        let meta = serde_json::json!("just words");
        assert_eq!(knowledge_base_from_metadata(&meta), None);
    }

    #[test]
    fn test_knowledge_base_from_object() {
        let meta = serde_json::json!({"faq": ["q1"]});
        let serialized = knowledge_base_from_metadata(&meta).unwrap();
        let round: serde_json::Value = serde_json::from_str(&serialized).unwrap();
        assert_eq!(round, meta);
    }

    #[test]
    fn test_knowledge_base_from_scalar() {
        assert_eq!(knowledge_base_from_metadata(&serde_json::json!(7)), None);
        assert_eq!(
            knowledge_base_from_metadata(&serde_json::Value::Null),
            None
        );
    }
}
