//! Account onboarding: validation-first creation plus a best-effort saga of
//! association steps whose failures become warnings, never errors.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::params::{
    knowledge_base_from_metadata, seed_special_parameter, seed_standard_parameters, ACCOUNT_SCOPE,
};
use crate::security::claims::claims_from_headers;
use crate::shared::error::ApiError;
use crate::shared::models::{
    Account, AccessProfile, ApiResponse, NewAccount, Product, User, CLIENT_ADMIN_PROFILE,
    SUPER_ADMIN_PROFILE,
};
use crate::shared::schema::{
    access_profiles, accounts, products, user_access_profiles, user_accounts, users,
};
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAccountOnboardingRequest {
    #[serde(alias = "productId")]
    pub product_id: Option<i64>,
    #[serde(alias = "accountName")]
    pub account_name: Option<String>,
    #[serde(alias = "accountEmail")]
    pub account_email: Option<String>,
    #[serde(alias = "accountPhone")]
    pub account_phone: Option<String>,
    #[serde(alias = "userId")]
    pub user_id: Option<i64>,
    pub document: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// Remaining fields are treated as supplied parameter values.
    #[serde(flatten)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct ValidatedOnboarding {
    pub product_id: i64,
    pub account_name: String,
    pub account_email: String,
    pub account_phone: String,
}

#[derive(Debug, Serialize)]
pub struct OnboardingResult {
    pub account: Account,
    pub warnings: Vec<String>,
}

/// Field validation runs before any database write; the first missing field
/// fails the request.
pub fn validate_onboarding(
    req: &CreateAccountOnboardingRequest,
) -> Result<ValidatedOnboarding, ApiError> {
    let product_id = req
        .product_id
        .ok_or_else(|| ApiError::Validation("productId is required".to_string()))?;
    let account_name = req
        .account_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("accountName is required".to_string()))?;
    let account_email = req
        .account_email
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("accountEmail is required".to_string()))?;
    let account_phone = req
        .account_phone
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("accountPhone is required".to_string()))?;

    Ok(ValidatedOnboarding {
        product_id,
        account_name: account_name.to_string(),
        account_email: account_email.to_string(),
        account_phone: account_phone.to_string(),
    })
}

/// Claims win over the client-supplied id so a caller cannot onboard an
/// account onto someone else's user. Claim lookup failure degrades to the
/// supplied id with a warning.
fn resolve_effective_user(
    conn: &mut PgConnection,
    claims_subject: Option<&str>,
    supplied: Option<i64>,
    warnings: &mut Vec<String>,
) -> Option<i64> {
    if let Some(subject) = claims_subject {
        match users::table
            .filter(users::subject.eq(subject))
            .select(User::as_select())
            .first(conn)
            .optional()
        {
            Ok(Some(user)) => return Some(user.id),
            Ok(None) => {
                warn!("claims subject '{}' has no local user row", subject);
                warnings.push("authenticated user not found, using supplied user id".to_string());
            }
            Err(e) => {
                warn!("user lookup by claims failed: {}", e);
                warnings.push(format!("claims lookup failed: {}", e));
            }
        }
    }
    supplied
}

fn user_holds_profile(
    conn: &mut PgConnection,
    user_id: i64,
    profile_name: &str,
) -> Result<bool, diesel::result::Error> {
    let count: i64 = user_access_profiles::table
        .inner_join(access_profiles::table)
        .filter(user_access_profiles::user_id.eq(user_id))
        .filter(access_profiles::name.eq(profile_name))
        .count()
        .get_result(conn)?;
    Ok(count > 0)
}

fn ensure_client_admin_profile(
    conn: &mut PgConnection,
    user_id: i64,
) -> Result<(), diesel::result::Error> {
    let profile: AccessProfile = access_profiles::table
        .filter(access_profiles::name.eq(CLIENT_ADMIN_PROFILE))
        .select(AccessProfile::as_select())
        .first(conn)?;

    diesel::insert_into(user_access_profiles::table)
        .values((
            user_access_profiles::user_id.eq(user_id),
            user_access_profiles::access_profile_id.eq(profile.id),
        ))
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

fn link_user_to_account(
    conn: &mut PgConnection,
    user_id: i64,
    account_id: i64,
) -> Result<(), diesel::result::Error> {
    diesel::insert_into(user_accounts::table)
        .values((
            user_accounts::user_id.eq(user_id),
            user_accounts::account_id.eq(account_id),
        ))
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

fn clear_first_login(conn: &mut PgConnection, user_id: i64) -> Result<(), diesel::result::Error> {
    diesel::update(
        users::table
            .filter(users::id.eq(user_id))
            .filter(users::first_login.eq(true)),
    )
    .set(users::first_login.eq(false))
    .execute(conn)?;
    Ok(())
}

/// Post-creation saga. Every step is independently best-effort: a failure is
/// logged and pushed onto the warnings list, and the remaining steps still
/// run. A super-admin user skips the association steps entirely.
pub fn on_account_created(
    conn: &mut PgConnection,
    account: &Account,
    claims_subject: Option<&str>,
    supplied_user_id: Option<i64>,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let Some(user_id) =
        resolve_effective_user(conn, claims_subject, supplied_user_id, &mut warnings)
    else {
        warnings.push("no user to associate with the new account".to_string());
        return warnings;
    };

    match user_holds_profile(conn, user_id, SUPER_ADMIN_PROFILE) {
        Ok(true) => {
            info!(
                "user {} holds the super admin profile, skipping account scoping",
                user_id
            );
            return warnings;
        }
        Ok(false) => {}
        Err(e) => {
            warn!("super admin check failed for user {}: {}", user_id, e);
            warnings.push(format!("super admin check failed: {}", e));
            // Fall through: scoping a global user is worse than double
            // checking later, but skipping association entirely would leave
            // the account orphaned.
        }
    }

    if let Err(e) = ensure_client_admin_profile(conn, user_id) {
        warn!("client admin profile assignment failed for user {}: {}", user_id, e);
        warnings.push(format!("client admin profile not assigned: {}", e));
    }

    if let Err(e) = link_user_to_account(conn, user_id, account.id) {
        warn!("account link failed for user {}: {}", user_id, e);
        warnings.push(format!("user not linked to account: {}", e));
    }

    if let Err(e) = clear_first_login(conn, user_id) {
        warn!("first-login clear failed for user {}: {}", user_id, e);
        warnings.push(format!("first login flag not cleared: {}", e));
    }

    warnings
}

pub async fn create_account_onboarding(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAccountOnboardingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<OnboardingResult>>), ApiError> {
    let validated = validate_onboarding(&req)?;

    let mut conn = state.db()?;

    let product: Product = products::table
        .find(validated.product_id)
        .select(Product::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no product with id {}", validated.product_id))
        })?;

    let new_account = NewAccount {
        product_id: product.id,
        name: validated.account_name.clone(),
        email: validated.account_email.clone(),
        phone: validated.account_phone.clone(),
        domain: None,
        document: req.document.clone().filter(|d| !d.trim().is_empty()),
        funnel_id: product.default_funnel_id,
    };

    let account: Account = diesel::insert_into(accounts::table)
        .values(&new_account)
        .get_result(&mut conn)?;

    info!("created account {} for product {}", account.id, product.id);

    let claims = claims_from_headers(&headers, &state.config.auth.jwt_secret);
    if claims.is_none() && req.user_id.is_some() {
        warn!("onboarding request without verifiable claims, trusting supplied user id");
    }

    let mut warnings = on_account_created(
        &mut conn,
        &account,
        claims.as_ref().map(|c| c.sub.as_str()),
        req.user_id,
    );

    warnings.extend(seed_standard_parameters(
        &mut conn,
        ACCOUNT_SCOPE,
        account.id,
        &req.parameters,
    ));

    if let Some(document) = req.document.as_deref().filter(|d| !d.trim().is_empty()) {
        if let Some(w) = seed_special_parameter(
            &mut conn,
            ACCOUNT_SCOPE,
            account.id,
            "document",
            document.trim().to_string(),
        ) {
            warnings.push(w);
        }
    }

    if let Some(metadata) = &req.metadata {
        if let Some(kb) = knowledge_base_from_metadata(metadata) {
            if let Some(w) =
                seed_special_parameter(&mut conn, ACCOUNT_SCOPE, account.id, "knowledgeBase", kb)
            {
                warnings.push(w);
            }
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(OnboardingResult { account, warnings })),
    ))
}

pub fn configure_onboarding_api_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/onboarding/accounts", post(create_account_onboarding))
}
