//! Tenant resolution: maps inbound hostnames and messaging prefixes to the
//! company or account a request belongs to.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::shared::error::ApiError;
use crate::shared::models::{Account, ApiResponse, Company};
use crate::shared::schema::{accounts, companies, instance_parameters};
use crate::shared::state::AppState;

/// Slug every unmatched hostname falls back to. Unknown traffic is
/// attributed to this tenant; the fallback is logged so a misrouted
/// deployment shows up in the logs.
pub const DEFAULT_SLUG: &str = "autonomia";

const PORTAL_PREFIX: &str = "portal.";
const TENANT_SITE_SUFFIX: &str = ".autonomia.site";

/// Strips scheme, path, query, fragment and port from a raw domain input,
/// leaving a bare lowercase hostname.
pub fn normalize_hostname(raw: &str) -> String {
    let mut host = raw.trim();

    if let Some(idx) = host.find("://") {
        host = &host[idx + 3..];
    }

    for sep in ['/', '?', '#'] {
        if let Some(idx) = host.find(sep) {
            host = &host[..idx];
        }
    }

    if let Some(idx) = host.rfind(':') {
        if host[idx + 1..].chars().all(|c| c.is_ascii_digit()) {
            host = &host[..idx];
        }
    }

    host.to_lowercase()
}

/// Derives the tenant slug from a bare hostname. Precedence is fixed and
/// first match wins; anything unmatched falls back to [`DEFAULT_SLUG`].
pub fn slug_from_host(host: &str) -> String {
    if !host.contains('.') {
        // Already a slug, e.g. "autonomia" or "acme".
        if host == "localhost" || host.is_empty() {
            return DEFAULT_SLUG.to_string();
        }
        return host.to_string();
    }

    if host == "127.0.0.1" {
        return DEFAULT_SLUG.to_string();
    }

    if let Some(rest) = host.strip_prefix(PORTAL_PREFIX) {
        // portal.<slug>.<tld>
        let labels: Vec<&str> = rest.split('.').collect();
        if labels.len() >= 2 {
            return labels[0].to_string();
        }
        return DEFAULT_SLUG.to_string();
    }

    if let Some(sub) = host.strip_suffix(TENANT_SITE_SUFFIX) {
        if let Some(label) = sub.split('.').next().filter(|l| !l.is_empty()) {
            return label.to_string();
        }
    }

    warn!("hostname '{}' matched no tenant pattern, using default slug", host);
    DEFAULT_SLUG.to_string()
}

/// Resolves a raw domain input to a single company: exact domain match
/// first, then substring match. More than one substring candidate is a
/// conflict, zero is a not-found that names a few known domains.
pub fn resolve_company_by_domain(
    conn: &mut PgConnection,
    raw: &str,
) -> Result<Company, ApiError> {
    let slug = slug_from_host(&normalize_hostname(raw));

    let exact: Option<Company> = companies::table
        .filter(companies::domain.eq(&slug))
        .select(Company::as_select())
        .first(conn)
        .optional()?;
    if let Some(company) = exact {
        return Ok(company);
    }

    let pattern = format!("%{}%", slug);
    let mut fuzzy: Vec<Company> = companies::table
        .filter(companies::domain.ilike(&pattern))
        .select(Company::as_select())
        .load(conn)?;

    match fuzzy.len() {
        1 => Ok(fuzzy.remove(0)),
        0 => {
            let known: Vec<Option<String>> = companies::table
                .select(companies::domain)
                .filter(companies::domain.is_not_null())
                .limit(5)
                .load(conn)?;
            let known: Vec<String> = known.into_iter().flatten().collect();
            Err(ApiError::NotFound(format!(
                "no company matches domain '{}' (slug '{}'); known domains include {:?}",
                raw, slug, known
            )))
        }
        _ => {
            let candidates = fuzzy.into_iter().filter_map(|c| c.domain).collect();
            Err(ApiError::AmbiguousDomain {
                domain: slug,
                candidates,
            })
        }
    }
}

/// Resolves a messaging/analytics prefix to an account. Numeric input is an
/// account id; anything else is matched against the account-scoped `prefix`
/// parameter after trimming slashes.
pub fn resolve_account_by_prefix(
    conn: &mut PgConnection,
    input: &str,
) -> Result<Account, ApiError> {
    let trimmed = input.trim().trim_matches('/');

    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let id: i64 = trimmed
            .parse()
            .map_err(|_| ApiError::Validation(format!("account id '{}' out of range", trimmed)))?;
        return accounts::table
            .find(id)
            .select(Account::as_select())
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("no account with id {}", id)));
    }

    let scope_ids: Vec<i64> = instance_parameters::table
        .filter(instance_parameters::scope.eq(crate::params::ACCOUNT_SCOPE))
        .filter(instance_parameters::name.eq("prefix"))
        .filter(instance_parameters::value.eq(trimmed))
        .select(instance_parameters::scope_id)
        .load(conn)?;

    let account_id = scope_ids
        .first()
        .copied()
        .ok_or_else(|| ApiError::NotFound(format!("no account with prefix '{}'", trimmed)))?;

    accounts::table
        .find(account_id)
        .select(Account::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("no account with prefix '{}'", trimmed)))
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub domain: String,
}

#[derive(Debug, Serialize)]
pub struct ResolvedCompany {
    pub company_id: i64,
    pub name: String,
    pub domain: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolvedAccount {
    pub account_id: i64,
    pub product_id: i64,
    pub name: String,
}

pub async fn resolve_domain(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResolveQuery>,
) -> Result<Json<ApiResponse<ResolvedCompany>>, ApiError> {
    if query.domain.trim().is_empty() {
        return Err(ApiError::Validation("domain is required".to_string()));
    }

    let mut conn = state.db()?;
    let company = resolve_company_by_domain(&mut conn, &query.domain)?;

    Ok(Json(ApiResponse::success(ResolvedCompany {
        company_id: company.id,
        name: company.name,
        domain: company.domain,
    })))
}

pub async fn resolve_prefix(
    State(state): State<Arc<AppState>>,
    Path(prefix): Path<String>,
) -> Result<Json<ApiResponse<ResolvedAccount>>, ApiError> {
    let mut conn = state.db()?;
    let account = resolve_account_by_prefix(&mut conn, &prefix)?;

    Ok(Json(ApiResponse::success(ResolvedAccount {
        account_id: account.id,
        product_id: account.product_id,
        name: account.name,
    })))
}

pub fn configure_tenancy_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/tenancy/resolve", get(resolve_domain))
        .route("/api/tenancy/prefix/:prefix", get(resolve_prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_scheme_path_port() {
        assert_eq!(
            normalize_hostname("https://portal.acme.com:8443/login?next=/#top"),
            "portal.acme.com"
        );
        assert_eq!(normalize_hostname("acme.com/path"), "acme.com");
        assert_eq!(normalize_hostname("ACME.com"), "acme.com");
        assert_eq!(normalize_hostname("localhost:3000"), "localhost");
    }

    #[test]
    fn test_slug_localhost_variants() {
        assert_eq!(slug_from_host("localhost"), DEFAULT_SLUG);
        assert_eq!(slug_from_host("127.0.0.1"), DEFAULT_SLUG);
    }

    #[test]
    fn test_slug_portal_second_label() {
        assert_eq!(slug_from_host("portal.acme.com"), "acme");
        assert_eq!(slug_from_host("portal.clientco.io"), "clientco");
        // Not enough labels after the portal prefix.
        assert_eq!(slug_from_host("portal.acme"), DEFAULT_SLUG);
    }

    #[test]
    fn test_slug_tenant_site_subdomain() {
        assert_eq!(slug_from_host("foo.autonomia.site"), "foo");
        assert_eq!(slug_from_host("bar.autonomia.site"), "bar");
        assert_eq!(slug_from_host("a.b.autonomia.site"), "a");
    }

    #[test]
    fn test_slug_bare_word_passthrough() {
        assert_eq!(slug_from_host("bar"), "bar");
        assert_eq!(slug_from_host("acme"), "acme");
    }

    #[test]
    fn test_slug_unmatched_falls_back() {
        assert_eq!(slug_from_host("random.example.com"), DEFAULT_SLUG);
        assert_eq!(slug_from_host("autonomia.site"), DEFAULT_SLUG);
    }

    #[test]
    fn test_portal_wins_over_tenant_site() {
        // First match wins: the portal pattern is checked before the
        // tenant-site suffix.
        assert_eq!(slug_from_host("portal.acme.autonomia.site"), "acme");
    }
}
