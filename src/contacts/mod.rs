//! Contact and session registry: end users identified by phone within an
//! account, and the engagement sessions that drive funnel progression.

use axum::{
    extract::State,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::shared::error::ApiError;
use crate::shared::models::{
    Account, ApiResponse, Contact, NewContact, NewUserSession, UserSession,
};
use crate::shared::schema::{accounts, contacts, funnel_steps, user_sessions};
use crate::shared::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(alias = "accountId")]
    pub account_id: Option<i64>,
    #[serde(alias = "productId")]
    pub product_id: Option<i64>,
    #[serde(alias = "messageTime")]
    pub message_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CreateContactRequest {
    pub name: Option<String>,
    pub account_id: Option<i64>,
    pub phone: Option<String>,
    pub contact_data: Option<serde_json::Value>,
    pub campaign_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ExternalCodeUpdateRequest {
    #[serde(alias = "externalCode")]
    pub external_code: Option<Uuid>,
    pub status: Option<String>,
    #[serde(alias = "finalLink")]
    pub final_link: Option<String>,
}

/// Contact joined with its account and most recent session, returned to
/// external-partner callbacks.
#[derive(Debug, Serialize)]
pub struct ContactEngagementView {
    pub contact: Contact,
    pub account: Account,
    pub last_session: Option<UserSession>,
}

/// Returns the designated first step of the account's funnel, if the account
/// has a funnel and the funnel has a first-flagged step.
fn initial_step_for_account(
    conn: &mut PgConnection,
    account: &Account,
) -> Result<Option<i64>, ApiError> {
    let Some(funnel_id) = account.funnel_id else {
        return Ok(None);
    };

    let step_id: Option<i64> = funnel_steps::table
        .filter(funnel_steps::funnel_id.eq(funnel_id))
        .filter(funnel_steps::is_first.eq(true))
        .select(funnel_steps::id)
        .first(conn)
        .optional()?;

    Ok(step_id)
}

/// Find-or-create for `(account_id, phone)`. The insert races through the
/// unique constraint: a concurrent winner turns our insert into a no-op and
/// we fetch the existing row instead. Returns `(session, created)`.
pub fn create_or_get_session(
    conn: &mut PgConnection,
    name: &str,
    phone: &str,
    account_id: i64,
    product_id: i64,
) -> Result<(UserSession, bool), ApiError> {
    let existing: Option<UserSession> = user_sessions::table
        .filter(user_sessions::account_id.eq(account_id))
        .filter(user_sessions::phone.eq(phone))
        .select(UserSession::as_select())
        .first(conn)
        .optional()?;
    if let Some(session) = existing {
        return Ok((session, false));
    }

    let account: Account = accounts::table
        .find(account_id)
        .select(Account::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("no account with id {}", account_id)))?;

    let funnel_step_id = initial_step_for_account(conn, &account)?;

    let new_session = NewUserSession {
        account_id,
        product_id,
        phone: phone.to_string(),
        name: name.to_string(),
        funnel_step_id,
    };

    let inserted: Option<UserSession> = diesel::insert_into(user_sessions::table)
        .values(&new_session)
        .on_conflict((user_sessions::account_id, user_sessions::phone))
        .do_nothing()
        .get_result(conn)
        .optional()?;

    match inserted {
        Some(session) => {
            info!(
                "created session {} for account {} phone {}",
                session.id, account_id, phone
            );
            Ok((session, true))
        }
        None => {
            let winner: UserSession = user_sessions::table
                .filter(user_sessions::account_id.eq(account_id))
                .filter(user_sessions::phone.eq(phone))
                .select(UserSession::as_select())
                .first(conn)?;
            Ok((winner, false))
        }
    }
}

/// Merges `finalLink` into the contact's JSON blob, preserving every other
/// key. A non-object blob is replaced by a fresh object.
pub fn merge_final_link(contact_data: &serde_json::Value, final_link: &str) -> serde_json::Value {
    let mut merged = match contact_data {
        serde_json::Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    merged.insert(
        "finalLink".to_string(),
        serde_json::Value::String(final_link.to_string()),
    );
    serde_json::Value::Object(merged)
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserSession>>), ApiError> {
    let name = req
        .name
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("name is required".to_string()))?;
    let phone = req
        .phone
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("phone is required".to_string()))?;
    let account_id = req
        .account_id
        .ok_or_else(|| ApiError::Validation("account_id is required".to_string()))?;
    let product_id = req
        .product_id
        .ok_or_else(|| ApiError::Validation("product_id is required".to_string()))?;

    let mut conn = state.db()?;
    let (session, created) = create_or_get_session(&mut conn, name, phone, account_id, product_id)?;

    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::success(session))))
}

pub async fn create_contact(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Contact>>), ApiError> {
    let name = req
        .name
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("name is required".to_string()))?;
    let account_id = req
        .account_id
        .ok_or_else(|| ApiError::Validation("account_id is required".to_string()))?;

    let mut conn = state.db()?;

    let new_contact = NewContact {
        account_id,
        name,
        phone: req.phone,
        contact_data: req.contact_data.unwrap_or_else(|| serde_json::json!({})),
        external_code: None,
        external_status: None,
        campaign_id: req.campaign_id,
    };

    let contact: Contact = diesel::insert_into(contacts::table)
        .values(&new_contact)
        .get_result(&mut conn)?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(contact))))
}

/// Callback target for the external partial-registration API: correlates by
/// `external_code`, merges the final link into `contact_data` and optionally
/// overwrites the external status. Unknown codes are a 404 with no writes.
pub async fn update_contact_by_external_code(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExternalCodeUpdateRequest>,
) -> Result<Json<ApiResponse<ContactEngagementView>>, ApiError> {
    let external_code = req
        .external_code
        .ok_or_else(|| ApiError::Validation("external_code is required".to_string()))?;

    let mut conn = state.db()?;

    let contact: Contact = contacts::table
        .filter(contacts::external_code.eq(external_code))
        .select(Contact::as_select())
        .first(&mut conn)
        .optional()?
        .ok_or_else(|| {
            ApiError::NotFound(format!("no contact with external code {}", external_code))
        })?;

    let contact_data = match &req.final_link {
        Some(link) => merge_final_link(&contact.contact_data, link),
        None => contact.contact_data.clone(),
    };

    let external_status = req.status.clone().or_else(|| contact.external_status.clone());
    let contact: Contact = diesel::update(contacts::table.find(contact.id))
        .set((
            contacts::contact_data.eq(&contact_data),
            contacts::external_status.eq(external_status),
            contacts::updated_at.eq(chrono::Utc::now()),
        ))
        .get_result(&mut conn)?;

    let account: Account = accounts::table
        .find(contact.account_id)
        .select(Account::as_select())
        .first(&mut conn)?;

    let last_session: Option<UserSession> = match &contact.phone {
        Some(phone) => user_sessions::table
            .filter(user_sessions::account_id.eq(contact.account_id))
            .filter(user_sessions::phone.eq(phone))
            .order(user_sessions::created_at.desc())
            .select(UserSession::as_select())
            .first(&mut conn)
            .optional()?,
        None => None,
    };

    Ok(Json(ApiResponse::success(ContactEngagementView {
        contact,
        account,
        last_session,
    })))
}

pub fn configure_contacts_api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/sessions", post(create_session))
        .route("/api/contacts", post(create_contact))
        .route(
            "/api/contacts/external-code",
            post(update_contact_by_external_code),
        )
}
