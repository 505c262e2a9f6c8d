use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use super::schema;

pub use super::schema::{
    access_profiles, accounts, companies, contacts, conversation_funnels, funnel_step_messages,
    funnel_steps, instance_parameters, products, sent_step_messages, standard_parameters,
    user_access_profiles, user_accounts, user_sessions, users,
};

/// Reserved access profile names. `super-admin` holders are global and are
/// never auto-scoped to a single account.
pub const SUPER_ADMIN_PROFILE: &str = "super-admin";
pub const CLIENT_ADMIN_PROFILE: &str = "client-admin";

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = companies)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub document: Option<String>,
    pub domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = products)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub company_id: Option<i64>,
    pub subdomain: Option<String>,
    pub default_funnel_id: Option<i64>,
    pub approved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = accounts)]
pub struct Account {
    pub id: i64,
    pub product_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub domain: Option<String>,
    pub document: Option<String>,
    pub funnel_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = accounts)]
pub struct NewAccount {
    pub product_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub domain: Option<String>,
    pub document: Option<String>,
    pub funnel_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = conversation_funnels)]
pub struct ConversationFunnel {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
    pub auto_assign: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = funnel_steps)]
pub struct FunnelStep {
    pub id: i64,
    pub funnel_id: i64,
    pub name: String,
    pub is_first: bool,
    pub step_order: i32,
    pub assign_to_team: bool,
    pub kanban_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = funnel_step_messages)]
pub struct FunnelStepMessage {
    pub id: i64,
    pub funnel_step_id: i64,
    pub name: String,
    pub content: String,
    pub shipping_time: i32,
    pub shipping_order: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = contacts)]
pub struct Contact {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub contact_data: serde_json::Value,
    pub external_code: Option<Uuid>,
    pub external_status: Option<String>,
    pub campaign_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = contacts)]
pub struct NewContact {
    pub account_id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub contact_data: serde_json::Value,
    pub external_code: Option<Uuid>,
    pub external_status: Option<String>,
    pub campaign_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = user_sessions)]
pub struct UserSession {
    pub id: i64,
    pub account_id: i64,
    pub product_id: i64,
    pub phone: String,
    pub name: String,
    pub funnel_step_id: Option<i64>,
    pub inbox_id: Option<String>,
    pub conversation_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_sessions)]
pub struct NewUserSession {
    pub account_id: i64,
    pub product_id: i64,
    pub phone: String,
    pub name: String,
    pub funnel_step_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = sent_step_messages)]
pub struct SentStepMessage {
    pub id: i64,
    pub user_session_id: i64,
    pub funnel_step_message_id: i64,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = standard_parameters)]
pub struct StandardParameter {
    pub id: i64,
    pub name: String,
    pub default_value: Option<String>,
    pub short_description: String,
    pub help_text: String,
    pub onboarding_visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = instance_parameters)]
pub struct InstanceParameter {
    pub id: i64,
    pub scope: String,
    pub scope_id: i64,
    pub name: String,
    pub value: String,
    pub short_description: String,
    pub help_text: String,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = instance_parameters)]
pub struct NewInstanceParameter {
    pub scope: String,
    pub scope_id: i64,
    pub name: String,
    pub value: String,
    pub short_description: String,
    pub help_text: String,
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: i64,
    pub subject: String,
    pub name: String,
    pub email: String,
    pub first_login: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable, Selectable)]
#[diesel(table_name = access_profiles)]
pub struct AccessProfile {
    pub id: i64,
    pub name: String,
}

/// Uniform JSON envelope returned by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }
}
