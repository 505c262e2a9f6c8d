pub mod api_router;
pub mod config;
pub mod contacts;
pub mod funnel;
pub mod helpdesk;
pub mod onboarding;
pub mod params;
pub mod security;
pub mod shared;
pub mod tenancy;
