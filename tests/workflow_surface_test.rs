//! End-to-end checks over the crate's public surface that need no running
//! infrastructure. Database-bound behavior (find-or-create races, delivery
//! idempotency) is enforced by unique constraints and exercised through the
//! unit suites; these tests pin the documented resolution and envelope
//! contracts.

use funnelserver::params::{coerce_supplied_value, knowledge_base_from_metadata, plan_standard_values};
use funnelserver::shared::models::{ApiResponse, StandardParameter};
use funnelserver::tenancy::{normalize_hostname, slug_from_host, DEFAULT_SLUG};

#[test]
fn documented_hostname_shapes_resolve_to_documented_slugs() {
    let cases = [
        ("localhost", DEFAULT_SLUG),
        ("portal.acme.com", "acme"),
        ("foo.autonomia.site", "foo"),
        ("bar", "bar"),
        ("random.example.com", DEFAULT_SLUG),
    ];

    for (host, expected) in cases {
        assert_eq!(slug_from_host(host), expected, "host {}", host);
    }
}

#[test]
fn raw_urls_resolve_like_bare_hostnames() {
    let raw = "https://portal.clientco.io:443/signup?ref=ads#form";
    assert_eq!(slug_from_host(&normalize_hostname(raw)), "clientco");
}

#[test]
fn seeding_prefers_supplied_values_and_falls_back_to_defaults() {
    let catalog = vec![
        StandardParameter {
            id: 1,
            name: "welcomeMessage".to_string(),
            default_value: Some("X".to_string()),
            short_description: String::new(),
            help_text: String::new(),
            onboarding_visible: true,
        },
        StandardParameter {
            id: 2,
            name: "businessHours".to_string(),
            default_value: Some("08:00-18:00".to_string()),
            short_description: String::new(),
            help_text: String::new(),
            onboarding_visible: true,
        },
    ];

    let mut supplied = serde_json::Map::new();
    supplied.insert("welcomeMessage".to_string(), serde_json::json!("Y"));

    let plan = plan_standard_values(&catalog, &supplied);
    let by_name: std::collections::HashMap<_, _> = plan
        .iter()
        .map(|(p, v)| (p.name.as_str(), v.as_str()))
        .collect();

    assert_eq!(by_name["welcomeMessage"], "Y");
    assert_eq!(by_name["businessHours"], "08:00-18:00");
}

#[test]
fn supplied_values_are_string_coerced() {
    assert_eq!(coerce_supplied_value(&serde_json::json!(7)), Some("7".to_string()));
    assert_eq!(
        coerce_supplied_value(&serde_json::json!(false)),
        Some("false".to_string())
    );
}

#[test]
fn malformed_metadata_degrades_to_omitted_parameter() {
    assert_eq!(knowledge_base_from_metadata(&serde_json::json!("{broken")), None);
    assert!(knowledge_base_from_metadata(&serde_json::json!({"faq": []})).is_some());
}

#[test]
fn envelope_serializes_with_success_flag() {
    let ok = serde_json::to_value(ApiResponse::success(5)).unwrap();
    assert_eq!(ok["success"], true);
    assert_eq!(ok["data"], 5);
    assert!(ok["error"].is_null());

    let err = serde_json::to_value(ApiResponse::<()>::failure("boom")).unwrap();
    assert_eq!(err["success"], false);
    assert_eq!(err["error"], "boom");
}
