//! Settings client behaviour against an in-process settings service.

use dmconf::{MemoryBus, SchemaStore, SettingsClient, SettingsError, Signature, Value};
use std::sync::Arc;

const SCHEMAS: &str = r#"<gdmschemafile>
  <schema><key>/apps/g/enabled</key><signature>b</signature><default>false</default></schema>
  <schema><key>/apps/g/msg</key><signature>s</signature><default>Welcome</default></schema>
  <schema><key>/apps/g/delay</key><signature>i</signature><default>30</default></schema>
  <schema><key>/apps/g/user</key><signature>s</signature><default></default></schema>
</gdmschemafile>"#;

fn setup(bus: &MemoryBus) -> SettingsClient {
    let schemas = SchemaStore::parse_str(SCHEMAS, "/").unwrap();
    SettingsClient::new(Arc::new(schemas), bus.clone()).unwrap()
}

#[test]
fn test_typed_values_match_signature() {
    let bus = MemoryBus::with_values([("/apps/g/delay", "5"), ("/apps/g/enabled", "TRUE")]);
    let client = setup(&bus);

    let keys: Vec<String> = client.schemas().keys().map(str::to_string).collect();
    for key in keys {
        let signature = client.schemas().entry(&key).signature;
        let value = client.get_typed(&key, signature);
        assert_eq!(value.signature(), signature, "{key}");
    }

    assert_eq!(client.get_int("/apps/g/delay"), 5);
    assert!(client.get_boolean("/apps/g/enabled"));
    assert_eq!(client.get_string("/apps/g/msg"), "Welcome");
}

#[test]
fn test_set_then_get_round_trip() {
    let bus = MemoryBus::new();
    let client = setup(&bus);

    client.set_int("/apps/g/delay", -12).unwrap();
    client.set_boolean("/apps/g/enabled", true).unwrap();
    client.set_string("/apps/g/user", "alice").unwrap();
    client
        .set_typed("/apps/g/msg", &Value::from("Bienvenue"))
        .unwrap();

    assert_eq!(client.get_int("/apps/g/delay"), -12);
    assert!(client.get_boolean("/apps/g/enabled"));
    assert_eq!(client.get_string("/apps/g/user"), "alice");
    assert_eq!(
        client.get_typed("/apps/g/msg", Signature::String),
        Value::String("Bienvenue".into())
    );
}

#[test]
fn test_unreachable_bus_falls_back_to_default() {
    let bus = MemoryBus::with_values([("/apps/g/enabled", "true")]);
    let client = setup(&bus);

    bus.set_reachable(false);
    assert!(!client.get_boolean("/apps/g/enabled"));
    assert!(matches!(
        client.get_value("/apps/g/enabled"),
        Err(SettingsError::Bus(_))
    ));

    bus.set_reachable(true);
    assert!(client.get_boolean("/apps/g/enabled"));
}

#[test]
fn test_failed_set_reports_error() {
    let bus = MemoryBus::new();
    let client = setup(&bus);

    bus.set_reachable(false);
    assert!(client.set_int("/apps/g/delay", 1).is_err());
    bus.set_reachable(true);
    assert_eq!(client.get_int("/apps/g/delay"), 30);
}

#[test]
fn test_localized_falls_back_to_plain_key() {
    let bus = MemoryBus::with_values([("/apps/g/msg", "Welcome to the machine")]);
    let client = setup(&bus);

    let msg = client.get_localized_string("/apps/g/msg", Some("fr_FR")).unwrap();
    assert_eq!(msg, "Welcome to the machine");
}

#[test]
fn test_localized_prefers_most_specific_variant() {
    let bus = MemoryBus::with_values([
        ("/apps/g/msg", "Welcome"),
        ("/apps/g/msg[fr]", "Bienvenue"),
        ("/apps/g/msg[fr_CA]", "Bienvenue au Canada"),
    ]);
    let client = setup(&bus);

    assert_eq!(
        client.get_localized_string("/apps/g/msg", Some("fr_FR.UTF-8")).unwrap(),
        "Bienvenue"
    );
    assert_eq!(
        client.get_localized_string("/apps/g/msg", Some("fr_CA")).unwrap(),
        "Bienvenue au Canada"
    );
}

#[test]
fn test_localized_follows_language_order() {
    let bus = MemoryBus::with_values([
        ("/apps/g/msg", "Welcome"),
        ("/apps/g/msg[de]", "Willkommen"),
        ("/apps/g/msg[pt]", "Bem-vindo"),
    ]);
    let client = setup(&bus);
    let languages = |names: &[&str]| names.iter().map(|n| n.to_string()).collect::<Vec<_>>();

    let msg = client
        .get_localized_string_in("/apps/g/msg", &languages(&["pt_BR", "pt", "de", "C"]))
        .unwrap();
    assert_eq!(msg, "Bem-vindo");

    let msg = client
        .get_localized_string_in("/apps/g/msg", &languages(&["nl", "de", "C"]))
        .unwrap();
    assert_eq!(msg, "Willkommen");

    // `C` never becomes a `[C]` lookup
    bus.publish("/apps/g/msg[C]", "wrong");
    let msg = client.get_localized_string_in("/apps/g/msg", &languages(&["C"])).unwrap();
    assert_eq!(msg, "Welcome");
}

#[test]
fn test_localized_without_any_value_fails() {
    let bus = MemoryBus::new();
    let client = setup(&bus);

    assert!(matches!(
        client.get_localized_string("/apps/g/msg", Some("de_DE")),
        Err(SettingsError::Unavailable(_))
    ));
}

#[test]
fn test_changes_update_cached_value() {
    let bus = MemoryBus::new();
    let client = setup(&bus);

    bus.publish("/apps/g/delay", "10");
    assert_eq!(client.schemas().entry("/apps/g/delay").value, "30");

    assert_eq!(client.dispatch_pending(), 1);
    let entry = client.schemas().entry("/apps/g/delay");
    assert_eq!(entry.value, "10");
    assert_eq!(entry.default_value, "30");
}

#[test]
#[should_panic(expected = "not defined in the schema")]
fn test_unknown_key_is_fatal() {
    let bus = MemoryBus::new();
    setup(&bus).get_boolean("/apps/g/missing");
}

#[test]
#[should_panic(expected = "declared as s but used as b")]
fn test_signature_mismatch_is_fatal() {
    let bus = MemoryBus::new();
    setup(&bus).get_boolean("/apps/g/msg");
}
