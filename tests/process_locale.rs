//! Localized lookups driven by the process environment.
//!
//! Kept in its own test binary: it sets locale variables for the whole process.

use dmconf::{MemoryBus, SchemaEntry, SchemaStore, SettingsClient, Signature};
use std::env;
use std::sync::Arc;

#[test]
fn test_localized_uses_process_languages() {
    env::remove_var("LC_ALL");
    env::remove_var("LC_MESSAGES");
    env::set_var("LANGUAGE", "pt_BR:de");
    env::set_var("LANG", "fr_FR.UTF-8");

    let schemas = SchemaStore::from_entries(vec![SchemaEntry::new(
        "/greeter/Welcome",
        Signature::String,
        "Welcome",
    )])
    .unwrap();
    let bus = MemoryBus::with_values([
        ("/greeter/Welcome", "Welcome"),
        ("/greeter/Welcome[de]", "Willkommen"),
        ("/greeter/Welcome[fr]", "Bienvenue"),
    ]);
    let client = SettingsClient::new(Arc::new(schemas), bus.clone()).unwrap();

    // LANGUAGE wins over LANG; pt_BR has no entry, de does
    let msg = client.get_localized_string("/greeter/Welcome", None).unwrap();
    assert_eq!(msg, "Willkommen");

    bus.publish("/greeter/Welcome[pt]", "Bem-vindo");
    let msg = client.get_localized_string("/greeter/Welcome", None).unwrap();
    assert_eq!(msg, "Bem-vindo");

    env::remove_var("LANGUAGE");
    let msg = client.get_localized_string("/greeter/Welcome", None).unwrap();
    assert_eq!(msg, "Bienvenue");

    env::set_var("LANG", "C");
    let msg = client.get_localized_string("/greeter/Welcome", None).unwrap();
    assert_eq!(msg, "Welcome");
}
