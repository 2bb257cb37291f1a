use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use modguid_core::TypeTag;
use modguid_core::core_api::{CoreErrorCode, Engine};
use modguid_core::manifest::ContentManifest;
use modguid_core::registry::{BehaviorDescriptor, FullAbility, FullChallenge, RegistryRecord};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn load_manifest() -> ContentManifest {
    ContentManifest::load_from_path(&workspace_root().join("tests/fixtures/manifest_modC.json"))
        .expect("failed to load manifest fixture")
}

#[test]
fn manifest_registers_every_record_under_its_owner() {
    let mut session = Engine::new().new_session();
    let report = session
        .register_manifest(&load_manifest())
        .expect("manifest registration");

    assert_eq!(report.owner, "modC");
    let summary: Vec<(TypeTag, &str, i32)> = report
        .entries
        .iter()
        .map(|e| (e.tag, e.name.as_str(), e.id))
        .collect();
    assert_eq!(
        summary,
        vec![
            (TypeTag::Ability, "Thorns", 1000),
            (TypeTag::SpecialStatIcon, "Moons", 1001),
            (TypeTag::AscensionChallenge, "NoHammer", 1002),
            (TypeTag::Language, "Klingon", 1003),
        ]
    );
    assert_eq!(report.new_allocations(), 4);

    let thorns = session.abilities().find_by_name("Thorny Hide").expect("thorns");
    assert_eq!(thorns.owner(), "modC");
    assert_eq!(thorns.ability_id().raw(), 1000);
    assert_eq!(
        session.resolve_type("", "1001"),
        Some(BehaviorDescriptor::new("ModC.MoonPhaseStat"))
    );
    assert_eq!(
        session
            .registry::<FullChallenge>()
            .find_by_logical_name("modC", "NoHammer")
            .map(|c| c.points),
        Some(5)
    );
}

#[test]
fn registering_again_in_a_new_session_recovers_ids() {
    let engine = Engine::new();
    let mut first = engine.new_session();
    first.register_manifest(&load_manifest()).unwrap();
    let bytes = first.to_bytes().unwrap();

    let mut second = engine.open_bytes(&bytes).unwrap();
    let report = second.register_manifest(&load_manifest()).unwrap();

    assert_eq!(report.new_allocations(), 0);
    assert_eq!(second.high_water_mark(TypeTag::Ability), 1004);
    assert_eq!(second.reverse_lookup(1003), Some(TypeTag::Language));
}

#[test]
fn change_listener_sees_registered_records() {
    let mut session = Engine::new().new_session();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    session
        .registry_mut::<FullAbility>()
        .on_change(move |all| {
            let names = all.iter().map(|a| a.name.clone()).collect::<Vec<_>>();
            sink.lock().unwrap().push(names);
        });

    session.register_manifest(&load_manifest()).unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![vec!["Thorns".to_string()]]);
}

#[test]
fn invalid_manifest_registers_nothing() {
    let mut session = Engine::new().new_session();
    let manifest = ContentManifest {
        owner: "modC".to_string(),
        abilities: vec![FullAbility::new("modC", "Thorns", "Thorny Hide")],
        challenges: vec![FullChallenge::new("modC", "", "Unnamed")],
        ..ContentManifest::default()
    };

    let err = session
        .register_manifest(&manifest)
        .expect_err("unnamed challenge must fail");

    assert_eq!(err.code, CoreErrorCode::InvalidArgument);
    assert!(session.abilities().is_empty());
    assert_eq!(session.lookup_allocation(TypeTag::Ability, "modC", "Thorns"), None);
    assert_eq!(session.high_water_mark(TypeTag::Ability), 0);
    assert!(!session.is_dirty());
}
