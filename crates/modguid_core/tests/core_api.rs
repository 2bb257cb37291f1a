use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use modguid_core::catalog::HostCatalog;
use modguid_core::core_api::{CoreErrorCode, Engine};
use modguid_core::registry::{BehaviorDescriptor, FullAbility, FullStatIcon, RegistryRecord};
use modguid_core::{CoreConfig, GuidAllocator, SaveStore, StoreScope, TypeTag};

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_path(name: &str) -> PathBuf {
    workspace_root().join("tests/fixtures").join(name)
}

fn engine_with_catalog() -> Engine {
    let catalog = HostCatalog::load_from_path(&fixture_path("host_catalog.json"), 1000)
        .expect("failed to load host catalog fixture");
    Engine::new()
        .with_catalog(catalog)
        .expect("catalog fixture should validate")
}

#[test]
fn allocate_is_idempotent_and_leaves_mark_alone() {
    let session = Engine::new().new_session();

    let first = session
        .allocate(TypeTag::Ability, "modA", "Fire")
        .expect("first allocation");
    let mark = session.high_water_mark(TypeTag::Ability);
    let second = session
        .allocate(TypeTag::Ability, "modA", "Fire")
        .expect("second allocation");

    assert_eq!(first, second);
    assert_eq!(session.high_water_mark(TypeTag::Ability), mark);
}

#[test]
fn distinct_keys_get_distinct_ids_above_base_offset() {
    let session = Engine::new().new_session();
    let requests = [
        (TypeTag::Mask, "modB", "Skull"),
        (TypeTag::Ability, "modA", "Fire"),
        (TypeTag::Ability, "modA", "Ice"),
        (TypeTag::Tribe, "modA", "Fire"),
        (TypeTag::Ability, "modB", "Fire"),
        (TypeTag::Language, "modC", "Klingon"),
    ];

    let mut seen = HashSet::new();
    for (tag, owner, name) in requests {
        let id = session.allocate(tag, owner, name).expect("allocation");
        assert!(id >= 1000, "{id} is below the base offset");
        assert!(seen.insert(id), "{id} was issued twice");
    }
}

#[test]
fn high_water_mark_counts_allocations() {
    let session = Engine::new().new_session();
    for n in 0..25 {
        session
            .allocate(TypeTag::Ability, "modA", &format!("Ability{n}"))
            .expect("allocation");
    }
    session
        .allocate(TypeTag::Ability, "modA", "Ability3")
        .expect("repeat allocation");

    assert_eq!(session.high_water_mark(TypeTag::Ability), 1000 + 25);
}

#[test]
fn reverse_lookup_returns_requesting_tag() {
    let session = Engine::new().new_session();
    let ability = session.allocate(TypeTag::Ability, "modA", "Fire").unwrap();
    let mask = session.allocate(TypeTag::Mask, "modA", "Fire").unwrap();
    let challenge = session
        .allocate(TypeTag::AscensionChallenge, "modA", "NoHammer")
        .unwrap();

    assert_eq!(session.reverse_lookup(ability), Some(TypeTag::Ability));
    assert_eq!(session.reverse_lookup(mask), Some(TypeTag::Mask));
    assert_eq!(
        session.reverse_lookup(challenge),
        Some(TypeTag::AscensionChallenge)
    );
    assert_eq!(session.reverse_lookup(1), None);
}

#[test]
fn same_name_from_two_owners_gets_two_ids() {
    let session = Engine::new().new_session();
    let a = session.allocate(TypeTag::Ability, "modA", "Fire").unwrap();
    let b = session.allocate(TypeTag::Ability, "modB", "Fire").unwrap();

    assert_eq!(a, 1000);
    assert_eq!(b, 1001);
}

#[test]
fn removed_record_keeps_its_identifier() {
    let mut session = engine_with_catalog().new_session();
    let fire = session
        .register(FullAbility::new("modA", "Fire", "Fire"))
        .expect("register fire");
    let id = fire.identifier();

    let removed: FullAbility = session.unregister(id).expect("fire should be removed");
    assert_eq!(removed.name, "Fire");
    assert!(session.abilities().get(id).is_none());

    assert_eq!(session.allocate(TypeTag::Ability, "modA", "Fire").unwrap(), id);
    assert!(session.abilities().get(id).is_none());

    let again = session
        .register(FullAbility::new("modA", "Fire", "Fire"))
        .expect("re-register fire");
    assert_eq!(again.identifier(), id);
    assert_eq!(session.abilities().get(id).map(|a| a.name.as_str()), Some("Fire"));
}

#[test]
fn registry_view_keeps_base_order_before_custom() {
    let mut session = engine_with_catalog().new_session();
    session
        .register(FullAbility::new("modA", "Fire", "Fire"))
        .unwrap();
    let ice = session
        .register(FullAbility::new("modA", "Ice", "Ice"))
        .unwrap();
    session
        .register(FullAbility::new("modB", "Wind", "Wind"))
        .unwrap();
    session.unregister::<FullAbility>(ice.identifier());

    let names: Vec<String> = session
        .abilities()
        .all()
        .iter()
        .map(|a| a.display_name().to_string())
        .collect();
    assert_eq!(names, vec!["Flying", "Reach", "Sharp", "Fire", "Wind"]);
}

#[test]
fn all_values_merges_builtin_and_allocated() {
    let session = engine_with_catalog().new_session();
    session.allocate(TypeTag::Ability, "modA", "Fire").unwrap();
    session.allocate(TypeTag::Mask, "modA", "Skull").unwrap();
    session.allocate(TypeTag::Ability, "modB", "Fire").unwrap();

    assert_eq!(session.extra_values(TypeTag::Ability), vec![1000, 1002]);
    assert_eq!(session.all_values(TypeTag::Ability), vec![1, 2, 3, 1000, 1002]);
    assert_eq!(session.all_values(TypeTag::Mask), vec![1, 2, 1001]);
    assert!(session.all_values(TypeTag::Consumable).is_empty());
}

#[test]
fn resolves_numeric_reference_to_behaviour() {
    let mut session = Engine::new().new_session();
    let icon = session
        .register(
            FullStatIcon::new("modA", "Bones", "Bones")
                .with_behavior(BehaviorDescriptor::new("ModA.BonesStat")),
        )
        .unwrap();
    session
        .register(
            FullAbility::new("modA", "Fire", "Fire")
                .with_behavior(BehaviorDescriptor::new("ModA.FireAbility")),
        )
        .unwrap();

    let reference = icon.identifier().to_string();
    assert_eq!(
        session.resolve_type("", &reference),
        Some(BehaviorDescriptor::new("ModA.BonesStat"))
    );
    assert_eq!(
        session.resolve_type("ModA", "FireAbility"),
        Some(BehaviorDescriptor::new("ModA.FireAbility"))
    );
    assert_eq!(session.resolve_type("", "4242"), None);
}

#[test]
fn empty_owner_is_an_invalid_argument() {
    let mut session = Engine::new().new_session();
    let err = session
        .register(FullAbility::new("", "Fire", "Fire"))
        .expect_err("empty owner must fail");
    assert_eq!(err.code, CoreErrorCode::InvalidArgument);
    assert!(session.abilities().is_empty());
    assert_eq!(session.high_water_mark(TypeTag::Ability), 0);
}

#[test]
fn store_values_round_trip_through_session() {
    let session = Engine::new().new_session();
    session.set_value(StoreScope::System, "modA", "timesPlayed", 4);
    session.set_value(StoreScope::System, "modA", "ratio", 0.25f32);
    session.set_value(StoreScope::RunState, "modA", "lives", 2);

    assert_eq!(
        session.get_value(StoreScope::System, "modA", "timesPlayed"),
        Some("4".to_string())
    );
    assert_eq!(session.get_value_as_int(StoreScope::RunState, "modA", "lives"), 2);
    assert_eq!(session.get_value_as_float(StoreScope::System, "modA", "ratio"), 0.25);
    assert!(!session.get_value_as_bool(StoreScope::System, "modA", "timesPlayed"));

    session.start_new_run();
    assert_eq!(session.get_value(StoreScope::RunState, "modA", "lives"), None);
    assert_eq!(session.get_value_as_int(StoreScope::System, "modA", "timesPlayed"), 4);
}

#[test]
fn booleans_set_through_session_use_host_spelling() {
    let session = Engine::new().new_session();
    session.set_value(StoreScope::System, "modA", "hardMode", true);
    session.set_value(StoreScope::RunState, "modA", "cursed", false);

    assert_eq!(
        session.get_value(StoreScope::System, "modA", "hardMode"),
        Some("True".to_string())
    );
    assert_eq!(
        session.get_value(StoreScope::RunState, "modA", "cursed"),
        Some("False".to_string())
    );
    assert!(session.get_value_as_bool(StoreScope::System, "modA", "hardMode"));
}

#[test]
fn saturated_high_water_mark_never_reissues_ids() {
    let session = Engine::new().new_session();
    session.set_value(
        StoreScope::System,
        "cyantist.inscryption.api",
        "maximumStoredValueForEnum",
        i32::MAX,
    );

    let first = session.allocate(TypeTag::Ability, "modA", "Fire");
    let second = session.allocate(TypeTag::Ability, "modA", "Ice");

    assert_eq!(first.map_err(|e| e.code), Err(CoreErrorCode::Parse));
    assert_eq!(second.map_err(|e| e.code), Err(CoreErrorCode::Parse));
    assert_eq!(session.high_water_mark(TypeTag::Ability), i32::MAX);
    assert!(session.extra_values(TypeTag::Ability).is_empty());
}

#[test]
fn owner_and_name_that_share_a_storage_key_get_no_shared_id() {
    let session = Engine::new().new_session();
    let first = session
        .allocate(TypeTag::Ability, "mod_A", "Fire")
        .expect("first split allocates");

    let err = session
        .allocate(TypeTag::Ability, "mod", "A_Fire")
        .expect_err("second split must not reuse the id");
    assert_eq!(err.code, CoreErrorCode::InvalidArgument);
    assert_eq!(session.lookup_allocation(TypeTag::Ability, "mod", "A_Fire"), None);

    let other = session.allocate(TypeTag::Ability, "mod", "Fire").unwrap();
    assert_ne!(first, other);
}

#[test]
fn concurrent_allocations_never_collide() {
    let allocator = Arc::new(GuidAllocator::new(CoreConfig::default(), SaveStore::new()));
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                (0..50)
                    .map(|n| {
                        allocator
                            .allocate(TypeTag::Ability, &format!("mod{worker}"), &format!("A{n}"))
                            .expect("allocation")
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().expect("worker panicked") {
            assert!(ids.insert(id));
        }
    }
    assert_eq!(ids.len(), 400);
    assert_eq!(allocator.high_water_mark(TypeTag::Ability), 1400);
}
