use std::fmt::Write as _;

use modguid_core::core_api::{Session, SessionSnapshot};
use modguid_core::registry::{Registry, RegistryRecord};
use modguid_core::{AllocationEntry, CounterScope, ModdedSaveData, StoreScope, TypeTag};
use serde_json::{Map as JsonMap, Value as JsonValue};

const PAGE_WIDTH: usize = 76;
const LABEL_COL_WIDTH: usize = 25;
const NAME_COL_WIDTH: usize = 36;
const PAIR_COL_WIDTH: usize = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonStyle {
    #[default]
    CanonicalV1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextStyle {
    #[default]
    Summary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextRenderOptions {
    /// Also list every registry record and every stored key.
    pub verbose: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SectionSelection {
    pub summary: bool,
    pub system: bool,
    pub run_state: bool,
    pub registries: bool,
    pub allocations: bool,
}

impl SectionSelection {
    pub fn is_any_selected(&self) -> bool {
        self.summary || self.system || self.run_state || self.registries || self.allocations
    }
}

pub fn render_json_full(session: &Session, style: JsonStyle) -> JsonValue {
    let all = SectionSelection {
        summary: true,
        system: true,
        run_state: true,
        registries: true,
        allocations: true,
    };
    render_json_selected(session, &all, style)
}

pub fn render_json_selected(
    session: &Session,
    sections: &SectionSelection,
    style: JsonStyle,
) -> JsonValue {
    match style {
        JsonStyle::CanonicalV1 => JsonValue::Object(selected_json(session, sections)),
    }
}

/// Native and allocated identifiers for one tag.
pub fn render_json_values(session: &Session, tag: TypeTag) -> JsonValue {
    let base_offset = session.config().base_offset;
    let (native, custom): (Vec<i32>, Vec<i32>) = session
        .all_values(tag)
        .into_iter()
        .partition(|&id| id < base_offset);

    let mut out = JsonMap::new();
    out.insert("tag".to_string(), JsonValue::String(tag.to_string()));
    out.insert("native".to_string(), JsonValue::from(native));
    out.insert("custom".to_string(), JsonValue::from(custom));
    JsonValue::Object(out)
}

pub fn render_text(session: &Session, style: TextStyle) -> String {
    render_text_with_options(session, style, TextRenderOptions::default())
}

pub fn render_text_with_options(
    session: &Session,
    style: TextStyle,
    options: TextRenderOptions,
) -> String {
    match style {
        TextStyle::Summary => render_summary_impl(session, options),
    }
}

fn selected_json(session: &Session, sections: &SectionSelection) -> JsonMap<String, JsonValue> {
    let snapshot = session.snapshot();
    let mut out = JsonMap::new();

    if sections.summary {
        out.insert(
            "base_offset".to_string(),
            JsonValue::from(snapshot.base_offset),
        );
        out.insert(
            "counter_scope".to_string(),
            JsonValue::String(counter_scope_name(snapshot.counter_scope).to_string()),
        );
        out.insert(
            "high_water_mark".to_string(),
            JsonValue::from(snapshot.high_water_mark),
        );
        out.insert("dirty".to_string(), JsonValue::Bool(snapshot.dirty));
    }
    if sections.system {
        out.insert(
            "system".to_string(),
            session
                .allocator()
                .with_store(|store| store_to_json(store.scope(StoreScope::System))),
        );
    }
    if sections.run_state {
        out.insert(
            "run_state".to_string(),
            session
                .allocator()
                .with_store(|store| store_to_json(store.scope(StoreScope::RunState))),
        );
    }
    if sections.registries {
        out.insert("registries".to_string(), registries_to_json(session));
    }
    if sections.allocations {
        out.insert(
            "allocations".to_string(),
            allocations_to_json(&snapshot.allocations),
        );
    }

    out
}

fn counter_scope_name(scope: CounterScope) -> &'static str {
    match scope {
        CounterScope::Shared => "shared",
        CounterScope::PerType => "per_type",
    }
}

fn store_to_json(data: &ModdedSaveData) -> JsonValue {
    let mut owners = JsonMap::new();
    for owner in data.owners() {
        let mut entries = JsonMap::new();
        for (key, value) in data.entries(owner) {
            entries.insert(key.to_string(), JsonValue::String(value.to_string()));
        }
        owners.insert(owner.to_string(), JsonValue::Object(entries));
    }
    JsonValue::Object(owners)
}

fn registries_to_json(session: &Session) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("abilities".to_string(), registry_to_json(session.abilities()));
    out.insert(
        "special_abilities".to_string(),
        registry_to_json(session.special_abilities()),
    );
    out.insert("stat_icons".to_string(), registry_to_json(session.stat_icons()));
    out.insert("masks".to_string(), registry_to_json(session.masks()));
    out.insert("challenges".to_string(), registry_to_json(session.challenges()));
    out.insert("totems".to_string(), registry_to_json(session.totems()));
    out.insert("regions".to_string(), registry_to_json(session.regions()));
    out.insert(
        "consumables".to_string(),
        registry_to_json(session.consumables()),
    );
    JsonValue::Object(out)
}

fn registry_to_json<R: RegistryRecord>(registry: &Registry<R>) -> JsonValue {
    let base_len = registry.base_items().len();
    JsonValue::Array(
        registry
            .all()
            .iter()
            .enumerate()
            .map(|(index, record)| record_to_json(record, index >= base_len))
            .collect(),
    )
}

fn record_to_json<R: RegistryRecord>(record: &R, custom: bool) -> JsonValue {
    let mut m = JsonMap::new();
    m.insert("id".to_string(), JsonValue::from(record.identifier()));
    m.insert("owner".to_string(), JsonValue::String(record.owner().to_string()));
    m.insert(
        "name".to_string(),
        JsonValue::String(record.logical_name().to_string()),
    );
    m.insert(
        "display_name".to_string(),
        JsonValue::String(record.display_name().to_string()),
    );
    m.insert(
        "behavior".to_string(),
        match record.behavior() {
            Some(b) => JsonValue::String(b.type_name.clone()),
            None => JsonValue::Null,
        },
    );
    m.insert("custom".to_string(), JsonValue::Bool(custom));
    JsonValue::Object(m)
}

fn allocations_to_json(allocations: &[AllocationEntry]) -> JsonValue {
    JsonValue::Array(
        allocations
            .iter()
            .map(|entry| {
                let mut m = JsonMap::new();
                m.insert("tag".to_string(), JsonValue::String(entry.tag.to_string()));
                m.insert(
                    "qualified_name".to_string(),
                    JsonValue::String(entry.qualified_name.clone()),
                );
                m.insert("id".to_string(), JsonValue::from(entry.id));
                JsonValue::Object(m)
            })
            .collect(),
    )
}

fn render_summary_impl(session: &Session, options: TextRenderOptions) -> String {
    let snapshot = session.snapshot();
    let source = session
        .path()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "(in memory)".to_string());

    let mut out = String::new();
    writeln!(&mut out).expect("writing to String cannot fail");
    writeln!(&mut out, "{}", centered_no_trailing("MODDED SAVE DATA", PAGE_WIDTH))
        .expect("writing to String cannot fail");
    writeln!(&mut out, "{}", centered_no_trailing(&source, PAGE_WIDTH))
        .expect("writing to String cannot fail");
    writeln!(&mut out).expect("writing to String cannot fail");

    write_header_rows(&mut out, &snapshot);
    writeln!(&mut out).expect("writing to String cannot fail");
    write_allocations(&mut out, &snapshot.allocations);
    writeln!(&mut out).expect("writing to String cannot fail");
    write_registry_counts(&mut out, &snapshot);
    writeln!(&mut out).expect("writing to String cannot fail");
    write_owners(&mut out, &snapshot);

    if options.verbose {
        writeln!(&mut out).expect("writing to String cannot fail");
        write_records(&mut out, session);
        writeln!(&mut out).expect("writing to String cannot fail");
        session.allocator().with_store(|store| {
            write_store_entries(&mut out, "System Data", store.system());
            writeln!(&mut out).expect("writing to String cannot fail");
            write_store_entries(&mut out, "Run State", store.run_state());
        });
    }
    writeln!(&mut out).expect("writing to String cannot fail");

    out
}

fn write_header_rows(out: &mut String, snapshot: &SessionSnapshot) {
    let rows = [
        [
            format!("Base offset: {}", snapshot.base_offset),
            format!("Counter: {}", counter_scope_name(snapshot.counter_scope)),
            format!("High-water mark: {}", snapshot.high_water_mark),
        ],
        [
            format!("System keys: {}", snapshot.system_key_count),
            format!("Run keys: {}", snapshot.run_key_count),
            format!(
                "Unsaved changes: {}",
                if snapshot.dirty { "yes" } else { "no" }
            ),
        ],
    ];
    for [a, b, c] in rows {
        let line = format!("  {:<w$}{:<w$}{}", a, b, c, w = PAIR_COL_WIDTH);
        writeln!(out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }
}

fn write_allocations(out: &mut String, allocations: &[AllocationEntry]) {
    writeln!(out, " ::: Allocations :::").expect("writing to String cannot fail");
    if allocations.is_empty() {
        writeln!(out, "  none").expect("writing to String cannot fail");
        return;
    }
    for entry in allocations {
        writeln!(
            out,
            "  {:<lw$}{:<nw$}{:>6}",
            entry.tag.as_str(),
            truncate(&entry.qualified_name, NAME_COL_WIDTH - 1),
            entry.id,
            lw = LABEL_COL_WIDTH,
            nw = NAME_COL_WIDTH
        )
        .expect("writing to String cannot fail");
    }
}

fn write_registry_counts(out: &mut String, snapshot: &SessionSnapshot) {
    writeln!(out, " ::: Registries :::").expect("writing to String cannot fail");
    for counts in &snapshot.registries {
        writeln!(
            out,
            "  {:<lw$}base {:<6}custom {}",
            counts.tag.as_str(),
            counts.base,
            counts.custom,
            lw = LABEL_COL_WIDTH
        )
        .expect("writing to String cannot fail");
    }
}

fn write_owners(out: &mut String, snapshot: &SessionSnapshot) {
    writeln!(out, " ::: Owners :::").expect("writing to String cannot fail");
    if snapshot.owners.is_empty() {
        writeln!(out, "  none").expect("writing to String cannot fail");
        return;
    }
    for owner in &snapshot.owners {
        writeln!(
            out,
            "  {:<nw$}system {:<6}run {}",
            truncate(&owner.owner, NAME_COL_WIDTH - 1),
            owner.system_keys,
            owner.run_keys,
            nw = NAME_COL_WIDTH
        )
        .expect("writing to String cannot fail");
    }
}

fn write_records(out: &mut String, session: &Session) {
    writeln!(out, " ::: Records :::").expect("writing to String cannot fail");
    write_registry_records(out, session.abilities());
    write_registry_records(out, session.special_abilities());
    write_registry_records(out, session.stat_icons());
    write_registry_records(out, session.masks());
    write_registry_records(out, session.challenges());
    write_registry_records(out, session.totems());
    write_registry_records(out, session.regions());
    write_registry_records(out, session.consumables());
}

fn write_registry_records<R: RegistryRecord>(out: &mut String, registry: &Registry<R>) {
    for record in registry.all().iter() {
        let behavior = record
            .behavior()
            .map(|b| b.type_name.as_str())
            .unwrap_or("-");
        let line = format!(
            "  {:<lw$}{:>6}  {:<nw$}{}",
            R::TYPE_TAG.as_str(),
            record.identifier(),
            truncate(record.display_name(), NAME_COL_WIDTH - 1),
            behavior,
            lw = LABEL_COL_WIDTH,
            nw = NAME_COL_WIDTH
        );
        writeln!(out, "{}", line.trim_end()).expect("writing to String cannot fail");
    }
}

fn write_store_entries(out: &mut String, title: &str, data: &ModdedSaveData) {
    writeln!(out, " ::: {title} :::").expect("writing to String cannot fail");
    if data.is_empty() {
        writeln!(out, "  none").expect("writing to String cannot fail");
        return;
    }
    for owner in data.owners() {
        writeln!(out, "  [{owner}]").expect("writing to String cannot fail");
        for (key, value) in data.entries(owner) {
            writeln!(out, "    {key} = {value}").expect("writing to String cannot fail");
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn centered_no_trailing(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let left = (width - len) / 2;
    format!("{}{}", " ".repeat(left), text)
}
