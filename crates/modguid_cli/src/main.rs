use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use modguid_core::catalog::HostCatalog;
use modguid_core::core_api::{CoreError, Engine, Session};
use modguid_core::manifest::{ContentManifest, RegistrationReport};
use modguid_core::{CoreConfig, CounterScope, StoreScope, TypeTag};
use modguid_render::{
    JsonStyle, SectionSelection, TextRenderOptions, TextStyle, render_json_full,
    render_json_selected, render_json_values, render_text_with_options,
};
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "MODGUID_LOG";

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Save file, or a directory holding the configured save file name.
    #[arg(value_name = "SAVE")]
    path: PathBuf,
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// JSON file listing the host's built-in content.
    #[arg(long, value_name = "PATH")]
    catalog: Option<PathBuf>,
    #[arg(long = "base-offset", value_name = "N")]
    base_offset: Option<i32>,
    #[arg(long = "per-type-counters")]
    per_type_counters: bool,
    #[arg(long, global = true)]
    json: bool,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a summary of the save (default).
    Show {
        #[arg(long)]
        summary: bool,
        #[arg(long)]
        system: bool,
        #[arg(long = "run-state")]
        run_state: bool,
        #[arg(long)]
        registries: bool,
        #[arg(long)]
        allocations: bool,
    },
    /// Print one stored value.
    Get {
        owner: String,
        key: String,
        #[arg(long)]
        run: bool,
    },
    /// Store one value and write the save back.
    Set {
        owner: String,
        key: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
        #[arg(long)]
        run: bool,
    },
    /// Allocate (or look up) the identifier for OWNER's NAME.
    Allocate {
        #[arg(value_parser = parse_type_tag)]
        tag: TypeTag,
        owner: String,
        name: String,
    },
    /// List built-in and allocated identifiers of one kind.
    Values {
        #[arg(value_parser = parse_type_tag)]
        tag: TypeTag,
    },
    /// Resolve a content reference to its registered behaviour.
    Resolve {
        #[arg(long, default_value = "")]
        namespace: String,
        name: String,
    },
    /// Register a content manifest and persist its identifiers.
    Register {
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },
    /// Clear run-scoped data.
    NewRun,
}

impl Command {
    fn sections(&self) -> SectionSelection {
        match self {
            Command::Show {
                summary,
                system,
                run_state,
                registries,
                allocations,
            } => SectionSelection {
                summary: *summary,
                system: *system,
                run_state: *run_state,
                registries: *registries,
                allocations: *allocations,
            },
            _ => SectionSelection::default(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let engine = build_engine(&cli).unwrap_or_else(|e| {
        eprintln!("Error loading configuration: {e}");
        process::exit(1);
    });
    let save_path = resolve_save_path(&engine, &cli.path);
    debug!(path = %save_path.display(), "opening save");

    let mut session = engine.open_path(&save_path).unwrap_or_else(|e| {
        eprintln!("Error opening save file: {}", save_path.display());
        eprintln!("  {e}");
        process::exit(1);
    });

    let command = cli.command.unwrap_or(Command::Show {
        summary: false,
        system: false,
        run_state: false,
        registries: false,
        allocations: false,
    });

    match &command {
        Command::Show { .. } => show(&session, &command.sections(), cli.json, cli.verbose),
        Command::Get { owner, key, run } => get(&session, scope_arg(*run), owner, key, cli.json),
        Command::Set {
            owner,
            key,
            value,
            run,
        } => {
            require_non_empty(&[("OWNER", owner), ("KEY", key)]);
            let scope = scope_arg(*run);
            session.set_value(scope, owner, key, value);
            persist(&session);
            if cli.json {
                let mut out = JsonMap::new();
                out.insert("scope".to_string(), JsonValue::String(scope_name(scope).to_string()));
                out.insert("owner".to_string(), JsonValue::String(owner.clone()));
                out.insert("key".to_string(), JsonValue::String(key.clone()));
                out.insert("value".to_string(), JsonValue::String(value.clone()));
                print_json(&JsonValue::Object(out));
            } else {
                println!("{owner}.{key}={value}");
            }
        }
        Command::Allocate { tag, owner, name } => {
            require_non_empty(&[("OWNER", owner), ("NAME", name)]);
            let id = session.allocate(*tag, owner, name).unwrap_or_else(|e| {
                eprintln!("Error allocating identifier: {e}");
                process::exit(1);
            });
            persist(&session);
            if cli.json {
                let mut out = JsonMap::new();
                out.insert("tag".to_string(), JsonValue::String(tag.to_string()));
                out.insert("owner".to_string(), JsonValue::String(owner.clone()));
                out.insert("name".to_string(), JsonValue::String(name.clone()));
                out.insert("id".to_string(), JsonValue::from(id));
                print_json(&JsonValue::Object(out));
            } else {
                println!("{id}");
            }
        }
        Command::Values { tag } => {
            if cli.json {
                print_json(&render_json_values(&session, *tag));
            } else {
                for id in session.all_values(*tag) {
                    println!("{id}");
                }
            }
        }
        Command::Resolve { namespace, name } => {
            let behavior = session.resolve_type(namespace, name);
            if cli.json {
                let mut out = JsonMap::new();
                out.insert("namespace".to_string(), JsonValue::String(namespace.clone()));
                out.insert("name".to_string(), JsonValue::String(name.clone()));
                out.insert(
                    "behavior".to_string(),
                    match &behavior {
                        Some(b) => JsonValue::String(b.type_name.clone()),
                        None => JsonValue::Null,
                    },
                );
                print_json(&JsonValue::Object(out));
                return;
            }
            match behavior {
                Some(b) => println!("{}", b.type_name),
                None => {
                    eprintln!("Could not resolve '{name}'");
                    process::exit(1);
                }
            }
        }
        Command::Register { manifest } => {
            let manifest = ContentManifest::load_from_path(manifest).unwrap_or_else(|e| {
                eprintln!("Error loading manifest {}: {e}", manifest.display());
                process::exit(1);
            });
            let report = session.register_manifest(&manifest).unwrap_or_else(|e| {
                eprintln!("Error registering manifest: {e}");
                process::exit(1);
            });
            persist(&session);
            if cli.json {
                print_json(&report_to_json(&report));
            } else {
                print_report(&report);
            }
        }
        Command::NewRun => {
            session.start_new_run();
            persist(&session);
            if cli.json {
                let sections = SectionSelection {
                    run_state: true,
                    ..SectionSelection::default()
                };
                print_json(&render_json_selected(
                    &session,
                    &sections,
                    JsonStyle::CanonicalV1,
                ));
            } else {
                println!("Cleared run state in {}", save_path.display());
            }
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn build_engine(cli: &Cli) -> Result<Engine, CoreError> {
    let mut config = match &cli.config {
        Some(path) => CoreConfig::load_from_path(path)?,
        None => CoreConfig::default(),
    };
    if let Some(base_offset) = cli.base_offset {
        config.base_offset = base_offset;
    }
    if cli.per_type_counters {
        config.counter_scope = CounterScope::PerType;
    }

    let engine = Engine::with_config(config)?;
    match &cli.catalog {
        Some(path) => {
            let catalog = HostCatalog::load_from_path(path, engine.config().base_offset)?;
            engine.with_catalog(catalog)
        }
        None => Ok(engine),
    }
}

fn resolve_save_path(engine: &Engine, path: &Path) -> PathBuf {
    if path.is_dir() {
        engine.default_save_path(path)
    } else {
        path.to_path_buf()
    }
}

fn parse_type_tag(raw: &str) -> Result<TypeTag, String> {
    raw.parse::<TypeTag>().map_err(|e| e.message)
}

fn scope_arg(run: bool) -> StoreScope {
    if run {
        StoreScope::RunState
    } else {
        StoreScope::System
    }
}

fn scope_name(scope: StoreScope) -> &'static str {
    match scope {
        StoreScope::System => "system",
        StoreScope::RunState => "run_state",
    }
}

fn require_non_empty(args: &[(&str, &String)]) {
    for (label, value) in args {
        if value.trim().is_empty() {
            eprintln!("{label} must not be empty");
            process::exit(2);
        }
    }
}

fn persist(session: &Session) {
    if !session.is_dirty() {
        return;
    }
    session.save().unwrap_or_else(|e| {
        eprintln!("Error writing save file: {e}");
        process::exit(1);
    });
}

fn print_json(value: &JsonValue) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error rendering JSON output: {e}");
        process::exit(1);
    });
    println!("{rendered}");
}

fn show(session: &Session, sections: &SectionSelection, json: bool, verbose: bool) {
    if json {
        let value = if sections.is_any_selected() {
            render_json_selected(session, sections, JsonStyle::CanonicalV1)
        } else {
            render_json_full(session, JsonStyle::CanonicalV1)
        };
        print_json(&value);
        return;
    }

    if sections.is_any_selected() {
        for (key, value) in selected_pairs(session, sections) {
            println!("{key}={value}");
        }
        return;
    }

    print!(
        "{}",
        render_text_with_options(session, TextStyle::Summary, TextRenderOptions { verbose })
    );
}

fn get(session: &Session, scope: StoreScope, owner: &str, key: &str, json: bool) {
    let value = session.get_value(scope, owner, key);
    if json {
        let mut out = JsonMap::new();
        out.insert("scope".to_string(), JsonValue::String(scope_name(scope).to_string()));
        out.insert("owner".to_string(), JsonValue::String(owner.to_string()));
        out.insert("key".to_string(), JsonValue::String(key.to_string()));
        out.insert(
            "value".to_string(),
            value.map(JsonValue::String).unwrap_or(JsonValue::Null),
        );
        print_json(&JsonValue::Object(out));
        return;
    }
    match value {
        Some(value) => println!("{value}"),
        None => {
            eprintln!("No {} value for {owner}.{key}", scope_name(scope));
            process::exit(1);
        }
    }
}

fn selected_pairs(session: &Session, sections: &SectionSelection) -> Vec<(String, String)> {
    let snapshot = session.snapshot();
    let mut out = Vec::new();

    if sections.summary {
        out.push(("base_offset".to_string(), snapshot.base_offset.to_string()));
        out.push((
            "high_water_mark".to_string(),
            snapshot.high_water_mark.to_string(),
        ));
        out.push(("dirty".to_string(), snapshot.dirty.to_string()));
    }
    if sections.system || sections.run_state {
        session.allocator().with_store(|store| {
            let scopes = [
                (sections.system, "system", StoreScope::System),
                (sections.run_state, "run", StoreScope::RunState),
            ];
            for (wanted, prefix, scope) in scopes {
                if !wanted {
                    continue;
                }
                let data = store.scope(scope);
                for owner in data.owners() {
                    for (key, value) in data.entries(owner) {
                        out.push((format!("{prefix}.{owner}.{key}"), value.to_string()));
                    }
                }
            }
        });
    }
    if sections.registries {
        for counts in &snapshot.registries {
            out.push((
                format!("registry.{}", counts.tag),
                format!("base={} custom={}", counts.base, counts.custom),
            ));
        }
    }
    if sections.allocations {
        for entry in &snapshot.allocations {
            out.push((
                format!("{}.{}", entry.tag, entry.qualified_name),
                entry.id.to_string(),
            ));
        }
    }

    out
}

fn report_to_json(report: &RegistrationReport) -> JsonValue {
    let mut out = JsonMap::new();
    out.insert("owner".to_string(), JsonValue::String(report.owner.clone()));
    out.insert(
        "new_allocations".to_string(),
        JsonValue::from(report.new_allocations()),
    );
    out.insert(
        "entries".to_string(),
        JsonValue::Array(
            report
                .entries
                .iter()
                .map(|entry| {
                    let mut m = JsonMap::new();
                    m.insert("tag".to_string(), JsonValue::String(entry.tag.to_string()));
                    m.insert("name".to_string(), JsonValue::String(entry.name.clone()));
                    m.insert("id".to_string(), JsonValue::from(entry.id));
                    m.insert("new".to_string(), JsonValue::Bool(entry.newly_allocated));
                    JsonValue::Object(m)
                })
                .collect(),
        ),
    );
    JsonValue::Object(out)
}

fn print_report(report: &RegistrationReport) {
    for entry in &report.entries {
        let marker = if entry.newly_allocated { " (new)" } else { "" };
        println!("{} {}={}{}", entry.tag, entry.name, entry.id, marker);
    }
    println!(
        "Registered {} record(s) for {}, {} new identifier(s)",
        report.entries.len(),
        report.owner,
        report.new_allocations()
    );
}
