use std::path::Path;

use plbridge::catalog::{CatalogFunction, CatalogTrigger, TriggerBinding};
use plbridge::{Bridge, BridgeConfig, BridgeError, FunctionDecl, FunctionOptions, MemoryBackend, TriggerOptions};

const FUNCTIONS: &str = r#"
from typing import Dict, List

from plbridge import plfunction


@plfunction
def pl_max(a: int, b: int) -> int:
    if a > b:
        return a
    return b


@plfunction(global_=True)
def tag_count(tags: List[str]) -> int:
    return len(tags)


def helper(x):
    return x
"#;

const TRIGGERS: &str = r#"
from plbridge import pltrigger


@pltrigger(event="INSERT", when="BEFORE", table="t")
def pl_trigger(td, plpy):
    td['new']['name'] = td['new']['name'] + 'test'


@pltrigger(event="UPDATE", when="BEFORE", model="Book")
def pl_update_amount(new, old, td, plpy):
    new.amount_stock = 123
"#;

const CONFIG: &str = r#"
[declarations]
paths = ["plpy"]

[runtime]
env_paths = ["/venv/lib/python3.7/site-packages"]
project_path = "/srv/app"

[orm]
enabled = true
settings_module = "app.settings"

[models.Book]
table = "books_book"
app_label = "books"
"#;

fn project() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("plpy")).unwrap();
    std::fs::write(dir.path().join("plpy/functions.py"), FUNCTIONS).unwrap();
    std::fs::write(dir.path().join("plpy/triggers.py"), TRIGGERS).unwrap();
    std::fs::write(dir.path().join("plbridge.toml"), CONFIG).unwrap();
    dir
}

fn loaded_bridge(root: &Path) -> Bridge {
    let config = BridgeConfig::load(&root.join("plbridge.toml")).unwrap();
    let mut bridge = Bridge::new(config);
    assert_eq!(bridge.load_declarations().unwrap(), 4);
    bridge
}

#[test]
fn declarations_sync_into_an_empty_catalog() {
    let dir = project();
    let bridge = loaded_bridge(dir.path());
    let mut backend = MemoryBackend::new();

    let report = bridge.sync(&mut backend).unwrap();

    assert_eq!(
        report.created,
        vec!["pl_enable_orm", "pl_max", "tag_count", "pl_trigger", "pl_update_amount"]
    );
    assert_eq!(report.triggers, 2);
    assert!(report.replaced.is_empty());
    assert!(!report.has_failures());

    let catalog = backend.catalog();
    assert!(catalog.function("pl_max", "a integer, b integer").is_some());
    assert!(catalog.function("tag_count", "tags character varying[]").is_some());
    let trigger = catalog.trigger("pl_update_amount_trigger", "books_book").unwrap();
    assert_eq!(trigger.function, "pl_update_amount");
}

#[test]
fn second_sync_changes_nothing() {
    let dir = project();
    let bridge = loaded_bridge(dir.path());
    let mut backend = MemoryBackend::new();

    bridge.sync(&mut backend).unwrap();
    let executed = backend.executed().len();
    let second = bridge.sync(&mut backend).unwrap();

    assert!(second.created.is_empty());
    assert!(second.replaced.is_empty());
    assert_eq!(second.unchanged.len(), 5);
    assert_eq!(backend.executed().len(), executed);
}

#[test]
fn orphans_survive_a_sync() {
    let dir = project();
    let bridge = loaded_bridge(dir.path());
    let mut backend = MemoryBackend::new();

    let orphan = CatalogFunction {
        name: "legacy_helper".to_string(),
        arguments: "x integer".to_string(),
        result: "integer".to_string(),
        source: "\nreturn x\n".to_string(),
    };
    let orphan_trigger = CatalogTrigger {
        name: "legacy_trigger".to_string(),
        table: "t".to_string(),
        function: "legacy_helper".to_string(),
        binding: TriggerBinding::from_tgtype(1 | 4),
    };
    backend.seed_function(orphan.clone());
    backend.seed_trigger(orphan_trigger.clone());

    bridge.sync(&mut backend).unwrap();

    assert_eq!(backend.catalog().function("legacy_helper", "x integer"), Some(&orphan));
    assert_eq!(backend.catalog().trigger("legacy_trigger", "t"), Some(&orphan_trigger));
    assert!(backend.executed().iter().all(|sql| !sql.contains("legacy_helper")));
}

#[test]
fn changed_body_is_replaced() {
    let dir = project();
    let mut backend = MemoryBackend::new();
    loaded_bridge(dir.path()).sync(&mut backend).unwrap();

    let edited = FUNCTIONS.replace("return len(tags)", "return len(set(tags))");
    std::fs::write(dir.path().join("plpy/functions.py"), edited).unwrap();

    let report = loaded_bridge(dir.path()).sync(&mut backend).unwrap();
    assert_eq!(report.replaced, vec!["tag_count"]);
    assert!(report.created.is_empty());
    assert!(backend
        .catalog()
        .function("tag_count", "tags character varying[]")
        .unwrap()
        .source
        .contains("len(set(tags))"));
}

#[test]
fn changed_result_type_drops_first() {
    let mut backend = MemoryBackend::new();
    let declare = |returns: &str, body: &str| {
        let mut bridge = Bridge::new(BridgeConfig::default());
        bridge
            .declare(
                FunctionDecl::new("answer")
                    .returns(returns)
                    .source(format!("def answer() -> {returns}:\n    return {body}\n"))
                    .into_function(FunctionOptions::default()),
            )
            .unwrap();
        bridge
    };

    declare("int", "42").sync(&mut backend).unwrap();
    let report = declare("str", "'42'").sync(&mut backend).unwrap();

    assert_eq!(report.replaced, vec!["answer"]);
    let last = backend.executed().last().unwrap();
    assert!(last.starts_with("DROP FUNCTION IF EXISTS answer();\n"));
    assert_eq!(backend.catalog().function("answer", "").unwrap().result, "character varying");
}

#[test]
fn failing_unit_does_not_abort_the_rest() {
    let dir = project();
    let bridge = loaded_bridge(dir.path());
    let mut backend = MemoryBackend::new();
    backend.fail_on("tag_count", "syntax error at or near \"$\"");

    let report = bridge.sync(&mut backend).unwrap();

    assert!(report.has_failures());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "tag_count");
    assert_eq!(report.created.len(), 4);

    // the next run picks up where this one failed
    let mut healthy = MemoryBackend::with_catalog(backend.catalog().clone());
    let retry = bridge.sync(&mut healthy).unwrap();
    assert_eq!(retry.created, vec!["tag_count"]);
}

#[test]
fn pl_max_signature_maps_to_integers() {
    let mut bridge = Bridge::new(BridgeConfig::default());
    bridge
        .declare(
            FunctionDecl::new("pl_max")
                .param("a", "int")
                .param("b", "int")
                .returns("int")
                .source("def pl_max(a: int, b: int) -> int:\n    if a > b:\n        return a\n    return b\n")
                .into_function(FunctionOptions::default()),
        )
        .unwrap();

    let units = bridge.compile().unwrap();
    assert_eq!(units.len(), 1);
    let ddl = &units[0].ddl;
    let header = &ddl[..ddl.find("AS ").unwrap()];
    assert_eq!(header.matches("integer").count(), 3);
    assert!(header.contains("pl_max(a integer, b integer)"));
    assert!(header.contains("RETURNS integer"));
}

#[test]
fn before_insert_trigger_binds_to_table() {
    let mut bridge = Bridge::new(BridgeConfig::default());
    bridge
        .declare(
            FunctionDecl::new("pl_trigger")
                .untyped_param("td")
                .untyped_param("plpy")
                .source("def pl_trigger(td, plpy):\n    td['new']['name'] += 'test'\n")
                .into_trigger(TriggerOptions::table("INSERT", "BEFORE", "t")),
        )
        .unwrap();

    let units = bridge.compile().unwrap();
    let ddl = &units[0].ddl;
    assert!(ddl.contains("BEFORE INSERT ON t\n"));
    assert!(ddl.contains("CREATE TRIGGER pl_trigger_trigger"));
    assert!(!ddl.contains("return pl_trigger("));
}

#[test]
fn redeclaration_replaces_the_entry() {
    let mut bridge = Bridge::new(BridgeConfig::default());
    for body in ["1", "2"] {
        bridge
            .declare(
                FunctionDecl::new("f")
                    .returns("int")
                    .source(format!("def f() -> int:\n    return {body}\n"))
                    .into_function(FunctionOptions::default()),
            )
            .unwrap();
    }

    assert_eq!(bridge.registry().len(), 1);
    assert!(bridge.registry().function("f").unwrap().body.contains("return 2"));
}

#[test]
fn strict_mode_rejects_redeclaration() {
    let config = BridgeConfig::from_toml_str("[declarations]\nstrict = true\n", Path::new("plbridge.toml")).unwrap();
    let mut bridge = Bridge::new(config);
    let decl = || {
        FunctionDecl::new("f")
            .returns("int")
            .source("def f() -> int:\n    return 1\n")
            .into_function(FunctionOptions::default())
    };

    bridge.declare(decl()).unwrap();
    let err = bridge.declare(decl()).unwrap_err();
    assert!(matches!(err, BridgeError::DuplicateDeclaration { .. }));
}

#[test]
fn unannotated_function_in_a_file_fails_to_load() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("bad.py"),
        "@plfunction\ndef f(a, b: int) -> int:\n    return b\n",
    )
    .unwrap();

    let mut bridge = Bridge::new(BridgeConfig::default());
    let err = bridge.load_path(dir.path()).unwrap_err();
    assert!(matches!(
        err,
        BridgeError::IncompleteAnnotation { parameter: Some(ref p), .. } if p == "a"
    ));
}

#[test]
fn model_trigger_without_orm_settings_fails_before_touching_the_database() {
    let config = BridgeConfig::from_toml_str(
        "[orm]\nenabled = true\n\n[models.Book]\ntable = \"books_book\"\napp_label = \"books\"\n",
        Path::new("plbridge.toml"),
    )
    .unwrap();
    let mut bridge = Bridge::new(config);
    bridge
        .declare(
            FunctionDecl::new("on_book")
                .untyped_param("new")
                .untyped_param("old")
                .untyped_param("td")
                .untyped_param("plpy")
                .source("def on_book(new, old, td, plpy):\n    pass\n")
                .into_trigger(TriggerOptions::model("INSERT", "AFTER", "Book")),
        )
        .unwrap();

    let mut backend = MemoryBackend::new();
    let err = bridge.sync(&mut backend).unwrap_err();
    assert!(matches!(err, BridgeError::OrmNotConfigured { .. }));
    assert!(backend.executed().is_empty());
}

#[test]
fn trigger_taking_over_a_function_name_syncs_once() {
    let mut bridge = Bridge::new(BridgeConfig::default());
    bridge
        .declare(
            FunctionDecl::new("audit")
                .returns("int")
                .source("def audit() -> int:\n    return 1\n")
                .into_function(FunctionOptions::default()),
        )
        .unwrap();
    bridge
        .declare(
            FunctionDecl::new("audit")
                .untyped_param("td")
                .untyped_param("plpy")
                .source("def audit(td, plpy):\n    pass\n")
                .into_trigger(TriggerOptions::table("INSERT", "AFTER", "t")),
        )
        .unwrap();
    assert_eq!(bridge.registry().len(), 1);

    let mut backend = MemoryBackend::new();
    let first = bridge.sync(&mut backend).unwrap();
    assert_eq!(first.created, vec!["audit"]);
    assert_eq!(first.triggers, 1);

    let second = bridge.sync(&mut backend).unwrap();
    assert_eq!(second.mutations(), 0);
    assert_eq!(backend.catalog().function("audit", "").unwrap().result, "trigger");
}
