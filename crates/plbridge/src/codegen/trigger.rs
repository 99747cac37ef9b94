//! Trigger function and binding DDL.

use super::python::dedent;
use super::{orm, quoted, CompileContext, CompiledUnit, UnitKind, PRELUDE};
use crate::catalog::{unqualified, CatalogFunction, CatalogTrigger, TriggerBinding};
use crate::diagnostic::BridgeError;
use crate::ir::{TriggerSpec, TriggerTarget};

/// Renders the trigger function and its binding as one transaction:
/// create-or-replace the function, drop any previous binding, bind again.
///
/// The handler's return value is discarded. The procedure hands back a
/// fixed row disposition instead: `'MODIFY'` when the new row image may have
/// been changed (BEFORE INSERT/UPDATE), `'OK'` otherwise.
pub fn compile_trigger(spec: &TriggerSpec, ctx: &CompileContext) -> Result<CompiledUnit, BridgeError> {
    let source = procedure_source(spec, ctx)?;
    let table = spec.target.table();
    let trigger_name = spec.trigger_name();

    let mut ddl = String::new();
    ddl.push_str("BEGIN;\n");
    ddl.push_str(&format!("CREATE OR REPLACE FUNCTION {}()\n", spec.name));
    ddl.push_str("RETURNS trigger\n");
    ddl.push_str(&format!("AS {}\n", quoted(&source)));
    ddl.push_str(&format!("LANGUAGE {};\n", spec.language));
    ddl.push_str(&format!("DROP TRIGGER IF EXISTS {trigger_name} ON {table};\n"));
    ddl.push_str(&format!("CREATE TRIGGER {trigger_name}\n"));
    ddl.push_str(&format!("{} {} ON {}\n", spec.timing, spec.event, table));
    ddl.push_str("FOR EACH ROW\n");
    ddl.push_str(&format!("EXECUTE PROCEDURE {}();\n", spec.name));
    ddl.push_str("COMMIT;");

    Ok(CompiledUnit {
        name: spec.name.clone(),
        kind: UnitKind::Trigger,
        ddl,
        fingerprint: CatalogFunction {
            name: spec.name.clone(),
            arguments: String::new(),
            result: "trigger".to_string(),
            source,
        },
        binding: Some(CatalogTrigger {
            name: trigger_name,
            table: unqualified(table).to_string(),
            function: spec.name.clone(),
            binding: Some(TriggerBinding {
                timing: spec.timing,
                event: spec.event,
            }),
        }),
    })
}

fn procedure_source(spec: &TriggerSpec, ctx: &CompileContext) -> Result<String, BridgeError> {
    let mut source = String::from("\n");
    source.push_str(PRELUDE);
    source.push('\n');
    source.push_str(&dedent(&spec.body));
    source.push('\n');

    match &spec.target {
        TriggerTarget::Table(_) => {
            source.push_str(&format!("{}(TD, plpy)\n", spec.name));
        }
        TriggerTarget::Model(meta) => {
            let runtime = ctx.orm.as_ref().ok_or(BridgeError::OrmNotConfigured {
                trigger: spec.name.clone(),
                missing: "[orm] enabled",
            })?;
            source.push_str(&orm::prologue(spec, meta, runtime)?);
            source.push_str(&format!("{}(new, old, TD, plpy)\n", spec.name));
            source.push_str(orm::write_back(spec));
        }
    }

    let disposition = if spec.modifies_row() { "MODIFY" } else { "OK" };
    source.push_str(&format!("return '{disposition}'\n"));
    Ok(source)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::codegen::OrmRuntime;
    use crate::diagnostic::Span;
    use crate::ir::{ModelMeta, TriggerEvent, TriggerTiming};

    fn plain(event: TriggerEvent, timing: TriggerTiming) -> TriggerSpec {
        TriggerSpec {
            name: "pl_trigger".to_string(),
            handler_params: vec!["td".to_string(), "plpy".to_string()],
            body: "def pl_trigger(td, plpy):\n    td['new']['name'] = 'x'\n".to_string(),
            language: "plpython3u".to_string(),
            event,
            timing,
            target: TriggerTarget::Table("t".to_string()),
            span: Span::builder(),
        }
    }

    fn model_bound() -> TriggerSpec {
        TriggerSpec {
            name: "on_book".to_string(),
            handler_params: ["new", "old", "td", "plpy"].iter().map(|s| s.to_string()).collect(),
            body: "def on_book(new, old, td, plpy):\n    new.amount_stock = 123\n".to_string(),
            language: "plpython3u".to_string(),
            event: TriggerEvent::Insert,
            timing: TriggerTiming::Before,
            target: TriggerTarget::Model(ModelMeta {
                object_name: "Book".to_string(),
                app_label: "books".to_string(),
                db_table: "books_book".to_string(),
            }),
            span: Span::builder(),
        }
    }

    fn orm_ctx(extra_env: BTreeMap<String, String>) -> CompileContext {
        CompileContext {
            orm: Some(OrmRuntime {
                env_paths: vec!["/venv/lib".to_string()],
                project_path: Some("/srv/app".to_string()),
                settings_module: Some("app.settings".to_string()),
                extra_env,
            }),
            ..CompileContext::default()
        }
    }

    #[test]
    fn test_before_insert_binding() {
        let unit = compile_trigger(&plain(TriggerEvent::Insert, TriggerTiming::Before), &CompileContext::default()).unwrap();
        assert!(unit.ddl.starts_with("BEGIN;\nCREATE OR REPLACE FUNCTION pl_trigger()\nRETURNS trigger\n"));
        assert!(unit.ddl.contains("DROP TRIGGER IF EXISTS pl_trigger_trigger ON t;\n"));
        assert!(unit.ddl.contains("CREATE TRIGGER pl_trigger_trigger\nBEFORE INSERT ON t\nFOR EACH ROW\n"));
        assert!(unit.ddl.ends_with("EXECUTE PROCEDURE pl_trigger();\nCOMMIT;"));

        let source = &unit.fingerprint.source;
        assert!(source.contains("\npl_trigger(TD, plpy)\n"));
        assert!(!source.contains("return pl_trigger("));
        assert!(source.ends_with("return 'MODIFY'\n"));

        let binding = unit.binding.unwrap();
        assert_eq!(binding.table, "t");
        assert_eq!(binding.binding.unwrap().timing, TriggerTiming::Before);
    }

    #[test]
    fn test_after_and_delete_do_not_modify() {
        let after = compile_trigger(&plain(TriggerEvent::Update, TriggerTiming::After), &CompileContext::default()).unwrap();
        assert!(after.fingerprint.source.ends_with("return 'OK'\n"));

        let delete = compile_trigger(&plain(TriggerEvent::Delete, TriggerTiming::Before), &CompileContext::default()).unwrap();
        assert!(delete.fingerprint.source.ends_with("return 'OK'\n"));
    }

    #[test]
    fn test_model_trigger_prologue() {
        let unit = compile_trigger(&model_bound(), &orm_ctx(BTreeMap::new())).unwrap();
        let source = &unit.fingerprint.source;
        assert!(source.contains("'select pl_enable_orm($1, $2, $3, $4)'"));
        assert!(source.contains("['/venv/lib'], '/srv/app', 'app.settings', '{}']"));
        assert!(source.contains("_model = apps.get_model('books', 'Book')\n"));
        assert!(source.contains("on_book(new, old, TD, plpy)\nTD['new'].update(model_to_dict(new))\n"));
        assert!(unit.ddl.contains("BEFORE INSERT ON books_book\n"));
    }

    #[test]
    fn test_model_trigger_embeds_allowed_env() {
        let mut env = BTreeMap::new();
        env.insert("SECRET_KEY".to_string(), "s3'cret".to_string());
        let unit = compile_trigger(&model_bound(), &orm_ctx(env)).unwrap();
        assert!(unit.fingerprint.source.contains(r#"'{"SECRET_KEY":"s3\'cret"}'"#));
    }

    #[test]
    fn test_model_trigger_needs_configuration() {
        let err = compile_trigger(&model_bound(), &CompileContext::default()).unwrap_err();
        assert!(matches!(err, BridgeError::OrmNotConfigured { .. }));

        let mut ctx = orm_ctx(BTreeMap::new());
        if let Some(orm) = ctx.orm.as_mut() {
            orm.settings_module = None;
        }
        let err = compile_trigger(&model_bound(), &ctx).unwrap_err();
        assert!(matches!(err, BridgeError::OrmNotConfigured { missing: "[orm] settings_module", .. }));
    }
}
