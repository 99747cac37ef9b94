//! Object-relational prologue for model-bound triggers.
//!
//! Before the handler runs, the database interpreter is provisioned with the
//! application (search paths, project root, settings module, and any
//! embedded environment) through `pl_enable_orm`. `new`/`old` model
//! instances are then rebuilt from the row images in `TD`.

use super::python::{py_str, py_str_list};
use super::OrmRuntime;
use crate::diagnostic::BridgeError;
use crate::ir::{ModelMeta, TriggerSpec};

/// Code run ahead of the handler call.
pub(super) fn prologue(spec: &TriggerSpec, meta: &ModelMeta, orm: &OrmRuntime) -> Result<String, BridgeError> {
    let project_path = orm.project_path.as_deref().ok_or(BridgeError::OrmNotConfigured {
        trigger: spec.name.clone(),
        missing: "[runtime] project_path",
    })?;
    let settings_module = orm.settings_module.as_deref().ok_or(BridgeError::OrmNotConfigured {
        trigger: spec.name.clone(),
        missing: "[orm] settings_module",
    })?;

    if !orm.extra_env.is_empty() {
        tracing::warn!(
            trigger = %spec.name,
            count = orm.extra_env.len(),
            "embedding environment variables in plain text in the trigger body"
        );
    }
    let extra_env = serde_json::to_string(&orm.extra_env).map_err(|e| BridgeError::invalid_trigger(&spec.name, e.to_string()))?;

    let mut code = String::new();
    code.push_str("if 'plbridge_enable_orm' not in SD:\n");
    code.push_str("    SD['plbridge_enable_orm'] = plpy.prepare(\n");
    code.push_str("        'select pl_enable_orm($1, $2, $3, $4)',\n");
    code.push_str("        ['varchar[]', 'varchar', 'varchar', 'jsonb'],\n");
    code.push_str("    )\n");
    code.push_str(&format!(
        "plpy.execute(SD['plbridge_enable_orm'], [{}, {}, {}, {}])\n",
        py_str_list(&orm.env_paths),
        py_str(project_path),
        py_str(settings_module),
        py_str(&extra_env)
    ));
    code.push('\n');
    code.push_str("from django.apps import apps\n");
    code.push_str("from django.forms.models import model_to_dict\n");
    code.push('\n');
    code.push_str(&format!(
        "_model = apps.get_model({}, {})\n",
        py_str(&meta.app_label),
        py_str(&meta.object_name)
    ));
    code.push_str("new = _model(**TD['new']) if TD['new'] is not None else None\n");
    code.push_str("old = _model(**TD['old']) if TD['old'] is not None else None\n");
    Ok(code)
}

/// Code run after the handler call: copies model fields back into the new
/// row image so the database stores what the handler changed.
pub(super) fn write_back(spec: &TriggerSpec) -> &'static str {
    if spec.modifies_row() {
        "TD['new'].update(model_to_dict(new))\n"
    } else {
        ""
    }
}
