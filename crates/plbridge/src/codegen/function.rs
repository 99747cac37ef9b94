//! Plain function DDL.

use super::python::dedent;
use super::{quoted, CompiledUnit, UnitKind, PRELUDE};
use crate::catalog::CatalogFunction;
use crate::ir::FunctionSpec;

/// Renders `CREATE OR REPLACE FUNCTION` for a function spec.
///
/// The procedure body defines the declared function verbatim and then calls
/// it with the SQL arguments, which PL/Python exposes under their own names.
pub fn compile_function(spec: &FunctionSpec) -> CompiledUnit {
    let source = procedure_source(spec);
    let returns = spec.returns.remote();

    let ddl_args: Vec<String> = spec
        .params
        .iter()
        .map(|p| format!("{} {}", p.name, p.ty.remote().ddl))
        .collect();
    let catalog_args: Vec<String> = spec
        .params
        .iter()
        .map(|p| format!("{} {}", p.name, p.ty.remote().catalog))
        .collect();

    let mut ddl = String::new();
    ddl.push_str(&format!(
        "CREATE OR REPLACE FUNCTION {}({})\n",
        spec.name,
        ddl_args.join(", ")
    ));
    ddl.push_str(&format!("RETURNS {}\n", returns.ddl));
    ddl.push_str(&format!("AS {}\n", quoted(&source)));
    ddl.push_str(&format!("LANGUAGE {}", spec.language));

    CompiledUnit {
        name: spec.name.clone(),
        kind: UnitKind::Function,
        ddl,
        fingerprint: CatalogFunction {
            name: spec.name.clone(),
            arguments: catalog_args.join(", "),
            result: returns.catalog.to_string(),
            source,
        },
        binding: None,
    }
}

fn procedure_source(spec: &FunctionSpec) -> String {
    let call_args: Vec<String> = spec
        .params
        .iter()
        .map(|p| {
            if p.ty.is_json() {
                format!("json.loads({})", p.name)
            } else {
                p.name.clone()
            }
        })
        .collect();
    let call = format!("{}({})", spec.name, call_args.join(", "));

    let mut source = String::from("\n");
    source.push_str(PRELUDE);
    source.push('\n');
    source.push_str(&dedent(&spec.body));
    source.push('\n');
    if spec.global {
        source.push_str(&format!("GD['{0}'] = {0}\n", spec.name));
    }
    if spec.returns.is_json() {
        source.push_str(&format!("return json.dumps({call})\n"));
    } else {
        source.push_str(&format!("return {call}\n"));
    }
    source
}
