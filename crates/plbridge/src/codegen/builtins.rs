//! Helper procedures shipped with the crate.

use crate::diagnostic::BridgeError;
use crate::frontend::{FunctionDecl, FunctionOptions};
use crate::ir::FunctionSpec;
use crate::signature::extract_function;

pub const ENABLE_ORM: &str = "pl_enable_orm";
pub const PYTHON_VERSION: &str = "pl_python_version";

const ENABLE_ORM_SOURCE: &str = r#"def pl_enable_orm(env_paths: List[str], project_path: str, settings_module: str, extra_env: Dict[str, str]) -> None:
    if GD.get('plbridge_orm_ready'):
        return
    import os
    import sys

    os.environ.update(extra_env or {})
    for path in env_paths or []:
        if path not in sys.path:
            sys.path.append(path)
    if project_path not in sys.path:
        sys.path.append(project_path)
    os.environ.setdefault('DJANGO_SETTINGS_MODULE', settings_module)

    from django.core.wsgi import get_wsgi_application

    get_wsgi_application()
    GD['plbridge_orm_ready'] = True
"#;

const PYTHON_VERSION_SOURCE: &str = r#"def pl_python_version() -> str:
    from platform import python_version

    return python_version()
"#;

/// Loads the application into the database interpreter, once per session.
/// Published in `GD` so other procedures can reach it directly.
pub fn pl_enable_orm(language: &str) -> Result<FunctionSpec, BridgeError> {
    let decl = FunctionDecl::new(ENABLE_ORM)
        .param("env_paths", "List[str]")
        .param("project_path", "str")
        .param("settings_module", "str")
        .param("extra_env", "Dict[str, str]")
        .returns("None")
        .source(ENABLE_ORM_SOURCE);
    extract_function(&decl, &FunctionOptions { global: true }, language)
}

/// Reports the database interpreter's version, `X.Y.Z`.
pub fn pl_python_version(language: &str) -> Result<FunctionSpec, BridgeError> {
    let decl = FunctionDecl::new(PYTHON_VERSION)
        .returns("str")
        .source(PYTHON_VERSION_SOURCE);
    extract_function(&decl, &FunctionOptions::default(), language)
}
