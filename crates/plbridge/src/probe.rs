//! Version probe.
//!
//! Object-relational trigger bodies import the application inside the
//! database's interpreter. That only works reliably when both interpreters
//! share a major.minor version. The probe reports the verdict; it never
//! blocks a sync.

use std::fmt;
use std::process::Command;
use std::str::FromStr;

use crate::backend::Backend;
use crate::catalog::{Action, PlannedUnit};
use crate::codegen::{compile_function, pl_python_version, PYTHON_VERSION};
use crate::diagnostic::BridgeError;

/// A Python version such as `3.7.12`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpreterVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
    raw: String,
}

impl InterpreterVersion {
    /// Compatibility is decided on major.minor only.
    pub fn same_minor(&self, other: &Self) -> bool {
        self.major == other.major && self.minor == other.minor
    }

    /// `major.minor`.
    pub fn minor_release(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl FromStr for InterpreterVersion {
    type Err = String;

    /// Accepts `3.7.12`, `3.8`, `3.11.0rc1` and `Python 3.9.1+`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let text = raw.strip_prefix("Python").map(str::trim_start).unwrap_or(raw);

        let mut parts = text.splitn(3, '.');
        let number = |part: Option<&str>| -> Option<u32> {
            let digits: String = part?.chars().take_while(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        };
        let major = number(parts.next());
        let minor = number(parts.next());
        let patch = number(parts.next());

        match (major, minor) {
            (Some(major), Some(minor)) => Ok(Self {
                major,
                minor,
                patch,
                raw: raw.to_string(),
            }),
            _ => Err(format!("unrecognised interpreter version '{raw}'")),
        }
    }
}

impl fmt::Display for InterpreterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Compatibility of the two interpreters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Object-relational access in triggers is considered safe.
    Match,
    /// Triggers still install, but object-relational access is flagged.
    Mismatch,
    /// The database interpreter could not be queried.
    Unreachable(String),
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Match)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Match => "MATCH",
            Self::Mismatch => "MISMATCH",
            Self::Unreachable(_) => "UNREACHABLE",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => f.write_str("versions match"),
            Self::Mismatch => f.write_str("versions differ, object-relational access in triggers unsafe"),
            Self::Unreachable(reason) => write!(f, "database interpreter unreachable: {reason}"),
        }
    }
}

/// Produced fresh by every [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReport {
    pub local: InterpreterVersion,
    /// `None` when unreachable.
    pub remote: Option<InterpreterVersion>,
    pub verdict: Verdict,
}

/// Compares two versions on major.minor.
pub fn classify(local: &InterpreterVersion, remote: &InterpreterVersion) -> Verdict {
    if local.same_minor(remote) {
        Verdict::Match
    } else {
        Verdict::Mismatch
    }
}

/// Source of the host-side interpreter version.
pub trait LocalInterpreter {
    fn version(&self) -> Result<InterpreterVersion, BridgeError>;
}

/// A version given in configuration.
#[derive(Debug, Clone)]
pub struct FixedVersion(pub String);

impl LocalInterpreter for FixedVersion {
    fn version(&self) -> Result<InterpreterVersion, BridgeError> {
        self.0
            .parse()
            .map_err(|message| BridgeError::LocalInterpreter { message })
    }
}

/// Asks a Python executable for its version.
#[derive(Debug, Clone)]
pub struct PythonExecutable {
    pub program: String,
}

impl PythonExecutable {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl LocalInterpreter for PythonExecutable {
    fn version(&self) -> Result<InterpreterVersion, BridgeError> {
        let output = Command::new(&self.program)
            .args(["-c", "import platform; print(platform.python_version())"])
            .output()
            .map_err(|e| BridgeError::LocalInterpreter {
                message: format!("could not run '{}': {e}", self.program),
            })?;
        if !output.status.success() {
            return Err(BridgeError::LocalInterpreter {
                message: format!(
                    "'{}' exited with {}: {}",
                    self.program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        String::from_utf8_lossy(&output.stdout)
            .parse()
            .map_err(|message| BridgeError::LocalInterpreter { message })
    }
}

/// Installs `pl_python_version`, asks the database for its interpreter
/// version and compares it with the local one.
///
/// Only a failure to determine the local version is an error; anything
/// going wrong on the database side becomes [`Verdict::Unreachable`].
pub fn check<B: Backend>(
    local: &dyn LocalInterpreter,
    backend: &mut B,
    language: &str,
) -> Result<VersionReport, BridgeError> {
    let local = local.version()?;

    let (remote, verdict) = match remote_version(backend, language) {
        Ok(remote) => {
            let verdict = classify(&local, &remote);
            (Some(remote), verdict)
        }
        Err(reason) => (None, Verdict::Unreachable(reason)),
    };

    tracing::info!(
        local = %local,
        remote = %remote.as_ref().map(ToString::to_string).unwrap_or_default(),
        verdict = verdict.label(),
        "checked interpreter versions"
    );
    Ok(VersionReport {
        local,
        remote,
        verdict,
    })
}

fn remote_version<B: Backend>(backend: &mut B, language: &str) -> Result<InterpreterVersion, String> {
    let spec = pl_python_version(language).map_err(|e| e.to_string())?;
    let planned = PlannedUnit {
        unit: compile_function(&spec),
        action: Action::Create,
    };
    backend.execute(&planned).map_err(|e| e.message().to_string())?;

    let text = backend
        .query_text(&format!("select {PYTHON_VERSION}()"))
        .map_err(|e| e.message().to_string())?;
    text.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn v(s: &str) -> InterpreterVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_versions() {
        let version = v("3.7.12");
        assert_eq!((version.major, version.minor, version.patch), (3, 7, Some(12)));
        assert_eq!(version.to_string(), "3.7.12");
        assert_eq!(v("3.8").patch, None);
        assert_eq!(v("3.11.0rc1").patch, Some(0));
        assert_eq!(v("Python 3.9.1+\n").minor_release(), "3.9");
        assert!("three".parse::<InterpreterVersion>().is_err());
        assert!("3".parse::<InterpreterVersion>().is_err());
    }

    #[test]
    fn test_classify_on_minor_release() {
        assert_eq!(classify(&v("3.7.12"), &v("3.7.3")), Verdict::Match);
        assert_eq!(classify(&v("3.7.12"), &v("3.6.9")), Verdict::Mismatch);
        assert_eq!(classify(&v("3.10.0"), &v("3.1.0")), Verdict::Mismatch);
    }

    #[test]
    fn test_verdict_messages() {
        assert_eq!(Verdict::Match.to_string(), "versions match");
        assert_eq!(
            Verdict::Mismatch.to_string(),
            "versions differ, object-relational access in triggers unsafe"
        );
        assert!(Verdict::Unreachable("boom".to_string())
            .to_string()
            .starts_with("database interpreter unreachable"));
    }

    #[test]
    fn test_check_installs_the_helper() {
        let mut backend = MemoryBackend::new().with_remote_version("3.7.3");
        let report = check(&FixedVersion("3.7.12".to_string()), &mut backend, "plpython3u").unwrap();
        assert_eq!(report.verdict, Verdict::Match);
        assert_eq!(report.remote, Some(v("3.7.3")));
        assert!(backend.catalog().function(PYTHON_VERSION, "").is_some());
    }

    #[test]
    fn test_unreachable_is_not_an_error() {
        let mut backend = MemoryBackend::new().with_remote_version("3.7.3");
        backend.fail_on(PYTHON_VERSION, "language \"plpython3u\" does not exist");
        let report = check(&FixedVersion("3.7.12".to_string()), &mut backend, "plpython3u").unwrap();
        assert_eq!(
            report.verdict,
            Verdict::Unreachable("language \"plpython3u\" does not exist".to_string())
        );
        assert!(report.remote.is_none());
    }

    #[test]
    fn test_bad_local_version_is_an_error() {
        let mut backend = MemoryBackend::new();
        let err = check(&FixedVersion("unknown".to_string()), &mut backend, "plpython3u").unwrap_err();
        assert!(matches!(err, BridgeError::LocalInterpreter { .. }));
    }
}
