//! Version reconciliation between desktop entries and AppImage binaries.
//!
//! The desktop side reads the `X-AppImage-Version=` field, the file's own
//! name, then a parenthesized qualifier in the display name, in that order.
//! The binary side matches the filename first and only then falls back to a
//! chain of external introspection tools. The AppImage is never executed to
//! learn its version; that is a safety constraint, not an optimization.

use crate::config::FixerConfig;
use crate::desktop::entry;
use crate::hashing;
use crate::registry::AppImageRegistry;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::LazyLock;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Dotted three-part version anywhere in a string.
static DOTTED_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+\.\d+\.\d+)").unwrap());

/// Dotted version inside a parenthesized display-name qualifier.
static NAME_DOTTED_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+\.\d+\.\d+)\)").unwrap());

/// Single-integer display-name qualifier, e.g. "Warp (1)".
static NAME_INTEGER_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\((\d+)\)").unwrap());

/// "version: x.y.z" in external tool output, case-insensitive.
static TOOL_OUTPUT_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"version[:\s]+(\d+\.\d+\.\d+)")
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Outcome of a path-based version comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    NoDesktopVersion,
    AppImageNotFound,
    NoAppImageVersion,
    Match,
    Mismatch,
}

/// Result of comparing a desktop file against its AppImage binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionComparison {
    pub desktop_file: PathBuf,
    pub desktop_version: Option<String>,
    pub appimage_path: Option<PathBuf>,
    pub appimage_version: Option<String>,
    pub versions_match: bool,
    pub status: VersionStatus,
}

/// Outcome of a registry-backed comparison.
///
/// Coarser than [`VersionStatus`]: once the registry stands in for the
/// binary, "neither side has a version" and "one side has a version" collapse
/// into [`RegistryVersionStatus::NoVersion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryVersionStatus {
    AppImageNotFound,
    NoVersion,
    Match,
    Mismatch,
}

/// Result of comparing a desktop file against the registry's stored version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryComparison {
    pub desktop_version: Option<String>,
    pub appimage_version: Option<String>,
    pub versions_match: bool,
    pub status: RegistryVersionStatus,
}

/// Extract a version token from a desktop file.
///
/// Precedence: explicit `X-AppImage-Version=` field, then a version-shaped
/// substring in the file's own name, then a parenthesized qualifier in the
/// `Name=` value (dotted form, with a single-integer fallback). The first
/// source to produce a token wins.
pub fn desktop_version(path: &Path, lines: &[String]) -> Option<String> {
    if let Some(version) = entry::explicit_version(lines) {
        return Some(version);
    }

    if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
        if let Some(m) = DOTTED_VERSION.captures(file_name) {
            return Some(m[1].to_string());
        }
    }

    let name = entry::app_name(lines)?;
    if let Some(m) = NAME_DOTTED_QUALIFIER.captures(&name) {
        return Some(m[1].to_string());
    }
    if let Some(m) = NAME_INTEGER_QUALIFIER.captures(&name) {
        return Some(m[1].to_string());
    }

    None
}

/// One external tool in the binary-version fallback chain.
struct VersionProbe {
    program: &'static str,
    leading_args: &'static [&'static str],
    quick: bool,
}

impl VersionProbe {
    /// Run the tool against the binary and scan its stdout for a version.
    ///
    /// Best-effort: a missing tool, timeout or non-zero exit all yield None
    /// and the chain moves on.
    fn run(&self, target: &Path, config: &FixerConfig) -> Option<String> {
        let timeout = if self.quick {
            config.quick_probe_timeout
        } else {
            config.probe_timeout
        };

        let stdout = run_with_timeout(self.program, self.leading_args, target, timeout)?;
        TOOL_OUTPUT_VERSION
            .captures(&stdout)
            .map(|m| m[1].to_string())
    }
}

/// Probe chain, in precedence order.
const VERSION_PROBES: &[VersionProbe] = &[
    VersionProbe {
        program: "appimagetool",
        leading_args: &["-h"],
        quick: false,
    },
    VersionProbe {
        program: "binwalk",
        leading_args: &[],
        quick: false,
    },
    VersionProbe {
        program: "file",
        leading_args: &[],
        quick: true,
    },
];

/// Spawn a command and collect its stdout, abandoning it after `timeout`.
fn run_with_timeout(
    program: &str,
    leading_args: &[&str],
    target: &Path,
    timeout: Duration,
) -> Option<String> {
    let mut child = match Command::new(program)
        .args(leading_args)
        .arg(target)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            debug!("Probe {} unavailable: {}", program, e);
            return None;
        }
    };

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if started.elapsed() >= timeout {
                    debug!("Probe {} timed out, abandoning", program);
                    let _ = child.kill();
                    let _ = child.wait();
                    return None;
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            Err(e) => {
                warn!("Probe {} wait failed: {}", program, e);
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
        }
    };

    if !status.success() {
        return None;
    }

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        use std::io::Read;
        let _ = out.read_to_string(&mut stdout);
    }
    Some(stdout)
}

/// Extract a version token from an AppImage binary using static analysis only.
pub fn appimage_version(path: &Path, config: &FixerConfig) -> Option<String> {
    if !path.exists() {
        return None;
    }

    // Filename pattern first: no subprocess, no risk.
    if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
        if let Some(m) = DOTTED_VERSION.captures(file_name) {
            return Some(m[1].to_string());
        }
    }

    VERSION_PROBES
        .iter()
        .find_map(|probe| probe.run(path, config))
}

/// Compare a desktop file's version against its binary, re-probing the
/// binary each time.
pub fn compare_versions(desktop_file: &Path, config: &FixerConfig) -> VersionComparison {
    let lines = entry::read_desktop_file(desktop_file);
    let desktop_version = desktop_version(desktop_file, &lines);
    let appimage_path = entry::appimage_target(&lines);

    let mut result = VersionComparison {
        desktop_file: desktop_file.to_path_buf(),
        desktop_version: desktop_version.clone(),
        appimage_path: appimage_path.clone(),
        appimage_version: None,
        versions_match: false,
        status: VersionStatus::NoDesktopVersion,
    };

    let Some(desktop_version) = desktop_version else {
        return result;
    };

    let Some(appimage_path) = appimage_path.filter(|p| p.exists()) else {
        result.status = VersionStatus::AppImageNotFound;
        return result;
    };

    let appimage_version = appimage_version(&appimage_path, config);
    result.appimage_version = appimage_version.clone();

    let Some(appimage_version) = appimage_version else {
        result.status = VersionStatus::NoAppImageVersion;
        return result;
    };

    // Exact string equality only; version tokens are not semver.
    result.versions_match = desktop_version == appimage_version;
    result.status = if result.versions_match {
        VersionStatus::Match
    } else {
        VersionStatus::Mismatch
    };
    result
}

/// Compare using the registry's stored version for the binary's current hash.
///
/// Callers use this variant after a registry sync has run; it avoids
/// re-probing external tools.
pub fn compare_versions_with_registry(
    desktop_file: &Path,
    registry: &AppImageRegistry,
) -> RegistryComparison {
    let lines = entry::read_desktop_file(desktop_file);
    let appimage_path = entry::appimage_target(&lines).filter(|p| p.exists());

    let Some(appimage_path) = appimage_path else {
        return RegistryComparison {
            desktop_version: None,
            appimage_version: None,
            versions_match: false,
            status: RegistryVersionStatus::AppImageNotFound,
        };
    };

    let record = match hashing::sha256_file(&appimage_path) {
        Ok(checksum) => registry.find_by_checksum(&checksum).unwrap_or_else(|e| {
            warn!("Registry lookup failed: {}", e);
            None
        }),
        Err(e) => {
            warn!(
                "Could not hash {}: {}",
                appimage_path.display(),
                e
            );
            None
        }
    };

    let desktop_version = desktop_version(desktop_file, &lines);
    let appimage_version = record.and_then(|r| r.version);

    let (versions_match, status) = match (&desktop_version, &appimage_version) {
        (Some(d), Some(a)) if d == a => (true, RegistryVersionStatus::Match),
        (Some(_), Some(_)) => (false, RegistryVersionStatus::Mismatch),
        _ => (false, RegistryVersionStatus::NoVersion),
    };

    RegistryComparison {
        desktop_version,
        appimage_version,
        versions_match,
        status,
    }
}
