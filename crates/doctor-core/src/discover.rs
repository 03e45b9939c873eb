//! Discovery of candidate desktop files and AppImage binaries.
//!
//! Directory lists come from a [`LocationResolver`] collaborator; this module
//! only walks what the resolver hands it. The launcher-daemon two-tier
//! fallback (config-file parsing, daemon liveness checks) lives behind the
//! trait and is deliberately not encoded here.

use crate::config::FixerConfig;
use crate::desktop::entry::APPIMAGE_EXTENSION;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// First 8 bytes of an AppImage: the ELF64 identification prefix.
pub const APPIMAGE_MAGIC: [u8; 8] = [0x7f, b'E', b'L', b'F', 0x02, 0x01, 0x01, 0x00];

/// Supplies candidate directories and the integration-availability signal.
pub trait LocationResolver {
    /// Directories where AppImage binaries live.
    fn appimage_directories(&self) -> Vec<PathBuf>;
    /// Directories where desktop files live.
    fn desktop_file_directories(&self) -> Vec<PathBuf>;
    /// Whether a launcher daemon integration is available.
    fn is_integration_active(&self) -> bool;
}

/// Fixed well-known locations, used when no launcher integration exists.
#[derive(Debug, Clone)]
pub struct DefaultLocations {
    home_dir: PathBuf,
}

impl DefaultLocations {
    pub fn new(home_dir: impl Into<PathBuf>) -> Self {
        Self {
            home_dir: home_dir.into(),
        }
    }
}

impl LocationResolver for DefaultLocations {
    fn appimage_directories(&self) -> Vec<PathBuf> {
        let candidates = [
            self.home_dir.join("Applications"),
            self.home_dir.join(".local/bin"),
            PathBuf::from("/opt/appimages"),
            PathBuf::from("/usr/local/bin"),
        ];
        candidates.into_iter().filter(|d| d.exists()).collect()
    }

    fn desktop_file_directories(&self) -> Vec<PathBuf> {
        let candidates = [
            self.home_dir.join(".local/share/applications"),
            PathBuf::from("/usr/share/applications"),
            PathBuf::from("/usr/local/share/applications"),
        ];
        candidates.into_iter().filter(|d| d.exists()).collect()
    }

    fn is_integration_active(&self) -> bool {
        // The daemon-aware tier is an external collaborator; the fixed-path
        // implementation always reports absent.
        false
    }
}

/// Check whether a file is an AppImage by its magic bytes.
pub fn is_appimage_file(path: &Path) -> bool {
    use std::io::Read;

    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let mut magic = [0u8; 8];
    match file.read_exact(&mut magic) {
        Ok(()) => magic == APPIMAGE_MAGIC,
        Err(_) => false,
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

fn has_appimage_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(APPIMAGE_EXTENSION))
}

/// Find candidate desktop files.
///
/// With an active launcher integration: every `.desktop` file under the
/// resolver's desktop directories whose name carries the launcher's naming
/// convention. Without one: `*.desktop` directly under `~/Applications` plus
/// `appimagekit_*.desktop` in the standard applications directory.
pub fn find_desktop_files<R: LocationResolver>(resolver: &R, config: &FixerConfig) -> Vec<PathBuf> {
    let mut found = Vec::new();

    if resolver.is_integration_active() {
        info!("Using launcher integration for desktop file discovery");
        for dir in resolver.desktop_file_directories() {
            for entry in WalkDir::new(&dir).into_iter().flatten() {
                let path = entry.path();
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if name.ends_with(".desktop")
                    && (name.contains("appimagekit_") || name.contains("AppImage"))
                {
                    found.push(path.to_path_buf());
                }
            }
        }
    } else {
        debug!("No launcher integration, using default locations");
        let default_dir = config.home_dir.join("Applications");
        if default_dir.exists() {
            for entry in std::fs::read_dir(&default_dir).into_iter().flatten().flatten() {
                let path = entry.path();
                if path.is_file() && has_extension(&path, "desktop") {
                    found.push(path);
                }
            }
        }

        if config.apps_dir.exists() {
            for entry in std::fs::read_dir(&config.apps_dir)
                .into_iter()
                .flatten()
                .flatten()
            {
                let path = entry.path();
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if path.is_file() && name.starts_with("appimagekit_") && name.ends_with(".desktop")
                {
                    found.push(path);
                }
            }
        }
    }

    found.sort();
    info!("Found {} candidate desktop files", found.len());
    found
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

/// Find AppImage binaries under the resolver's AppImage directories.
///
/// Matches executables ending in `.AppImage`, plus extensionless executables
/// that pass the magic-byte sniff.
pub fn find_appimage_binaries<R: LocationResolver>(resolver: &R) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for dir in resolver.appimage_directories() {
        for entry in WalkDir::new(&dir).into_iter().flatten() {
            let path = entry.path();
            if !entry.file_type().is_file() || !is_executable(path) {
                continue;
            }

            if has_appimage_extension(path)
                || (path.extension().is_none() && is_appimage_file(path))
            {
                found.push(path.to_path_buf());
            }
        }
    }

    found.sort();
    info!("Found {} AppImage binaries", found.len());
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    struct TestLocations {
        appimage_dirs: Vec<PathBuf>,
        desktop_dirs: Vec<PathBuf>,
        integration: bool,
    }

    impl LocationResolver for TestLocations {
        fn appimage_directories(&self) -> Vec<PathBuf> {
            self.appimage_dirs.clone()
        }
        fn desktop_file_directories(&self) -> Vec<PathBuf> {
            self.desktop_dirs.clone()
        }
        fn is_integration_active(&self) -> bool {
            self.integration
        }
    }

    fn touch(path: &Path, bytes: &[u8]) {
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(bytes).unwrap();
    }

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }

    #[test]
    fn test_magic_sniff_detects_appimage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app");
        let mut bytes = APPIMAGE_MAGIC.to_vec();
        bytes.extend_from_slice(b"rest of the binary");
        touch(&path, &bytes);

        assert!(is_appimage_file(&path));
    }

    #[test]
    fn test_magic_sniff_rejects_other_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("script");
        touch(&path, b"#!/bin/sh\necho hi\n");
        assert!(!is_appimage_file(&path));

        let short = dir.path().join("short");
        touch(&short, b"\x7fEL");
        assert!(!is_appimage_file(&short));
    }

    #[test]
    fn test_find_desktop_files_with_integration_filters_names() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("appimagekit_cursor.desktop"), b"x");
        touch(&dir.path().join("MyAppImage.desktop"), b"x");
        touch(&dir.path().join("firefox.desktop"), b"x");

        let resolver = TestLocations {
            appimage_dirs: vec![],
            desktop_dirs: vec![dir.path().to_path_buf()],
            integration: true,
        };
        let config = FixerConfig::with_home(dir.path());

        let found = find_desktop_files(&resolver, &config);
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| {
            let name = p.file_name().unwrap().to_str().unwrap();
            name.contains("appimagekit_") || name.contains("AppImage")
        }));
    }

    #[test]
    fn test_find_desktop_files_fallback_locations() {
        let home = TempDir::new().unwrap();
        let applications = home.path().join("Applications");
        std::fs::create_dir_all(&applications).unwrap();
        touch(&applications.join("cursor.desktop"), b"x");
        touch(&applications.join("notes.txt"), b"x");

        let config = FixerConfig::with_home(home.path());
        std::fs::create_dir_all(&config.apps_dir).unwrap();
        touch(&config.apps_dir.join("appimagekit_warp.desktop"), b"x");
        touch(&config.apps_dir.join("firefox.desktop"), b"x");

        let resolver = TestLocations {
            appimage_dirs: vec![],
            desktop_dirs: vec![],
            integration: false,
        };

        let found = find_desktop_files(&resolver, &config);
        assert_eq!(found.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_find_appimage_binaries() {
        let dir = TempDir::new().unwrap();

        let by_extension = dir.path().join("App-1.0.0.AppImage");
        touch(&by_extension, b"whatever");
        make_executable(&by_extension);

        let by_magic = dir.path().join("bareapp");
        touch(&by_magic, &APPIMAGE_MAGIC);
        make_executable(&by_magic);

        let not_executable = dir.path().join("Other.AppImage");
        touch(&not_executable, b"whatever");

        let plain = dir.path().join("readme");
        touch(&plain, b"text");
        make_executable(&plain);

        let resolver = TestLocations {
            appimage_dirs: vec![dir.path().to_path_buf()],
            desktop_dirs: vec![],
            integration: false,
        };

        let found = find_appimage_binaries(&resolver);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&by_extension));
        assert!(found.contains(&by_magic));
    }

    #[test]
    fn test_default_locations_filter_missing_dirs() {
        let home = TempDir::new().unwrap();
        let resolver = DefaultLocations::new(home.path());

        // Nothing under this home exists yet.
        assert!(resolver
            .appimage_directories()
            .iter()
            .all(|d| !d.starts_with(home.path())));

        std::fs::create_dir_all(home.path().join("Applications")).unwrap();
        assert!(resolver
            .appimage_directories()
            .contains(&home.path().join("Applications")));
        assert!(!resolver.is_integration_active());
    }
}
