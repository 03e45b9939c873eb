//! Line-oriented desktop-entry reading, writing and field extraction.
//!
//! Only `Name=`, `Icon=`, `Exec=` and `X-AppImage-Version=` are interpreted;
//! everything else is opaque text that must survive a fix pass unchanged.
//! Reads and writes fail soft: callers treat an empty line list or a `false`
//! write result as "nothing to do for this file", never as fatal.

use std::path::{Path, PathBuf};
use tracing::error;

/// File extension that marks an AppImage launch target.
pub const APPIMAGE_EXTENSION: &str = ".AppImage";

/// Read a desktop file into lines, each keeping its trailing newline.
///
/// Returns an empty vec on any IO error.
pub fn read_desktop_file(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => content.split_inclusive('\n').map(str::to_string).collect(),
        Err(e) => {
            error!("Error reading {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Write lines back to a desktop file. Returns false (and logs) on failure.
pub fn write_desktop_file(path: &Path, lines: &[String]) -> bool {
    match std::fs::write(path, lines.concat()) {
        Ok(()) => true,
        Err(e) => {
            error!("Error writing {}: {}", path.display(), e);
            false
        }
    }
}

/// Extract the value of the first `<key>=` line, trimmed.
///
/// First match wins; later duplicate keys are ignored here but preserved
/// verbatim by the writer.
pub fn extract_field(lines: &[String], key: &str) -> Option<String> {
    let prefix = format!("{key}=");
    lines
        .iter()
        .find(|line| line.starts_with(&prefix))
        .and_then(|line| line.split_once('='))
        .map(|(_, value)| value.trim().to_string())
}

/// Application display name from the `Name=` field.
pub fn app_name(lines: &[String]) -> Option<String> {
    extract_field(lines, "Name")
}

/// Version recorded by the launcher in `X-AppImage-Version=`.
pub fn explicit_version(lines: &[String]) -> Option<String> {
    extract_field(lines, "X-AppImage-Version")
}

/// Full launch command from the `Exec=` field.
pub fn exec_command(lines: &[String]) -> Option<String> {
    extract_field(lines, "Exec")
}

/// AppImage binary referenced by the `Exec=` line, if any.
///
/// Takes the first whitespace-delimited token of the command and returns it
/// only when it ends in `.AppImage`. Flags, quoting or other executables all
/// count as "no AppImage target", not as errors.
pub fn appimage_target(lines: &[String]) -> Option<PathBuf> {
    let command = exec_command(lines)?;
    let first_token = command.split_whitespace().next()?;
    if first_token.ends_with(APPIMAGE_EXTENSION) {
        Some(PathBuf::from(first_token))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn lines(content: &str) -> Vec<String> {
        content.split_inclusive('\n').map(str::to_string).collect()
    }

    #[test]
    fn test_read_preserves_newlines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.desktop");
        let content = "[Desktop Entry]\nName=Test App\nExec=/t/app.AppImage\nIcon=test";
        std::fs::write(&path, content).unwrap();

        let read = read_desktop_file(&path);
        assert_eq!(read.len(), 4);
        assert_eq!(read[0], "[Desktop Entry]\n");
        // Last line has no trailing newline and must stay that way.
        assert_eq!(read[3], "Icon=test");
        assert_eq!(read.concat(), content);
    }

    #[test]
    fn test_read_missing_file_is_empty() {
        assert!(read_desktop_file(Path::new("/nonexistent/app.desktop")).is_empty());
    }

    #[test]
    fn test_write_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.desktop");
        let original = lines("[Desktop Entry]\nName=Test\n");

        assert!(write_desktop_file(&path, &original));
        assert_eq!(read_desktop_file(&path), original);
    }

    #[test]
    fn test_write_failure_returns_false() {
        let dir = TempDir::new().unwrap();
        // Writing to a directory path fails.
        assert!(!write_desktop_file(dir.path(), &lines("Name=Test\n")));
    }

    #[test]
    fn test_extract_field_first_match_wins() {
        let lines = lines("Name=First\nName=Second\n");
        assert_eq!(extract_field(&lines, "Name"), Some("First".to_string()));
    }

    #[test]
    fn test_extract_field_trims_value() {
        let lines = lines("Icon= spaced \n");
        assert_eq!(extract_field(&lines, "Icon"), Some("spaced".to_string()));
    }

    #[test]
    fn test_extract_field_absent() {
        let lines = lines("[Desktop Entry]\nExec=/t/app.AppImage\n");
        assert_eq!(app_name(&lines), None);
    }

    #[test]
    fn test_appimage_target_strips_arguments() {
        let lines = lines("Exec=/home/u/App.AppImage --flag %U\n");
        assert_eq!(
            appimage_target(&lines),
            Some(PathBuf::from("/home/u/App.AppImage"))
        );
    }

    #[test]
    fn test_appimage_target_non_appimage() {
        let lines = lines("Exec=/usr/bin/env myapp\n");
        assert_eq!(appimage_target(&lines), None);
    }

    #[test]
    fn test_explicit_version() {
        let lines = lines("Name=Test\nX-AppImage-Version=1.2.3\n");
        assert_eq!(explicit_version(&lines), Some("1.2.3".to_string()));
    }

    #[test]
    fn test_read_handles_crlf_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.desktop");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"Name=Test\r\nExec=/t/a.AppImage\r\n").unwrap();
        drop(f);

        let read = read_desktop_file(&path);
        assert_eq!(read[0], "Name=Test\r\n");
        assert_eq!(app_name(&read), Some("Test".to_string()));
    }
}
