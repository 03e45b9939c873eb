//! Normalization rules for launcher-generated desktop entries.
//!
//! Two independent pure rules, each taking the file's lines and reporting
//! whether it changed anything, plus the [`needs_fixing`] predicate that the
//! orchestrator uses to decide whether a file is worth backing up at all.

use super::entry::APPIMAGE_EXTENSION;

/// Flag disabling the Chromium sandbox, required by Electron-style apps when
/// launched straight from an AppImage.
pub const NO_SANDBOX_FLAG: &str = "--no-sandbox";

/// Rewrite every `Icon=` line to exactly `Icon=<icon_name>`.
///
/// A line is rewritten when it carries the `appimagekit_` prefix, a trailing
/// parenthesized qualifier, or any other deviation from the target. Lines
/// already equal to the target are left untouched, and a file with no `Icon=`
/// line gets none added: this rule repairs, it does not inject.
pub fn fix_icon_references(lines: &[String], icon_name: &str) -> (Vec<String>, bool) {
    let target = format!("Icon={icon_name}");
    let mut modified = false;

    let result_lines = lines
        .iter()
        .map(|line| {
            if line.starts_with("Icon=") && line.trim() != target {
                modified = true;
                format!("{target}\n")
            } else {
                line.clone()
            }
        })
        .collect();

    (result_lines, modified)
}

/// Add `--no-sandbox` to the first `Exec=` line that launches an AppImage.
///
/// Idempotent: if the flag already appears anywhere in the file, nothing is
/// touched. The flag is inserted immediately after the first `.AppImage`
/// occurrence that ends its token, whether it is followed by an argument, the
/// end of the line, or the trailing newline. An occurrence embedded in a
/// longer token (`.AppImageArchive`) does not qualify.
pub fn add_no_sandbox_flag(lines: &[String]) -> (Vec<String>, bool) {
    if lines.iter().any(|line| line.contains(NO_SANDBOX_FLAG)) {
        return (lines.to_vec(), false);
    }

    let mut modified = false;
    let mut result_lines = Vec::with_capacity(lines.len());

    for line in lines {
        if !modified && line.starts_with("Exec=") {
            if let Some(insert_at) = flag_insert_position(line) {
                let mut fixed = String::with_capacity(line.len() + NO_SANDBOX_FLAG.len() + 1);
                fixed.push_str(&line[..insert_at]);
                fixed.push(' ');
                fixed.push_str(NO_SANDBOX_FLAG);
                fixed.push_str(&line[insert_at..]);
                result_lines.push(fixed);
                modified = true;
                continue;
            }
        }
        result_lines.push(line.clone());
    }

    (result_lines, modified)
}

/// Position just past the first `.AppImage` that ends its token: the next
/// character must be whitespace (including the line's newline) or absent.
fn flag_insert_position(line: &str) -> Option<usize> {
    line.match_indices(APPIMAGE_EXTENSION).find_map(|(pos, _)| {
        let end = pos + APPIMAGE_EXTENSION.len();
        match line[end..].chars().next() {
            None => Some(end),
            Some(c) if c.is_whitespace() => Some(end),
            Some(_) => None,
        }
    })
}

/// Whether a desktop file is out of compliance with the normalization rules.
///
/// Re-derivable independently of the rule functions and kept in agreement
/// with them: a file for which this returns false is a no-op for both rules.
/// Empty line lists (unreadable files) never need fixing.
pub fn needs_fixing(lines: &[String], icon_name: &str, needs_no_sandbox: bool) -> bool {
    if lines.is_empty() {
        return false;
    }

    let content = lines.concat();
    let icon_correct = content.contains(&format!("Icon={icon_name}\n"));
    let sandbox_correct = !needs_no_sandbox || content.contains(NO_SANDBOX_FLAG);

    !(icon_correct && sandbox_correct)
}
