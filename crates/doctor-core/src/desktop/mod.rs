//! Desktop-entry (.desktop file) parsing, rewriting and normalization rules.
//!
//! Files are handled as ordered line sequences so that every line the rules
//! engine does not touch round-trips byte-for-byte.

pub mod entry;
pub mod rules;

pub use entry::{
    app_name, appimage_target, exec_command, explicit_version, extract_field, read_desktop_file,
    write_desktop_file, APPIMAGE_EXTENSION,
};
pub use rules::{add_no_sandbox_flag, fix_icon_references, needs_fixing, NO_SANDBOX_FLAG};
