//! External editor support.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::Command;

/// Editors offered by the initializer: (label, executable, extra arguments)
pub const KNOWN_EDITORS: &[(&str, &str, &str)] = &[
    ("Vi", "vi", ""),
    ("Vim", "vim", ""),
    ("Visual Studio Code", "code", " --wait"),
];

/// Locate an executable on PATH
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Known editors that are installed, as (label, command)
pub fn available_editors() -> Vec<(String, String)> {
    KNOWN_EDITORS
        .iter()
        .filter_map(|(label, exe, args)| {
            find_executable(exe)
                .map(|path| (label.to_string(), format!("{}{}", path.display(), args)))
        })
        .collect()
}

/// Open `editor_cmd` on an empty temp file and return what was written, trimmed.
///
/// `editor_cmd` is split on whitespace: the first word is the program, the rest are
/// passed before the file path.
pub fn compose(editor_cmd: &str) -> Result<String> {
    let mut parts = editor_cmd.split_whitespace();
    let program = parts.next().context("No editor configured")?;

    let path = std::env::temp_dir().join(format!("giournal-{}.md", uuid::Uuid::new_v4()));
    std::fs::write(&path, "")
        .with_context(|| format!("Cannot create temp file: {}", path.display()))?;

    let status = Command::new(program).args(parts).arg(&path).status();
    let content = std::fs::read_to_string(&path);
    let _ = std::fs::remove_file(&path);

    let status = status.with_context(|| format!("Cannot launch editor '{}'", program))?;
    if !status.success() {
        bail!("Editor '{}' exited with {}", program, status);
    }

    Ok(content.context("Cannot read editor output")?.trim().to_string())
}
