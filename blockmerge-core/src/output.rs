// Output artifacts: blocklist, canonical whitelist, allow-list, version files

use crate::error::{AggregateError, Result};
use crate::report::RunMetadata;
use crate::whitelist::Whitelist;
use chrono::{DateTime, Utc};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Decoration turning a trusted domain into an allow rule for a
/// downstream DNS filter. Defaults to the adblock `@@||domain^` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowlistDecoration {
    pub prefix: String,
    pub suffix: String,
}

impl Default for AllowlistDecoration {
    fn default() -> Self {
        Self {
            prefix: "@@||".to_string(),
            suffix: "^".to_string(),
        }
    }
}

impl AllowlistDecoration {
    pub fn decorate(&self, domain: &str) -> String {
        format!("{}{}{}", self.prefix, domain, self.suffix)
    }
}

pub fn render_blocklist(entries: &[String], updated_at: DateTime<Utc>) -> String {
    let mut out = String::with_capacity(entries.iter().map(|e| e.len() + 1).sum::<usize>() + 96);
    out.push_str("# Blocklist generated by blockmerge\n");
    out.push_str(&format!("# Updated: {}\n", updated_at.format("%Y-%m-%d %H:%M UTC")));
    out.push_str(&format!("# Total: {}\n", entries.len()));
    for entry in entries {
        out.push_str(entry);
        out.push('\n');
    }
    out
}

pub fn render_allowlist(whitelist: &Whitelist, decoration: &AllowlistDecoration) -> String {
    let mut out = String::new();
    for entry in whitelist.sorted() {
        out.push_str(&decoration.decorate(&entry));
        out.push('\n');
    }
    out
}

/// Write `contents` to a sibling temp file, sync, then rename over `path`,
/// so readers never observe a half-written file.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let io_err = |source| AggregateError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let temp_path = temp_path_for(path);
    if let Err(e) = write_and_sync(&temp_path, contents) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(e));
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_err(e));
    }
    debug!("Wrote {} ({} bytes)", path.display(), contents.len());
    Ok(())
}

fn write_and_sync(temp_path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = File::create(temp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Structured sibling of the version file: `version.txt` -> `version.json`.
/// A version file that is already `.json` gets `<stem>.meta.json`.
pub fn metadata_json_path(version_file: &Path) -> PathBuf {
    if version_file.extension().is_some_and(|ext| ext == "json") {
        version_file.with_extension("meta.json")
    } else {
        version_file.with_extension("json")
    }
}

pub fn write_version_files(version_file: &Path, metadata: &RunMetadata) -> Result<()> {
    write_atomic(version_file, &metadata.to_human())?;

    let json_path = metadata_json_path(version_file);
    let json = metadata.to_json().map_err(|e| AggregateError::Io {
        path: json_path.clone(),
        source: std::io::Error::other(e),
    })?;
    write_atomic(&json_path, &format!("{}\n", json))
}
