mod docx;
mod templates;

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub use docx::{DocSection, docx_document};
pub use templates::{TemplateImport, export_templates, import_templates, merge_presets};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsonDownload {
    pub file_name: String,
    pub contents: String,
}

/// JSON file for one result panel. Text that already parses as JSON is kept
/// as-is; anything else is wrapped as `{ "<label>": text }`. Empty text has
/// nothing to download.
pub fn json_download(file_name: &str, text: &str, label: &str) -> Result<Option<JsonDownload>> {
    if text.is_empty() {
        return Ok(None);
    }
    let value = match serde_json::from_str::<serde_json::Value>(text) {
        Ok(value) => value,
        Err(_) => {
            let mut wrapped = serde_json::Map::new();
            wrapped.insert(label.to_string(), serde_json::Value::String(text.to_string()));
            serde_json::Value::Object(wrapped)
        }
    };
    let contents =
        serde_json::to_string_pretty(&value).with_context(|| "failed to serialize download")?;
    Ok(Some(JsonDownload {
        file_name: format!("{}_{}.json", file_name, label),
        contents,
    }))
}

pub fn write_export(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir: {}", dir.display()))?;
    let path = dir.join(sanitize_file_name(file_name));
    fs::write(&path, bytes).with_context(|| format!("failed to write export: {}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote export");
    Ok(path)
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ch if ch.is_control() => '_',
            ch => ch,
        })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();
    if cleaned.is_empty() {
        "export".to_string()
    } else {
        cleaned
    }
}
