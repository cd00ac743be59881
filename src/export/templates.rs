use anyhow::{Context, Result, anyhow};

use crate::instructions::{InstructionKind, Preset};

const HEADER: [&str; 3] = ["kind", "label", "text"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateImport {
    pub presets: Vec<Preset>,
    pub skipped: usize,
}

pub fn export_templates(presets: &[Preset]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(HEADER)
        .with_context(|| "failed to write template header")?;
    for preset in presets {
        writer
            .write_record([preset.kind.as_str(), preset.label.as_str(), preset.text.as_str()])
            .with_context(|| format!("failed to write template '{}'", preset.label))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow!("failed to flush templates: {}", err))?;
    String::from_utf8(bytes).with_context(|| "templates are not valid UTF-8")
}

/// Reads `kind,label,text` rows. The header is optional, fields are trimmed,
/// unquoted commas in the text column are kept, and rows that cannot be used
/// are skipped rather than failing the whole import.
pub fn import_templates(content: &str) -> TemplateImport {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut import = TemplateImport::default();
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(row, error = %err, "skipping unreadable template row");
                import.skipped += 1;
                continue;
            }
        };
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if row == 0 && is_header(&record) {
            continue;
        }
        match preset_from_record(&record) {
            Some(preset) => import.presets.push(preset),
            None => {
                tracing::warn!(row, "skipping template row without kind, label and text");
                import.skipped += 1;
            }
        }
    }
    import
}

/// Imported presets replace existing ones with the same kind and label.
pub fn merge_presets(existing: &mut Vec<Preset>, imported: Vec<Preset>) {
    for preset in imported {
        match existing
            .iter_mut()
            .find(|current| current.kind == preset.kind && current.label == preset.label)
        {
            Some(current) => current.text = preset.text,
            None => existing.push(preset),
        }
    }
}

fn is_header(record: &csv::StringRecord) -> bool {
    record
        .iter()
        .zip(HEADER)
        .all(|(field, expected)| field.eq_ignore_ascii_case(expected))
}

fn preset_from_record(record: &csv::StringRecord) -> Option<Preset> {
    let kind = InstructionKind::parse(record.get(0)?)?;
    let label = record.get(1)?.to_string();
    let text = record.iter().skip(2).collect::<Vec<_>>().join(", ");
    if label.is_empty() || text.trim().is_empty() {
        return None;
    }
    Some(Preset { kind, label, text })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::default_presets;

    #[test]
    fn exported_templates_import_back() {
        let presets = default_presets();
        let csv = export_templates(&presets).expect("export");
        assert!(csv.starts_with("kind,label,text\n"));
        let import = import_templates(&csv);
        assert_eq!(import.skipped, 0);
        assert_eq!(import.presets, presets);
    }

    #[test]
    fn import_is_permissive() {
        let content = "\
ocr, Ledger , Keep the columns, rows and totals\n\
\n\
video,Only label\n\
poster,Unknown kind,text\n\
\"audio\",\"Quoted, label\",\"Line one\nline two\"\n";
        let import = import_templates(content);
        assert_eq!(import.skipped, 2);
        assert_eq!(import.presets.len(), 2);
        assert_eq!(import.presets[0].label, "Ledger");
        assert_eq!(import.presets[0].text, "Keep the columns, rows and totals");
        assert_eq!(import.presets[1].kind, InstructionKind::Audio);
        assert_eq!(import.presets[1].label, "Quoted, label");
        assert_eq!(import.presets[1].text, "Line one\nline two");
    }

    #[test]
    fn merge_replaces_matching_labels() {
        let mut presets = default_presets();
        let count = presets.len();
        let first = presets[0].clone();
        merge_presets(
            &mut presets,
            vec![
                Preset {
                    text: "Replaced".to_string(),
                    ..first.clone()
                },
                Preset {
                    kind: InstructionKind::Ocr,
                    label: "New".to_string(),
                    text: "Added".to_string(),
                },
            ],
        );
        assert_eq!(presets.len(), count + 1);
        assert_eq!(presets[0].text, "Replaced");
        assert_eq!(presets[count].label, "New");
    }
}
