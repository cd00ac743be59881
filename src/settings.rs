use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::diff::DEFAULT_DIVERGENCE_RATIO;
use crate::instructions::{InstructionKind, SystemInstructions};
use crate::paths;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrEngine {
    Tesseract,
    Paddle,
}

impl OcrEngine {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "tesseract" => Some(OcrEngine::Tesseract),
            "paddle" | "paddleocr" => Some(OcrEngine::Paddle),
            _ => None,
        }
    }

    /// Label used for JSON downloads of this engine's text.
    pub fn export_label(&self) -> &'static str {
        match self {
            OcrEngine::Tesseract => "TesseractOCR",
            OcrEngine::Paddle => "PaddleOCR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Sans,
    Serif,
}

impl FontStyle {
    pub fn css_family(&self) -> &'static str {
        match self {
            FontStyle::Sans => "system-ui, sans-serif",
            FontStyle::Serif => "\"Times New Roman\", serif",
        }
    }
}

/// Studio outputs generated automatically after analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoConfig {
    pub sns: bool,
    pub alt: bool,
    pub json: bool,
    pub youtube: bool,
    pub timeline: bool,
    pub meeting: bool,
    pub todo: bool,
    pub word: bool,
}

impl AutoConfig {
    pub fn is_enabled(&self, id: &str) -> bool {
        match id {
            "sns" => self.sns,
            "alt" => self.alt,
            "json" => self.json,
            "youtube" => self.youtube,
            "timeline" => self.timeline,
            "meeting" => self.meeting,
            "todo" => self.todo,
            "word" => self.word,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Settings {
    pub model: String,
    pub ocr_engine: OcrEngine,
    pub paddle_url: String,
    pub image_ocr_enabled: bool,
    pub auto: AutoConfig,
    pub instructions: SystemInstructions,
    pub diff_divergence_ratio: f64,
    pub overlay_outline_color: String,
    pub overlay_fill_color: String,
    pub overlay_text_color: String,
    pub overlay_font_style: FontStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            ocr_engine: OcrEngine::Tesseract,
            paddle_url: "http://localhost:8000/ocr".to_string(),
            image_ocr_enabled: true,
            auto: AutoConfig::default(),
            instructions: SystemInstructions::default(),
            diff_divergence_ratio: DEFAULT_DIVERGENCE_RATIO,
            overlay_outline_color: "#4f46e5".to_string(),
            overlay_fill_color: "#4f46e5".to_string(),
            overlay_text_color: "#0f172a".to_string(),
            overlay_font_style: FontStyle::Sans,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    workspace: Option<WorkspaceSettings>,
    auto: Option<AutoSettings>,
    instructions: Option<InstructionSettings>,
    diff: Option<DiffSettings>,
    overlay: Option<OverlaySettings>,
}

#[derive(Debug, Default, Deserialize)]
struct WorkspaceSettings {
    model: Option<String>,
    ocr_engine: Option<String>,
    paddle_url: Option<String>,
    image_ocr_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct AutoSettings {
    sns: Option<bool>,
    alt: Option<bool>,
    json: Option<bool>,
    youtube: Option<bool>,
    timeline: Option<bool>,
    meeting: Option<bool>,
    todo: Option<bool>,
    word: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct InstructionSettings {
    ocr: Option<String>,
    image: Option<String>,
    audio: Option<String>,
    video: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DiffSettings {
    divergence_ratio: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct OverlaySettings {
    outline_color: Option<String>,
    fill_color: Option<String>,
    text_color: Option<String>,
    font_style: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(dir) = paths::settings_dir() {
        ordered_paths.push(dir.join("settings.toml"));
        ordered_paths.push(dir.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "merged settings layer");
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        let parsed: SettingsFile =
            toml::from_str(content).with_context(|| "failed to parse settings")?;
        let mut settings = Settings::default();
        settings.merge(parsed);
        Ok(settings)
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(workspace) = incoming.workspace {
            if let Some(model) = non_empty(workspace.model) {
                self.model = model;
            }
            if let Some(engine) = workspace.ocr_engine {
                match OcrEngine::parse(&engine) {
                    Some(engine) => self.ocr_engine = engine,
                    None => tracing::warn!(%engine, "ignoring unknown ocr_engine"),
                }
            }
            if let Some(url) = non_empty(workspace.paddle_url) {
                self.paddle_url = url;
            }
            if let Some(enabled) = workspace.image_ocr_enabled {
                self.image_ocr_enabled = enabled;
            }
        }
        if let Some(auto) = incoming.auto {
            let toggles = [
                (auto.sns, &mut self.auto.sns),
                (auto.alt, &mut self.auto.alt),
                (auto.json, &mut self.auto.json),
                (auto.youtube, &mut self.auto.youtube),
                (auto.timeline, &mut self.auto.timeline),
                (auto.meeting, &mut self.auto.meeting),
                (auto.todo, &mut self.auto.todo),
                (auto.word, &mut self.auto.word),
            ];
            for (value, slot) in toggles {
                if let Some(value) = value {
                    *slot = value;
                }
            }
        }
        if let Some(instructions) = incoming.instructions {
            let overrides = [
                (InstructionKind::Ocr, instructions.ocr),
                (InstructionKind::Image, instructions.image),
                (InstructionKind::Audio, instructions.audio),
                (InstructionKind::Video, instructions.video),
            ];
            for (kind, text) in overrides {
                if let Some(text) = non_empty(text) {
                    self.instructions.set(kind, text);
                }
            }
        }
        if let Some(diff) = incoming.diff {
            if let Some(ratio) = diff.divergence_ratio {
                if ratio > 0.0 {
                    self.diff_divergence_ratio = ratio;
                }
            }
        }
        if let Some(overlay) = incoming.overlay {
            if let Some(color) = non_empty(overlay.outline_color) {
                self.overlay_outline_color = color;
            }
            if let Some(color) = non_empty(overlay.fill_color) {
                self.overlay_fill_color = color;
            }
            if let Some(color) = non_empty(overlay.text_color) {
                self.overlay_text_color = color;
            }
            if let Some(style) = overlay.font_style {
                match style.trim().to_lowercase().as_str() {
                    "serif" => self.overlay_font_style = FontStyle::Serif,
                    "sans" | "sans-serif" => self.overlay_font_style = FontStyle::Sans,
                    _ => tracing::warn!(%style, "ignoring unknown overlay font_style"),
                }
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(dir) = paths::settings_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create settings directory: {}", dir.display()))?;
    let path = dir.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn embedded_defaults_match_built_in_defaults() {
        let parsed = Settings::from_toml(DEFAULT_SETTINGS_TOML).expect("default settings");
        let defaults = Settings::default();
        assert_eq!(parsed.model, defaults.model);
        assert_eq!(parsed.ocr_engine, defaults.ocr_engine);
        assert_eq!(parsed.auto, defaults.auto);
        assert_eq!(parsed.diff_divergence_ratio, defaults.diff_divergence_ratio);
        assert_eq!(parsed.instructions, defaults.instructions);
    }

    #[test]
    fn blank_values_do_not_override() {
        let settings = Settings::from_toml(
            r#"
            [workspace]
            model = "  "
            ocr_engine = "paddle"

            [instructions]
            audio = ""
            video = "Summarise each scene."

            [diff]
            divergence_ratio = -1.0

            [overlay]
            font_style = "serif"
            "#,
        )
        .expect("settings");
        assert_eq!(settings.model, "gemini-2.0-flash");
        assert_eq!(settings.ocr_engine, OcrEngine::Paddle);
        assert_eq!(
            settings.instructions.get(InstructionKind::Audio),
            SystemInstructions::default().get(InstructionKind::Audio)
        );
        assert_eq!(
            settings.instructions.get(InstructionKind::Video),
            "Summarise each scene."
        );
        assert_eq!(settings.diff_divergence_ratio, DEFAULT_DIVERGENCE_RATIO);
        assert_eq!(settings.overlay_font_style, FontStyle::Serif);
    }

    #[test]
    fn load_writes_home_file_and_applies_extra_layer() {
        with_temp_home(|home| {
            let extra = home.join("extra.toml");
            fs::write(&extra, "[auto]\nsns = true\nword = true\n").expect("write extra");

            let settings = load_settings(Some(&extra)).expect("load");
            assert!(home.join(".arms-workspace-rust/settings.toml").exists());
            assert!(settings.auto.sns);
            assert!(settings.auto.is_enabled("word"));
            assert!(!settings.auto.is_enabled("todo"));

            let missing = home.join("missing.toml");
            assert!(load_settings(Some(&missing)).is_err());
        });
    }
}
