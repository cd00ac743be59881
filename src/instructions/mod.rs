use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tera::{Context as TeraContext, Tera};

use crate::media::MediaKind;
use crate::settings::Settings;

const REQUEST_PROMPT_TEMPLATE: &str = include_str!("prompts/request_prompt.tera");

/// Which instruction slot applies to an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructionKind {
    Ocr,
    Image,
    Audio,
    Video,
}

impl InstructionKind {
    pub const ALL: [InstructionKind; 4] = [
        InstructionKind::Ocr,
        InstructionKind::Image,
        InstructionKind::Audio,
        InstructionKind::Video,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstructionKind::Ocr => "ocr",
            InstructionKind::Image => "image",
            InstructionKind::Audio => "audio",
            InstructionKind::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ocr" => Some(InstructionKind::Ocr),
            "image" => Some(InstructionKind::Image),
            "audio" => Some(InstructionKind::Audio),
            "video" => Some(InstructionKind::Video),
            _ => None,
        }
    }

    /// Image items use the OCR slot unless image OCR is switched off.
    pub fn for_media(media: MediaKind, image_ocr_enabled: bool) -> Self {
        match media {
            MediaKind::Image if image_ocr_enabled => InstructionKind::Ocr,
            MediaKind::Image => InstructionKind::Image,
            MediaKind::Audio => InstructionKind::Audio,
            MediaKind::Video => InstructionKind::Video,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemInstructions {
    pub ocr: String,
    pub image: String,
    pub audio: String,
    pub video: String,
}

impl Default for SystemInstructions {
    fn default() -> Self {
        Self {
            ocr: "The goal is text extraction. Extract the content exactly as it appears without altering it. Repair typos and broken characters from context.".to_string(),
            image: "Describe the visual elements, mood, colours and composition of the image in detail, specific enough to serve as alt text for visually impaired readers.".to_string(),
            audio: "Transcribe the audio completely, separate the speakers and organise the conversation. Include a key summary and keywords.".to_string(),
            video: "Organise the flow, key scenes and captions of the video in chronological order. Also suggest a title and description for publishing.".to_string(),
        }
    }
}

impl SystemInstructions {
    pub fn get(&self, kind: InstructionKind) -> &str {
        match kind {
            InstructionKind::Ocr => &self.ocr,
            InstructionKind::Image => &self.image,
            InstructionKind::Audio => &self.audio,
            InstructionKind::Video => &self.video,
        }
    }

    pub fn set(&mut self, kind: InstructionKind, text: String) {
        match kind {
            InstructionKind::Ocr => self.ocr = text,
            InstructionKind::Image => self.image = text,
            InstructionKind::Audio => self.audio = text,
            InstructionKind::Video => self.video = text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub kind: InstructionKind,
    pub label: String,
    pub text: String,
}

pub fn default_presets() -> Vec<Preset> {
    const PRESETS: &[(InstructionKind, &str, &str)] = &[
        (InstructionKind::Ocr, "Standard document OCR", "Extract the document text accurately and keep paragraphs and formatting as far as possible."),
        (InstructionKind::Ocr, "Handwriting", "This is a free-form handwritten note. Even for cursive or messy writing, use context to produce natural sentences."),
        (InstructionKind::Ocr, "Old official records", "This is a low-quality historical record that may contain Hanja or archaic expressions. Restore blurred characters from context."),
        (InstructionKind::Ocr, "Receipts and tables", "This is tabular or receipt data. Map items, prices and dates precisely onto the JSON structure."),
        (InstructionKind::Ocr, "With translation", "Detect and extract foreign-language passages and provide a Korean translation alongside."),
        (InstructionKind::Image, "Detailed visual description", "Describe composition, lighting, colour and the subjects' expressions in great detail, like an art critic."),
        (InstructionKind::Image, "Social media copy", "Write an engaging caption that could accompany this image on Instagram or a blog."),
        (InstructionKind::Image, "Product analysis", "Analyse material, design points and use cases of the product and write copy for a product page."),
        (InstructionKind::Image, "News photo", "Infer who, when, where, what, how and why of the pictured event and explain the situation objectively."),
        (InstructionKind::Image, "Mood analysis", "Analyse the dominant emotion and atmosphere of the image and recommend fitting music or keywords."),
        (InstructionKind::Audio, "Meeting minutes", "Summarise what participants said and clearly separate decisions from action items."),
        (InstructionKind::Audio, "Lecture notes", "Structure the lecture into note form focused on the key concepts."),
        (InstructionKind::Audio, "Interview", "Organise the content as questions and answers and capture the interviewee's main claims and emotional state."),
        (InstructionKind::Audio, "Full verbatim", "Do not summarise. Transcribe every word exactly as heard."),
        (InstructionKind::Audio, "Call centre review", "Identify the customer's enquiry and complaints and evaluate the agent's handling."),
        (InstructionKind::Video, "Chapter markers", "Analyse the timeline and produce chapter titles with timestamps."),
        (InstructionKind::Video, "Highlights", "Pick the three most interesting or important scenes and describe them."),
        (InstructionKind::Video, "Training manual", "Turn the procedure shown in the video into a step-by-step manual."),
        (InstructionKind::Video, "Script extraction", "Extract narration and dialogue in script form."),
        (InstructionKind::Video, "Promotional points", "Analyse the product or service features the video promotes from a marketing perspective."),
    ];
    PRESETS
        .iter()
        .map(|(kind, label, text)| Preset {
            kind: *kind,
            label: label.to_string(),
            text: text.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudioTab {
    pub id: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<&'static str>,
}

const fn tab(id: &'static str, label: &'static str, prompt: Option<&'static str>) -> StudioTab {
    StudioTab { id, label, prompt }
}

/// Free chat first, then the generators available for the media kind.
pub fn studio_tabs(media: MediaKind) -> Vec<StudioTab> {
    let mut tabs = vec![tab("chat", "Free chat", None)];
    match media {
        MediaKind::Image => tabs.extend([
            tab("sns", "Social post", Some("Write an Instagram caption promoting this image, including hashtags.")),
            tab("alt", "Alt text", Some("Describe the visual elements of this image in detail as alt text for visually impaired readers.")),
            tab("json", "JSON", Some("Structure the text in this image as JSON (include extractedText, correctedText, keywords, summary).")),
        ]),
        MediaKind::Video => tabs.extend([
            tab("youtube", "YouTube", Some("Suggest five YouTube titles and a description based on this video.")),
            tab("timeline", "Timeline", Some("Summarise the main events of this video as a timeline.")),
        ]),
        MediaKind::Audio => tabs.extend([
            tab("meeting", "Minutes", Some("Write meeting minutes from this audio (attendees, agenda, decisions, next steps).")),
            tab("todo", "To-do", Some("Extract only the action items from this content as a list.")),
        ]),
    }
    tabs
}

pub fn find_tab(media: MediaKind, id: &str) -> Option<StudioTab> {
    studio_tabs(media).into_iter().find(|tab| tab.id == id)
}

/// Generator tabs switched on in `[auto]` for this media kind.
pub fn auto_tabs(settings: &Settings, media: MediaKind) -> Vec<StudioTab> {
    studio_tabs(media)
        .into_iter()
        .filter(|tab| tab.prompt.is_some() && settings.auto.is_enabled(tab.id))
        .collect()
}

pub fn render_request_prompt(
    settings: &Settings,
    media: MediaKind,
    tab_id: Option<&str>,
    file_name: Option<&str>,
) -> Result<String> {
    let kind = InstructionKind::for_media(media, settings.image_ocr_enabled);
    let tab = match tab_id {
        Some(id) => Some(find_tab(media, id).ok_or_else(|| {
            anyhow!("unknown studio tab '{}' for {} media", id, media.as_str())
        })?),
        None => None,
    };

    let mut context = TeraContext::new();
    context.insert("media", media.as_str());
    context.insert("file_name", &file_name.unwrap_or_default());
    context.insert("kind", kind.as_str());
    context.insert("instruction", settings.instructions.get(kind).trim());
    context.insert("task", &tab.as_ref().and_then(|tab| tab.prompt).unwrap_or_default());
    context.insert("task_label", &tab.as_ref().map(|tab| tab.label).unwrap_or_default());
    context.insert("wants_json", &tab.as_ref().is_some_and(|tab| tab.id == "json"));

    Tera::one_off(REQUEST_PROMPT_TEMPLATE, &context, false)
        .with_context(|| "failed to render request prompt")
}
