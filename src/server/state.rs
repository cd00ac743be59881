use crate::instructions::{self, Preset};
use crate::settings;

#[derive(Clone)]
pub(crate) struct ServerState {
    pub(crate) settings: settings::Settings,
    pub(crate) presets: Vec<Preset>,
}

impl ServerState {
    pub(crate) fn new(settings: settings::Settings) -> Self {
        Self {
            settings,
            presets: instructions::default_presets(),
        }
    }
}
