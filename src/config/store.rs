//! Live settings shared between the context and its collaborators.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::BridgeSettings;

/// Lock-free holder of the current [`BridgeSettings`].
///
/// Readers get a cheap `Arc` snapshot; writers swap the whole value.
pub struct SettingsStore {
    settings: ArcSwap<BridgeSettings>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("settings", &"ArcSwap<BridgeSettings>")
            .finish()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(BridgeSettings::default())
    }
}

impl SettingsStore {
    pub fn new(settings: BridgeSettings) -> Self {
        Self {
            settings: ArcSwap::new(Arc::new(settings)),
        }
    }

    pub fn load(&self) -> Arc<BridgeSettings> {
        self.settings.load_full()
    }

    pub fn store(&self, settings: BridgeSettings) {
        self.settings.store(Arc::new(settings));
    }
}
