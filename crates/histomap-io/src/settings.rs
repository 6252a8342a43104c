use serde::{Deserialize, Serialize};

/// Host-side settings for the layer renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSettings {
    /// Page location that feature paths are resolved against.
    pub base_url: String,
    /// Timeout for the single fetch attempt per selection.
    pub request_timeout_secs: u64,
    /// Initial guest linear memory, in 64 KiB pages.
    pub memory_pages: u32,
    /// Upper bound the guest may grow its memory to.
    pub max_memory_pages: u32,
    pub selection_policy: SelectionPolicy,
    pub palette: ButtonPalette,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            request_timeout_secs: 30,
            memory_pages: 10,
            max_memory_pages: 256,
            selection_policy: SelectionPolicy::default(),
            palette: ButtonPalette::default(),
        }
    }
}

impl HostSettings {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// How overlapping selections resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Every selection plots and updates the buttons when it completes;
    /// whichever finishes last ends up highlighted.
    #[default]
    LastToFinish,
    /// Only the most recent click may plot or touch button state. Older
    /// selections still finish their fetch but are dropped afterwards.
    LatestIntent,
}

/// Button background colours (CSS values).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonPalette {
    pub idle: String,
    pub selected: String,
    pub failed: String,
}

impl Default for ButtonPalette {
    fn default() -> Self {
        Self {
            idle: "transparent".to_string(),
            selected: "#cce0ff".to_string(),
            failed: "#ffcccc".to_string(),
        }
    }
}
