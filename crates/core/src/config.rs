//! Editor configuration.
//!
//! Persisted by the `storage` crate and overridable from the command line.

use doc_model::ViewMode;
use pdf_engine::PageSize;
use serde::{Deserialize, Serialize};

/// Tunables for [`crate::Editor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Size of pages created by "insert blank page"
    pub blank_page: PageSize,
    /// Degrees applied by a single rotate-clockwise step
    pub rotation_step: i32,
    /// Commit pending rotations before a virtual reorder instead of letting
    /// them follow their page. Off by default: rotations are keyed by page
    /// identity, so a move never needs the extra document rewrite. Turn it on
    /// to get the older commit-then-reorder sequence.
    pub commit_before_reorder: bool,
    /// View mode a freshly opened document starts in
    pub default_view_mode: ViewMode,
    /// Distance from the viewport at which a lazy page starts rendering
    pub lazy_margin_px: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            blank_page: PageSize::A4,
            rotation_step: 90,
            commit_before_reorder: false,
            default_view_mode: ViewMode::Continuous,
            lazy_margin_px: 500.0,
        }
    }
}

impl EditorConfig {
    pub fn with_blank_page(mut self, size: PageSize) -> Self {
        self.blank_page = size;
        self
    }

    pub fn with_rotation_step(mut self, degrees: i32) -> Self {
        self.rotation_step = degrees;
        self
    }

    pub fn with_commit_before_reorder(mut self, enabled: bool) -> Self {
        self.commit_before_reorder = enabled;
        self
    }

    pub fn with_default_view_mode(mut self, mode: ViewMode) -> Self {
        self.default_view_mode = mode;
        self
    }

    pub fn with_lazy_margin_px(mut self, margin: f32) -> Self {
        self.lazy_margin_px = margin.max(0.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EditorConfig =
            serde_json::from_str(r#"{ "commit_before_reorder": true }"#).expect("valid config");

        assert!(config.commit_before_reorder);
        assert_eq!(config.rotation_step, 90);
        assert_eq!(config.blank_page, PageSize::A4);
        assert_eq!(config.lazy_margin_px, 500.0);
    }

    #[test]
    fn builder_clamps_negative_margin() {
        let config = EditorConfig::default().with_lazy_margin_px(-10.0);
        assert_eq!(config.lazy_margin_px, 0.0);
    }
}
