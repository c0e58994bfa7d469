use crate::lazy::{placeholder_height, LazyPages};
use doc_model::{EditState, ViewMode};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Everything the viewer reads from the edit state.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerInput {
    pub page_order: Vec<usize>,
    /// Pending rotation per visual index.
    pub rotations: BTreeMap<usize, i32>,
    pub selection: BTreeSet<usize>,
    pub view_mode: ViewMode,
    pub global_rotation: i32,
    pub active_page: usize,
    pub scale: f32,
    pub text_select_mode: bool,
    pub version: u64,
}

impl ViewerInput {
    pub fn from_state(state: &EditState) -> Self {
        Self {
            page_order: state.page_order.clone(),
            rotations: state.rotations_by_visual_index(),
            selection: state.selection.clone(),
            view_mode: state.view_mode,
            global_rotation: state.global_rotation,
            active_page: state.active_page,
            scale: state.scale,
            text_select_mode: state.text_select_mode,
            version: state.version,
        }
    }

    pub fn rotation_at(&self, visual_index: usize) -> i32 {
        let pending = self.rotations.get(&visual_index).copied().unwrap_or(0);
        (self.global_rotation.rem_euclid(360) + pending.rem_euclid(360)) % 360
    }

    /// Active page clamped into the document; 0 for an empty document.
    pub fn safe_active_page(&self) -> usize {
        self.active_page.min(self.page_order.len().saturating_sub(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenderLayers {
    pub text: bool,
    pub annotations: bool,
}

pub fn render_layers(text_select_mode: bool) -> RenderLayers {
    RenderLayers { text: text_select_mode, annotations: text_select_mode }
}

/// Identity of a mounted page; a renderer drops cached output when it changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PageKey {
    pub version: u64,
    pub visual_index: usize,
    pub global_rotation: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageContent {
    Rendered { layers: RenderLayers },
    Placeholder { height_px: f32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageView {
    pub key: PageKey,
    pub visual_index: usize,
    /// One-based page number in the committed document.
    pub page_number: usize,
    pub rotation: i32,
    pub selected: bool,
    pub label: String,
    pub width_px: f32,
    pub content: PageContent,
}

/// Pages to paint for the current state.
///
/// Continuous mode lists every visual page, rendering only those `lazy` has
/// latched. Single-page mode shows the clamped active page, always rendered.
pub fn render_plan(input: &ViewerInput, width_px: f32, lazy: &LazyPages) -> Vec<PageView> {
    let layers = render_layers(input.text_select_mode);

    match input.view_mode {
        ViewMode::Continuous => (0..input.page_order.len())
            .map(|visual_index| {
                let content = if lazy.is_materialized(visual_index) {
                    PageContent::Rendered { layers }
                } else {
                    PageContent::Placeholder { height_px: placeholder_height(width_px) }
                };
                page_view(input, visual_index, width_px, content)
            })
            .collect(),
        ViewMode::SinglePage if input.page_order.is_empty() => Vec::new(),
        ViewMode::SinglePage => {
            let visual_index = input.safe_active_page();
            vec![page_view(input, visual_index, width_px, PageContent::Rendered { layers })]
        }
    }
}

fn page_view(input: &ViewerInput, visual_index: usize, width_px: f32, content: PageContent) -> PageView {
    PageView {
        key: PageKey { version: input.version, visual_index, global_rotation: input.global_rotation },
        visual_index,
        page_number: input.page_order[visual_index] + 1,
        rotation: input.rotation_at(visual_index),
        selected: input.selection.contains(&visual_index),
        label: (visual_index + 1).to_string(),
        width_px,
        content,
    }
}
