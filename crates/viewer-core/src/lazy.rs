use crate::viewport::ViewportState;
use std::collections::BTreeSet;

pub const DEFAULT_LAZY_MARGIN_PX: f32 = 500.0;

/// Height/width ratio of the placeholder shown for pages not yet rendered.
pub const PLACEHOLDER_ASPECT: f32 = 1.41;

pub fn placeholder_height(width_px: f32) -> f32 {
    width_px * PLACEHOLDER_ASPECT
}

/// Tracks which pages of a continuous view have come near the viewport.
///
/// A page latches once it is within `margin_px` of the visible area and stays
/// latched while the user scrolls away. The set is dropped whenever the
/// rendered document or the global rotation changes, since every page is
/// remounted then.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyPages {
    margin_px: f32,
    version: u64,
    global_rotation: i32,
    materialized: BTreeSet<usize>,
}

impl Default for LazyPages {
    fn default() -> Self {
        Self::new(DEFAULT_LAZY_MARGIN_PX)
    }
}

impl LazyPages {
    pub fn new(margin_px: f32) -> Self {
        Self { margin_px: margin_px.max(0.0), version: 0, global_rotation: 0, materialized: BTreeSet::new() }
    }

    pub fn margin_px(&self) -> f32 {
        self.margin_px
    }

    /// Resets the latch set if the document version or global rotation moved.
    pub fn sync(&mut self, version: u64, global_rotation: i32) {
        if self.version != version || self.global_rotation != global_rotation {
            self.version = version;
            self.global_rotation = global_rotation;
            self.materialized.clear();
        }
    }

    /// Latches every page intersecting the viewport grown by the margin.
    /// Returns the pages latched by this call.
    pub fn observe(&mut self, viewport: &ViewportState) -> Vec<usize> {
        let window_top = viewport.scroll_offset_px - self.margin_px;
        let window_bottom = viewport.scroll_offset_px + viewport.viewport_height_px + self.margin_px;

        let mut latched = Vec::new();
        for (index, top) in viewport.page_offsets().into_iter().enumerate() {
            let bottom = top + viewport.page_heights_px[index];
            if bottom >= window_top && top <= window_bottom && self.materialized.insert(index) {
                latched.push(index);
            }
        }

        latched
    }

    pub fn is_materialized(&self, visual_index: usize) -> bool {
        self.materialized.contains(&visual_index)
    }

    pub fn materialized(&self) -> impl Iterator<Item = usize> + '_ {
        self.materialized.iter().copied()
    }
}
