use doc_model::ViewMode;

pub const CONTAINER_PADDING_PX: f32 = 32.0;
pub const MAX_PAGE_WIDTH_PX: f32 = 800.0;
pub const UNMEASURED_PAGE_WIDTH_PX: f32 = 600.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    pub mode: ViewMode,
    pub viewport_height_px: f32,
    pub scroll_offset_px: f32,
    pub page_heights_px: Vec<f32>,
    pub page_spacing_px: f32,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            mode: ViewMode::Continuous,
            viewport_height_px: 800.0,
            scroll_offset_px: 0.0,
            page_heights_px: vec![1000.0],
            page_spacing_px: 24.0,
        }
    }
}

impl ViewportState {
    /// Top edge of each page in scroll coordinates.
    pub fn page_offsets(&self) -> Vec<f32> {
        let mut cursor = 0.0;
        self.page_heights_px
            .iter()
            .map(|height| {
                let top = cursor;
                cursor += height + self.page_spacing_px;
                top
            })
            .collect()
    }

    /// Visual index of the page under the middle of the viewport. In
    /// single-page mode only `active_page` is shown, so that is returned.
    pub fn current_page(&self, active_page: usize) -> usize {
        let last = self.page_heights_px.len().saturating_sub(1);
        if self.mode == ViewMode::SinglePage {
            return active_page.min(last);
        }

        let center = (self.scroll_offset_px + self.viewport_height_px / 2.0).max(0.0);
        self.page_offsets()
            .into_iter()
            .zip(&self.page_heights_px)
            .position(|(top, height)| center <= top + height)
            .unwrap_or(last)
    }
}

/// Display width of a page: the container minus padding, capped, times scale.
/// Before the container has been measured a fixed width is used.
pub fn page_width(container_width_px: Option<f32>, scale: f32) -> f32 {
    match container_width_px {
        Some(width) if width > 0.0 => {
            (width - CONTAINER_PADDING_PX).clamp(0.0, MAX_PAGE_WIDTH_PX) * scale
        }
        _ => UNMEASURED_PAGE_WIDTH_PX,
    }
}

/// Height of a page shown at `width_px`, accounting for quarter-turn rotation.
pub fn page_height(width_pt: f32, height_pt: f32, rotation: i32, width_px: f32) -> f32 {
    if width_pt <= 0.0 || height_pt <= 0.0 {
        return 0.0;
    }

    let (shown_width, shown_height) = match rotation.rem_euclid(360) {
        90 | 270 => (height_pt, width_pt),
        _ => (width_pt, height_pt),
    };

    width_px * shown_height / shown_width
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_width_caps_and_scales_measured_container() {
        assert_eq!(page_width(Some(632.0), 1.0), 600.0);
        assert_eq!(page_width(Some(2000.0), 1.0), 800.0);
        assert_eq!(page_width(Some(2000.0), 1.5), 1200.0);
    }

    #[test]
    fn unmeasured_container_uses_fixed_width() {
        assert_eq!(page_width(None, 2.0), 600.0);
        assert_eq!(page_width(Some(0.0), 2.0), 600.0);
    }

    #[test]
    fn quarter_turns_swap_page_aspect() {
        assert_eq!(page_height(600.0, 800.0, 0, 300.0), 400.0);
        assert_eq!(page_height(600.0, 800.0, 90, 400.0), 300.0);
        assert_eq!(page_height(600.0, 800.0, -90, 400.0), 300.0);
    }

    fn stack(scroll_offset_px: f32) -> ViewportState {
        ViewportState {
            viewport_height_px: 1000.0,
            scroll_offset_px,
            page_heights_px: vec![1000.0, 1000.0, 1000.0],
            page_spacing_px: 100.0,
            ..ViewportState::default()
        }
    }

    #[test]
    fn current_page_sits_under_viewport_center() {
        assert_eq!(stack(0.0).current_page(0), 0);
        assert_eq!(stack(1200.0).current_page(0), 1);
        assert_eq!(stack(9000.0).current_page(0), 2);
    }

    #[test]
    fn center_in_page_gap_belongs_to_next_page() {
        assert_eq!(stack(540.0).current_page(0), 1);
    }

    #[test]
    fn single_page_mode_reports_clamped_active_page() {
        let state = ViewportState { mode: ViewMode::SinglePage, ..stack(0.0) };

        assert_eq!(state.current_page(1), 1);
        assert_eq!(state.current_page(7), 2);
    }

    #[test]
    fn empty_viewport_reports_first_page() {
        let state = ViewportState { page_heights_px: Vec::new(), ..stack(300.0) };

        assert_eq!(state.current_page(0), 0);
    }
}
