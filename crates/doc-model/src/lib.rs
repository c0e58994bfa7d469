use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

mod store;

pub use store::{EditStore, StoreEvent, SubscriptionId};

pub const MIN_SCALE: f32 = 0.25;
pub const MAX_SCALE: f32 = 4.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    #[default]
    Continuous,
    SinglePage,
}

/// Stable identity of a page: its index in the document as last committed.
///
/// Identities survive virtual reorders and are reassigned on every commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// Order is identity and no rotation is pending; the buffer is authoritative.
    Committed,
    /// The displayed pages differ from the buffer until the next commit.
    Virtual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualPage {
    pub visual_index: usize,
    pub page: PageId,
    pub rotation: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditState {
    pub document: Option<Arc<[u8]>>,
    pub page_count: usize,
    pub page_order: Vec<usize>,
    pub rotations: BTreeMap<PageId, i32>,
    pub selection: BTreeSet<usize>,
    pub active_page: usize,
    pub view_mode: ViewMode,
    pub scale: f32,
    pub global_rotation: i32,
    pub text_select_mode: bool,
    pub processing: bool,
    pub last_error: Option<String>,
    pub version: u64,
}

impl Default for EditState {
    fn default() -> Self {
        Self {
            document: None,
            page_count: 0,
            page_order: Vec::new(),
            rotations: BTreeMap::new(),
            selection: BTreeSet::new(),
            active_page: 0,
            view_mode: ViewMode::default(),
            scale: 1.0,
            global_rotation: 0,
            text_select_mode: false,
            processing: false,
            last_error: None,
            version: 0,
        }
    }
}

impl EditState {
    pub fn mode(&self) -> EditMode {
        if self.is_identity_order() && !self.has_pending_rotations() {
            EditMode::Committed
        } else {
            EditMode::Virtual
        }
    }

    pub fn is_identity_order(&self) -> bool {
        self.page_order.iter().enumerate().all(|(visual, &original)| visual == original)
    }

    pub fn has_pending_rotations(&self) -> bool {
        !self.rotations.is_empty()
    }

    /// Pending rotation of whatever page currently sits at `visual_index`.
    pub fn rotation_at(&self, visual_index: usize) -> i32 {
        self.page_order
            .get(visual_index)
            .and_then(|&original| self.rotations.get(&PageId(original)))
            .copied()
            .unwrap_or(0)
    }

    /// Pending rotations re-keyed by current visual position, zero entries omitted.
    pub fn rotations_by_visual_index(&self) -> BTreeMap<usize, i32> {
        self.page_order
            .iter()
            .enumerate()
            .filter_map(|(visual, &original)| {
                self.rotations.get(&PageId(original)).map(|&degrees| (visual, degrees))
            })
            .collect()
    }

    pub fn page_at(&self, visual_index: usize) -> Option<PageId> {
        self.page_order.get(visual_index).copied().map(PageId)
    }

    pub fn pages_for_render(&self) -> Vec<VisualPage> {
        self.page_order
            .iter()
            .enumerate()
            .map(|(visual_index, &original)| VisualPage {
                visual_index,
                page: PageId(original),
                rotation: self.rotations.get(&PageId(original)).copied().unwrap_or(0),
            })
            .collect()
    }

    pub fn clamped_active_page(&self) -> usize {
        self.active_page.min(self.page_count.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreAction {
    /// Installs a new committed buffer. Order and rotations reset to identity;
    /// selected positions past the new page count are dropped.
    ReplaceDocument { bytes: Arc<[u8]>, page_count: usize },
    /// Page count reported by a renderer after it loaded the buffer.
    SetPageCount(usize),
    SetPageOrder(Vec<usize>),
    SetRotation { page: PageId, degrees: i32 },
    ClearRotations,
    ToggleSelection { index: usize, additive: bool },
    SelectAll,
    DeselectAll,
    SetActivePage(usize),
    SetViewMode(ViewMode),
    SetScale(f32),
    SetGlobalRotation(i32),
    SetTextSelectMode(bool),
    SetProcessing(bool),
    SetError(Option<String>),
}

impl StoreAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReplaceDocument { .. } => "replace_document",
            Self::SetPageCount(_) => "set_page_count",
            Self::SetPageOrder(_) => "set_page_order",
            Self::SetRotation { .. } => "set_rotation",
            Self::ClearRotations => "clear_rotations",
            Self::ToggleSelection { .. } => "toggle_selection",
            Self::SelectAll => "select_all",
            Self::DeselectAll => "deselect_all",
            Self::SetActivePage(_) => "set_active_page",
            Self::SetViewMode(_) => "set_view_mode",
            Self::SetScale(_) => "set_scale",
            Self::SetGlobalRotation(_) => "set_global_rotation",
            Self::SetTextSelectMode(_) => "set_text_select_mode",
            Self::SetProcessing(_) => "set_processing",
            Self::SetError(_) => "set_error",
        }
    }
}

pub fn apply_action(state: &mut EditState, action: StoreAction) {
    match action {
        StoreAction::ReplaceDocument { bytes, page_count } => {
            state.document = Some(bytes);
            state.page_count = page_count;
            state.page_order = (0..page_count).collect();
            state.rotations.clear();
            state.selection.retain(|&index| index < page_count);
            state.active_page = state.clamped_active_page();
            state.version += 1;
        }
        StoreAction::SetPageCount(page_count) => {
            state.page_count = page_count;
            if state.page_order.len() != page_count {
                state.page_order = (0..page_count).collect();
                state.rotations.clear();
            }
            state.selection.retain(|&index| index < page_count);
            state.active_page = state.clamped_active_page();
        }
        StoreAction::SetPageOrder(order) => state.page_order = order,
        StoreAction::SetRotation { page, degrees } => {
            let degrees = degrees.rem_euclid(360);
            if degrees == 0 {
                state.rotations.remove(&page);
            } else {
                state.rotations.insert(page, degrees);
            }
        }
        StoreAction::ClearRotations => state.rotations.clear(),
        StoreAction::ToggleSelection { index, additive } => {
            if index >= state.page_count {
                log::warn!("ignoring selection of page {index} (page_count={})", state.page_count);
                return;
            }

            if additive {
                if !state.selection.remove(&index) {
                    state.selection.insert(index);
                }
            } else {
                state.selection = BTreeSet::from([index]);
            }
            state.active_page = index;
        }
        StoreAction::SelectAll => state.selection = (0..state.page_count).collect(),
        StoreAction::DeselectAll => state.selection.clear(),
        StoreAction::SetActivePage(index) => {
            state.active_page = index.min(state.page_count.saturating_sub(1));
        }
        StoreAction::SetViewMode(mode) => state.view_mode = mode,
        StoreAction::SetScale(scale) => state.scale = scale.clamp(MIN_SCALE, MAX_SCALE),
        StoreAction::SetGlobalRotation(degrees) => state.global_rotation = degrees.rem_euclid(360),
        StoreAction::SetTextSelectMode(enabled) => state.text_select_mode = enabled,
        StoreAction::SetProcessing(processing) => state.processing = processing,
        StoreAction::SetError(error) => state.last_error = error,
    }
}
