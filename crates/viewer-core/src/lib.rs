//! What to paint, not how: render plans, lazy visibility and viewport math
//! computed from the edit state. Pixel rendering belongs to the host.

mod lazy;
mod plan;
mod viewport;

pub use doc_model::ViewMode;
pub use lazy::{placeholder_height, LazyPages, DEFAULT_LAZY_MARGIN_PX, PLACEHOLDER_ASPECT};
pub use plan::{
    render_layers, render_plan, PageContent, PageKey, PageView, RenderLayers, ViewerInput,
};
pub use viewport::{
    page_height, page_width, ViewportState, CONTAINER_PADDING_PX, MAX_PAGE_WIDTH_PX,
    UNMEASURED_PAGE_WIDTH_PX,
};
