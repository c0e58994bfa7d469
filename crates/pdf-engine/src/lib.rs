//! Page-level PDF mutations behind a narrow backend seam.
//!
//! `PdfBackend` mirrors the handful of library capabilities the editor needs
//! (load, copy, insert, remove, rotate, serialize). `PageOperations` builds the
//! byte-in/byte-out page operations on top of any backend.

use serde::{Deserialize, Serialize};

mod lopdf_backend;
pub mod memory;
mod operations;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use lopdf_backend::{LopdfBackend, LopdfDocument};
pub use memory::{MemoryBackend, MemoryDocument, MemoryPage};
pub use operations::{InsertAt, PageOperations};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub const A4: Self = Self { width_pt: 595.28, height_pt: 841.89 };
    pub const LETTER: Self = Self { width_pt: 612.0, height_pt: 792.0 };
}

impl Default for PageSize {
    fn default() -> Self {
        Self::A4
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no page tree")]
    MissingPageTree,
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: usize, page_count: usize },
    #[error("page order {order:?} is not a permutation of 0..{page_count}")]
    InvalidOrder { order: Vec<usize>, page_count: usize },
    #[error("rotation of {0} degrees is not a multiple of 90")]
    InvalidRotation(i32),
    #[error("in-memory document error: {0}")]
    Memory(#[from] serde_json::Error),
}

/// Library capabilities consumed by `PageOperations`.
///
/// Page indices are zero-based positions in the document's current page
/// sequence. Backends report out-of-range indices as errors; the lenient
/// ignore-and-warn policy lives one level up in `PageOperations`.
pub trait PdfBackend {
    type Document;
    type Page;

    fn load(&self, bytes: &[u8]) -> Result<Self::Document, PdfEngineError>;
    fn create(&self) -> Self::Document;
    fn page_count(&self, doc: &Self::Document) -> usize;

    /// Copies pages out of `src` into `dst` without attaching them to its page
    /// sequence. Attach the returned handles with `add_page`/`insert_page`.
    fn copy_pages(
        &self,
        dst: &mut Self::Document,
        src: &Self::Document,
        indices: &[usize],
    ) -> Result<Vec<Self::Page>, PdfEngineError>;

    fn add_page(&self, doc: &mut Self::Document, page: Self::Page);
    fn insert_page(
        &self,
        doc: &mut Self::Document,
        index: usize,
        page: Self::Page,
    ) -> Result<(), PdfEngineError>;
    fn insert_blank_page(
        &self,
        doc: &mut Self::Document,
        index: usize,
        size: PageSize,
    ) -> Result<(), PdfEngineError>;
    fn remove_page(
        &self,
        doc: &mut Self::Document,
        index: usize,
    ) -> Result<Self::Page, PdfEngineError>;

    fn rotation(&self, doc: &Self::Document, index: usize) -> Result<i32, PdfEngineError>;
    fn set_rotation(
        &self,
        doc: &mut Self::Document,
        index: usize,
        degrees: i32,
    ) -> Result<(), PdfEngineError>;
    fn page_size(&self, doc: &Self::Document, index: usize) -> Result<PageSize, PdfEngineError>;

    fn save(&self, doc: &mut Self::Document) -> Result<Vec<u8>, PdfEngineError>;
}

pub fn normalize_rotation(degrees: i32) -> i32 {
    degrees.rem_euclid(360)
}

/// Rotation after turning a page at `current` by `delta`, in `[0, 360)`.
/// Both inputs are reduced first so any `i32` pair is accepted.
pub fn compose_rotation(current: i32, delta: i32) -> i32 {
    normalize_rotation(normalize_rotation(current) + normalize_rotation(delta))
}

pub fn ensure_quarter_turn(degrees: i32) -> Result<i32, PdfEngineError> {
    if degrees % 90 != 0 {
        return Err(PdfEngineError::InvalidRotation(degrees));
    }

    Ok(degrees)
}

pub fn default_operations() -> PageOperations<LopdfBackend> {
    PageOperations::new(LopdfBackend::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_normalizes_into_single_turn() {
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(360), 0);
    }

    #[test]
    fn composing_extreme_turns_stays_in_range() {
        assert_eq!(compose_rotation(90, 2_147_483_610), 180);
        assert_eq!(compose_rotation(i32::MIN, i32::MIN), 104);
        assert_eq!(compose_rotation(270, -90), 180);
    }

    #[test]
    fn quarter_turn_check_rejects_odd_angles() {
        assert_eq!(ensure_quarter_turn(-270).expect("valid angle"), -270);
        assert!(matches!(ensure_quarter_turn(45), Err(PdfEngineError::InvalidRotation(45))));
    }

    #[test]
    fn default_blank_page_is_a4() {
        assert_eq!(PageSize::default(), PageSize::A4);
    }
}
