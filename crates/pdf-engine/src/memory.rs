//! In-memory document model speaking the `PdfBackend` contract.
//!
//! Documents serialize to JSON, so "bytes" stay inspectable. Used to exercise
//! editing logic without a PDF library in the loop.

use crate::{normalize_rotation, PageSize, PdfBackend, PdfEngineError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryPage {
    pub label: String,
    #[serde(default)]
    pub rotation: i32,
    #[serde(default)]
    pub size: PageSize,
}

impl MemoryPage {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into(), rotation: 0, size: PageSize::default() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub pages: Vec<MemoryPage>,
}

impl MemoryDocument {
    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { pages: labels.into_iter().map(MemoryPage::new).collect() }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfEngineError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, PdfEngineError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn labels(&self) -> Vec<&str> {
        self.pages.iter().map(|page| page.label.as_str()).collect()
    }

    pub fn rotations(&self) -> Vec<i32> {
        self.pages.iter().map(|page| page.rotation).collect()
    }

    fn page(&self, index: usize) -> Result<&MemoryPage, PdfEngineError> {
        self.pages
            .get(index)
            .ok_or(PdfEngineError::PageOutOfRange { page: index, page_count: self.pages.len() })
    }

    fn page_mut(&mut self, index: usize) -> Result<&mut MemoryPage, PdfEngineError> {
        let page_count = self.pages.len();
        self.pages.get_mut(index).ok_or(PdfEngineError::PageOutOfRange { page: index, page_count })
    }

    fn check_insert_index(&self, index: usize) -> Result<(), PdfEngineError> {
        if index > self.pages.len() {
            return Err(PdfEngineError::PageOutOfRange { page: index, page_count: self.pages.len() });
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryBackend;

impl PdfBackend for MemoryBackend {
    type Document = MemoryDocument;
    type Page = MemoryPage;

    fn load(&self, bytes: &[u8]) -> Result<MemoryDocument, PdfEngineError> {
        MemoryDocument::from_bytes(bytes)
    }

    fn create(&self) -> MemoryDocument {
        MemoryDocument::default()
    }

    fn page_count(&self, doc: &MemoryDocument) -> usize {
        doc.pages.len()
    }

    fn copy_pages(
        &self,
        _dst: &mut MemoryDocument,
        src: &MemoryDocument,
        indices: &[usize],
    ) -> Result<Vec<MemoryPage>, PdfEngineError> {
        indices.iter().map(|&index| src.page(index).cloned()).collect()
    }

    fn add_page(&self, doc: &mut MemoryDocument, page: MemoryPage) {
        doc.pages.push(page);
    }

    fn insert_page(
        &self,
        doc: &mut MemoryDocument,
        index: usize,
        page: MemoryPage,
    ) -> Result<(), PdfEngineError> {
        doc.check_insert_index(index)?;
        doc.pages.insert(index, page);
        Ok(())
    }

    fn insert_blank_page(
        &self,
        doc: &mut MemoryDocument,
        index: usize,
        size: PageSize,
    ) -> Result<(), PdfEngineError> {
        doc.check_insert_index(index)?;
        doc.pages.insert(index, MemoryPage { label: "blank".to_owned(), rotation: 0, size });
        Ok(())
    }

    fn remove_page(
        &self,
        doc: &mut MemoryDocument,
        index: usize,
    ) -> Result<MemoryPage, PdfEngineError> {
        doc.page(index)?;
        Ok(doc.pages.remove(index))
    }

    fn rotation(&self, doc: &MemoryDocument, index: usize) -> Result<i32, PdfEngineError> {
        Ok(doc.page(index)?.rotation)
    }

    fn set_rotation(
        &self,
        doc: &mut MemoryDocument,
        index: usize,
        degrees: i32,
    ) -> Result<(), PdfEngineError> {
        doc.page_mut(index)?.rotation = normalize_rotation(degrees);
        Ok(())
    }

    fn page_size(&self, doc: &MemoryDocument, index: usize) -> Result<PageSize, PdfEngineError> {
        Ok(doc.page(index)?.size)
    }

    fn save(&self, doc: &mut MemoryDocument) -> Result<Vec<u8>, PdfEngineError> {
        doc.to_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_round_trip_through_backend() {
        let bytes = MemoryDocument::with_labels(["a", "b"]).to_bytes().expect("serialize");
        let backend = MemoryBackend;

        let mut doc = backend.load(&bytes).expect("load should succeed");
        backend.set_rotation(&mut doc, 1, -90).expect("rotate");

        let saved = backend.save(&mut doc).expect("save should succeed");
        let reloaded = MemoryDocument::from_bytes(&saved).expect("reload");

        assert_eq!(reloaded.labels(), vec!["a", "b"]);
        assert_eq!(reloaded.rotations(), vec![0, 270]);
    }

    #[test]
    fn load_rejects_non_json_bytes() {
        let err = MemoryBackend.load(b"%PDF-1.7").expect_err("load should fail");
        assert!(matches!(err, PdfEngineError::Memory(_)));
    }
}
