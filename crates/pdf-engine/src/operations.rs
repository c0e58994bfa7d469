use crate::{compose_rotation, ensure_quarter_turn, PageSize, PdfBackend, PdfEngineError};
use std::collections::{BTreeMap, BTreeSet};

/// Where `add_blank_page` puts the new page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertAt {
    End,
    Index(usize),
}

impl InsertAt {
    /// Maps the conventional `-1` "append" sentinel (any negative value) to `End`.
    pub fn from_sentinel(index: i64) -> Self {
        if index < 0 {
            Self::End
        } else {
            Self::Index(index as usize)
        }
    }
}

/// Byte-in, byte-out page mutations.
///
/// Every operation loads the input, applies one mutation and serializes a new
/// buffer; the input is never modified. Out-of-range indices are skipped with a
/// warning, and an operation left with nothing valid to do returns its input
/// unchanged.
#[derive(Debug, Clone)]
pub struct PageOperations<B> {
    backend: B,
    blank_page: PageSize,
}

impl<B: PdfBackend> PageOperations<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, blank_page: PageSize::default() }
    }

    pub fn with_blank_page(mut self, size: PageSize) -> Self {
        self.blank_page = size;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn blank_page(&self) -> PageSize {
        self.blank_page
    }

    pub fn page_count(&self, bytes: &[u8]) -> Result<usize, PdfEngineError> {
        let doc = self.backend.load(bytes)?;
        Ok(self.backend.page_count(&doc))
    }

    pub fn page_rotations(&self, bytes: &[u8]) -> Result<Vec<i32>, PdfEngineError> {
        let doc = self.backend.load(bytes)?;
        (0..self.backend.page_count(&doc)).map(|index| self.backend.rotation(&doc, index)).collect()
    }

    pub fn page_sizes(&self, bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        let doc = self.backend.load(bytes)?;
        (0..self.backend.page_count(&doc)).map(|index| self.backend.page_size(&doc, index)).collect()
    }

    /// Removes the pages at `indices`, highest index first so earlier removals
    /// never shift a page that is still waiting to be removed.
    pub fn delete_pages(&self, bytes: &[u8], indices: &[usize]) -> Result<Vec<u8>, PdfEngineError> {
        let mut doc = self.backend.load(bytes)?;
        let targets = valid_indices(indices, self.backend.page_count(&doc), "delete");

        if targets.is_empty() {
            return Ok(bytes.to_vec());
        }

        for &index in targets.iter().rev() {
            self.backend.remove_page(&mut doc, index)?;
        }

        log::debug!("deleted {} pages", targets.len());
        self.backend.save(&mut doc)
    }

    pub fn add_blank_page(&self, bytes: &[u8], at: InsertAt) -> Result<Vec<u8>, PdfEngineError> {
        let mut doc = self.backend.load(bytes)?;
        let page_count = self.backend.page_count(&doc);

        let index = match at {
            InsertAt::End => page_count,
            InsertAt::Index(index) if index <= page_count => index,
            InsertAt::Index(index) => {
                log::warn!("ignoring blank page insert at {index} (page_count={page_count})");
                return Ok(bytes.to_vec());
            }
        };

        self.backend.insert_blank_page(&mut doc, index, self.blank_page)?;

        log::debug!("inserted blank page at {index}");
        self.backend.save(&mut doc)
    }

    /// Sets each listed page's absolute rotation to `(current + delta) mod 360`.
    ///
    /// Indices are treated as a set: listing a page twice rotates it once.
    pub fn rotate_pages(
        &self,
        bytes: &[u8],
        indices: &[usize],
        delta: i32,
    ) -> Result<Vec<u8>, PdfEngineError> {
        ensure_quarter_turn(delta)?;

        let mut doc = self.backend.load(bytes)?;
        let targets = valid_indices(indices, self.backend.page_count(&doc), "rotate");

        if targets.is_empty() {
            return Ok(bytes.to_vec());
        }

        for &index in &targets {
            let current = self.backend.rotation(&doc, index)?;
            self.backend.set_rotation(&mut doc, index, compose_rotation(current, delta))?;
        }

        log::debug!("rotated {} pages by {delta}", targets.len());
        self.backend.save(&mut doc)
    }

    pub fn reorder_page(
        &self,
        bytes: &[u8],
        from_index: usize,
        to_index: usize,
    ) -> Result<Vec<u8>, PdfEngineError> {
        let mut doc = self.backend.load(bytes)?;
        let page_count = self.backend.page_count(&doc);

        if from_index >= page_count || to_index >= page_count {
            log::warn!(
                "ignoring reorder {from_index} -> {to_index} (page_count={page_count})"
            );
            return Ok(bytes.to_vec());
        }

        if from_index == to_index {
            return Ok(bytes.to_vec());
        }

        let page = self.backend.remove_page(&mut doc, from_index)?;
        self.backend.insert_page(&mut doc, to_index, page)?;

        log::debug!("moved page {from_index} -> {to_index}");
        self.backend.save(&mut doc)
    }

    /// Materializes a virtual page order and pending rotations into a new document.
    ///
    /// `order[i]` is the source page shown at visual position `i`; `rotations`
    /// is keyed by visual position and added to whatever rotation the source
    /// page already carries.
    pub fn commit_order_and_rotations(
        &self,
        bytes: &[u8],
        order: &[usize],
        rotations: &BTreeMap<usize, i32>,
    ) -> Result<Vec<u8>, PdfEngineError> {
        let source = self.backend.load(bytes)?;
        let page_count = self.backend.page_count(&source);

        if !is_permutation(order, page_count) {
            return Err(PdfEngineError::InvalidOrder { order: order.to_vec(), page_count });
        }

        for &delta in rotations.values() {
            ensure_quarter_turn(delta)?;
        }

        for &visual_index in rotations.keys().filter(|&&index| index >= page_count) {
            log::warn!("ignoring rotation for visual index {visual_index} (page_count={page_count})");
        }

        let mut target = self.backend.create();
        let pages = self.backend.copy_pages(&mut target, &source, order)?;

        for (visual_index, page) in pages.into_iter().enumerate() {
            self.backend.add_page(&mut target, page);

            let delta = rotations.get(&visual_index).copied().unwrap_or(0);
            if delta != 0 {
                let current = self.backend.rotation(&target, visual_index)?;
                self.backend.set_rotation(&mut target, visual_index, compose_rotation(current, delta))?;
            }
        }

        log::debug!("committed {page_count} pages with {} rotations", rotations.len());
        self.backend.save(&mut target)
    }
}

fn valid_indices(indices: &[usize], page_count: usize, operation: &str) -> BTreeSet<usize> {
    indices
        .iter()
        .copied()
        .filter(|&index| {
            let valid = index < page_count;
            if !valid {
                log::warn!("ignoring {operation} of page {index} (page_count={page_count})");
            }
            valid
        })
        .collect()
}

fn is_permutation(order: &[usize], page_count: usize) -> bool {
    if order.len() != page_count {
        return false;
    }

    let mut seen = vec![false; page_count];
    order.iter().all(|&index| index < page_count && !std::mem::replace(&mut seen[index], true))
}
