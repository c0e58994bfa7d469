//! Virtual edit controller.
//!
//! Reorders and rotations are pure store updates; the document buffer is only
//! rewritten by `save` or by the structural edits (delete, insert) that commit
//! pending edits before touching the bytes.

use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use doc_model::{EditMode, EditState, EditStore, PageId, StoreAction};
use pdf_engine::{
    compose_rotation, ensure_quarter_turn, InsertAt, LopdfBackend, PageOperations, PdfBackend,
};
use std::sync::Arc;

#[derive(Debug)]
pub struct Editor<B> {
    store: EditStore,
    operations: PageOperations<B>,
    config: EditorConfig,
}

impl Editor<LopdfBackend> {
    pub fn with_config(config: EditorConfig) -> Self {
        Self::new(LopdfBackend::new(), config)
    }
}

impl<B: PdfBackend> Editor<B> {
    pub fn new(backend: B, config: EditorConfig) -> Self {
        let operations = PageOperations::new(backend).with_blank_page(config.blank_page);
        Self { store: EditStore::new(), operations, config }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn operations(&self) -> &PageOperations<B> {
        &self.operations
    }

    pub fn store(&self) -> &EditStore {
        &self.store
    }

    /// View-state setters and subscriptions go through the store directly.
    pub fn store_mut(&mut self) -> &mut EditStore {
        &mut self.store
    }

    pub fn state(&self) -> &EditState {
        self.store.state()
    }

    pub fn mode(&self) -> EditMode {
        self.store.mode()
    }

    /// Loads `bytes` as the committed document. On failure the previous
    /// document stays open.
    pub fn open(&mut self, bytes: Vec<u8>) -> EditorResult<()> {
        self.with_processing("open document", |editor| {
            let page_count = editor.operations.page_count(&bytes)?;

            editor.store.dispatch(StoreAction::DeselectAll);
            editor.store.dispatch(StoreAction::SetActivePage(0));
            editor.store.dispatch(StoreAction::ReplaceDocument { bytes: bytes.into(), page_count });
            editor.store.dispatch(StoreAction::SetViewMode(editor.config.default_view_mode));

            log::debug!("opened document with {page_count} pages");
            Ok(())
        })
    }

    /// Stages `delta` degrees on every selected page. An empty selection is a
    /// no-op whatever the angle.
    pub fn rotate_selection(&mut self, delta: i32) -> EditorResult<()> {
        let state = self.store.state();
        if state.selection.is_empty() {
            return Ok(());
        }

        ensure_quarter_turn(delta)?;

        let updates: Vec<(PageId, i32)> = state
            .selection
            .iter()
            .filter_map(|&visual_index| match state.page_at(visual_index) {
                Some(page) => Some((page, compose_rotation(state.rotation_at(visual_index), delta))),
                None => {
                    log::warn!(
                        "ignoring rotation of page {visual_index} (page_count={})",
                        state.page_order.len()
                    );
                    None
                }
            })
            .collect();

        for (page, degrees) in updates {
            self.store.dispatch(StoreAction::SetRotation { page, degrees });
        }

        Ok(())
    }

    pub fn rotate_selection_clockwise(&mut self) -> EditorResult<()> {
        self.rotate_selection(self.config.rotation_step)
    }

    /// Moves the page shown at `from` so it is shown at `to`.
    pub fn move_visual_page(&mut self, from: usize, to: usize) -> EditorResult<()> {
        let page_count = self.store.state().page_order.len();
        if from >= page_count || to >= page_count {
            log::warn!("ignoring move {from} -> {to} (page_count={page_count})");
            return Ok(());
        }

        if from == to {
            return Ok(());
        }

        if self.config.commit_before_reorder && self.store.state().has_pending_rotations() {
            self.with_processing("save changes", Self::commit_pending)?;
        }

        let mut order = self.store.state().page_order.clone();
        let page = order.remove(from);
        order.insert(to, page);
        self.store.dispatch(StoreAction::SetPageOrder(order));

        log::debug!("moved visual page {from} -> {to}");
        Ok(())
    }

    /// Commits pending virtual edits and returns the resulting buffer.
    ///
    /// In committed mode this returns the current buffer untouched. On failure
    /// the pending edits are kept and `last_error` is set.
    pub fn save(&mut self) -> EditorResult<Arc<[u8]>> {
        self.with_processing("save changes", |editor| {
            editor.commit_pending()?;
            editor.current_bytes()
        })
    }

    /// Downloadable output: the committed bytes after flushing pending edits.
    pub fn document_bytes(&mut self) -> EditorResult<Vec<u8>> {
        Ok(self.save()?.to_vec())
    }

    /// Deletes the selected pages after `confirm(selected_count)` agrees.
    ///
    /// Returns whether anything was deleted.
    pub fn delete_selection(&mut self, confirm: impl FnOnce(usize) -> bool) -> EditorResult<bool> {
        self.ensure_idle()?;

        let state = self.store.state();
        if state.document.is_none() || state.selection.is_empty() {
            return Ok(false);
        }

        let targets: Vec<usize> = state.selection.iter().copied().collect();
        if !confirm(targets.len()) {
            log::info!("delete of {} pages declined", targets.len());
            return Ok(false);
        }

        self.with_processing("delete pages", |editor| {
            editor.commit_pending()?;

            let bytes = editor.current_bytes()?;
            let output = editor.operations.delete_pages(&bytes, &targets)?;
            editor.replace_document(output)?;
            editor.store.dispatch(StoreAction::DeselectAll);

            log::debug!("deleted pages {targets:?}");
            Ok(true)
        })
    }

    /// Inserts a blank page right after the active page and makes it active.
    ///
    /// Returns the visual index of the new page.
    pub fn insert_blank_after_active(&mut self) -> EditorResult<usize> {
        self.with_processing("insert blank page", |editor| {
            editor.commit_pending()?;

            let state = editor.store.state();
            let at = if state.page_count == 0 { 0 } else { state.clamped_active_page() + 1 };

            let bytes = editor.current_bytes()?;
            let output = editor.operations.add_blank_page(&bytes, InsertAt::Index(at))?;
            editor.replace_document(output)?;
            editor.store.dispatch(StoreAction::DeselectAll);
            editor.store.dispatch(StoreAction::SetActivePage(at));

            log::debug!("inserted blank page at {at}");
            Ok(at)
        })
    }

    pub fn toggle_selection(&mut self, visual_index: usize, additive: bool) {
        self.store.dispatch(StoreAction::ToggleSelection { index: visual_index, additive });
    }

    pub fn select_all(&mut self) {
        self.store.dispatch(StoreAction::SelectAll);
    }

    pub fn deselect_all(&mut self) {
        self.store.dispatch(StoreAction::DeselectAll);
    }

    pub fn set_active_page(&mut self, visual_index: usize) {
        self.store.dispatch(StoreAction::SetActivePage(visual_index));
    }

    /// Drops pending reorders and rotations without touching the buffer.
    pub fn discard_changes(&mut self) {
        let page_count = self.store.state().page_count;
        self.store.dispatch(StoreAction::SetPageOrder((0..page_count).collect()));
        self.store.dispatch(StoreAction::ClearRotations);
    }

    fn ensure_idle(&self) -> EditorResult<()> {
        if self.store.state().processing {
            return Err(EditorError::Busy);
        }

        Ok(())
    }

    fn current_bytes(&self) -> EditorResult<Arc<[u8]>> {
        self.store.state().document.clone().ok_or(EditorError::NoDocument)
    }

    fn commit_pending(&mut self) -> EditorResult<()> {
        let bytes = self.current_bytes()?;
        if self.store.mode() == EditMode::Committed {
            return Ok(());
        }

        let state = self.store.state();
        let rotations = state.rotations_by_visual_index();
        let output = self.operations.commit_order_and_rotations(&bytes, &state.page_order, &rotations)?;

        self.replace_document(output)
    }

    fn replace_document(&mut self, bytes: Vec<u8>) -> EditorResult<()> {
        let page_count = self.operations.page_count(&bytes)?;
        self.store.dispatch(StoreAction::ReplaceDocument { bytes: bytes.into(), page_count });
        Ok(())
    }

    /// Runs an engine-backed operation with the processing flag set.
    ///
    /// Rejects with `Busy` if another operation holds the flag. The flag is
    /// cleared whatever the outcome; failures are logged and kept as
    /// `last_error`.
    fn with_processing<T>(
        &mut self,
        label: &str,
        operation: impl FnOnce(&mut Self) -> EditorResult<T>,
    ) -> EditorResult<T> {
        self.ensure_idle()?;

        self.store.dispatch(StoreAction::SetProcessing(true));
        let result = operation(self);
        self.store.dispatch(StoreAction::SetProcessing(false));

        match &result {
            Ok(_) if self.store.state().last_error.is_some() => {
                self.store.dispatch(StoreAction::SetError(None));
            }
            Ok(_) => {}
            Err(error) => {
                log::error!("{label} failed: {error}");
                self.store.dispatch(StoreAction::SetError(Some(format!("Failed to {label}: {error}"))));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_model::ViewMode;
    use pdf_engine::fixtures::sample_pdf;
    use pdf_engine::{MemoryBackend, MemoryDocument, PdfEngineError};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn memory_editor(labels: &[&str]) -> Editor<MemoryBackend> {
        memory_editor_with(labels, EditorConfig::default())
    }

    fn memory_editor_with(labels: &[&str], config: EditorConfig) -> Editor<MemoryBackend> {
        let bytes = MemoryDocument::with_labels(labels.iter().copied()).to_bytes().expect("serialize");
        let mut editor = Editor::new(MemoryBackend, config);
        editor.open(bytes).expect("open should succeed");
        editor
    }

    fn committed(editor: &Editor<MemoryBackend>) -> MemoryDocument {
        let bytes = editor.state().document.clone().expect("document expected");
        MemoryDocument::from_bytes(&bytes).expect("memory document")
    }

    #[test]
    fn rotate_then_save_commits_rotation_in_place() {
        let mut editor = memory_editor(&["a", "b", "c"]);
        editor.toggle_selection(1, false);

        editor.rotate_selection(90).expect("rotate");
        assert_eq!(editor.mode(), EditMode::Virtual);
        editor.save().expect("save");

        let doc = committed(&editor);
        assert_eq!(doc.rotations(), vec![0, 90, 0]);
        assert_eq!(doc.labels(), vec!["a", "b", "c"]);
        assert_eq!(editor.state().page_order, vec![0, 1, 2]);
        assert_eq!(editor.mode(), EditMode::Committed);
    }

    #[test]
    fn rotation_accumulates_across_calls() {
        let mut editor = memory_editor(&["a", "b"]);
        editor.toggle_selection(0, false);

        editor.rotate_selection(270).expect("rotate");
        editor.rotate_selection_clockwise().expect("rotate");
        assert!(!editor.state().has_pending_rotations());

        editor.rotate_selection(180).expect("rotate");
        assert_eq!(editor.state().rotation_at(0), 180);
    }

    #[test]
    fn rotate_without_selection_is_noop() {
        let mut editor = memory_editor(&["a", "b"]);
        let version = editor.state().version;

        editor.rotate_selection(90).expect("rotate");
        editor.rotate_selection(45).expect("partial turn with nothing selected");

        assert_eq!(editor.mode(), EditMode::Committed);
        assert_eq!(editor.state().version, version);
        assert!(editor.state().last_error.is_none());
    }

    #[test]
    fn huge_quarter_turn_wraps_into_range() {
        let mut editor = memory_editor(&["a"]);
        editor.toggle_selection(0, false);

        editor.rotate_selection(90).expect("rotate");
        editor.rotate_selection(2_147_483_610).expect("rotate");
        assert_eq!(editor.state().rotation_at(0), 180);

        editor.save().expect("save");
        assert_eq!(committed(&editor).rotations(), vec![180]);
    }

    #[test]
    fn rotate_rejects_partial_turn() {
        let mut editor = memory_editor(&["a"]);
        editor.toggle_selection(0, false);

        let err = editor.rotate_selection(30).expect_err("should fail");

        assert!(matches!(err, EditorError::Engine(PdfEngineError::InvalidRotation(30))));
    }

    #[test]
    fn move_is_virtual_and_leaves_buffer_untouched() {
        let mut editor = memory_editor(&["a", "b", "c", "d", "e"]);
        let before = editor.state().document.clone().expect("document");

        editor.move_visual_page(4, 0).expect("move");

        assert_eq!(editor.state().page_order, vec![4, 0, 1, 2, 3]);
        assert_eq!(editor.mode(), EditMode::Virtual);
        let after = editor.state().document.clone().expect("document");
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn move_then_save_commits_order_and_resets_to_identity() {
        let mut editor = memory_editor(&["a", "b", "c", "d", "e"]);

        editor.move_visual_page(4, 0).expect("move");
        editor.move_visual_page(1, 3).expect("move");
        editor.save().expect("save");

        assert_eq!(committed(&editor).labels(), vec!["e", "b", "c", "a", "d"]);
        assert_eq!(editor.state().page_order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_move_is_ignored() {
        let mut editor = memory_editor(&["a", "b"]);

        editor.move_visual_page(2, 0).expect("move");
        editor.move_visual_page(0, 9).expect("move");

        assert_eq!(editor.mode(), EditMode::Committed);
    }

    #[test]
    fn pending_rotation_follows_page_through_move() {
        let mut editor = memory_editor(&["a", "b", "c", "d", "e"]);
        let version = editor.state().version;
        editor.toggle_selection(2, false);
        editor.rotate_selection(90).expect("rotate");

        editor.move_visual_page(4, 0).expect("move");

        assert!(!editor.config().commit_before_reorder);
        assert_eq!(editor.state().version, version);
        assert_eq!(editor.state().page_order, vec![4, 0, 1, 2, 3]);
        assert_eq!(editor.state().rotation_at(3), 90);

        editor.save().expect("save");
        let doc = committed(&editor);
        assert_eq!(doc.labels(), vec!["e", "a", "b", "c", "d"]);
        assert_eq!(doc.rotations(), vec![0, 0, 0, 90, 0]);
    }

    #[test]
    fn commit_before_reorder_saves_pending_rotation_first() {
        let config = EditorConfig::default().with_commit_before_reorder(true);
        let mut editor = memory_editor_with(&["a", "b", "c", "d", "e"], config);
        let version = editor.state().version;
        editor.toggle_selection(2, false);
        editor.rotate_selection(90).expect("rotate");

        editor.move_visual_page(4, 0).expect("move");

        assert_eq!(editor.state().version, version + 1);
        assert!(!editor.state().has_pending_rotations());
        assert_eq!(committed(&editor).rotations(), vec![0, 0, 90, 0, 0]);
        assert_eq!(editor.state().page_order, vec![4, 0, 1, 2, 3]);

        editor.save().expect("save");
        let doc = committed(&editor);
        assert_eq!(doc.labels(), vec!["e", "a", "b", "c", "d"]);
        assert_eq!(doc.rotations(), vec![0, 0, 0, 90, 0]);
    }

    #[test]
    fn failed_save_keeps_pending_edits_and_reports_error() {
        let mut editor = Editor::new(MemoryBackend, EditorConfig::default());
        editor
            .store_mut()
            .dispatch(StoreAction::ReplaceDocument { bytes: Arc::from(&b"not json"[..]), page_count: 3 });
        editor.move_visual_page(2, 0).expect("move");

        let err = editor.save().expect_err("save should fail");

        assert!(matches!(err, EditorError::Engine(PdfEngineError::Memory(_))));
        assert_eq!(editor.state().page_order, vec![2, 0, 1]);
        assert!(!editor.state().processing);
        let message = editor.state().last_error.clone().expect("error recorded");
        assert!(message.starts_with("Failed to save changes"));
    }

    #[test]
    fn successful_operation_clears_previous_error() {
        let mut editor = memory_editor(&["a"]);
        editor.open(b"broken".to_vec()).expect_err("open should fail");
        assert!(editor.state().last_error.is_some());
        assert_eq!(committed(&editor).labels(), vec!["a"]);

        editor.save().expect("save");

        assert!(editor.state().last_error.is_none());
    }

    #[test]
    fn engine_operations_are_rejected_while_processing() {
        let mut editor = memory_editor(&["a", "b"]);
        editor.toggle_selection(0, false);
        editor.store_mut().dispatch(StoreAction::SetProcessing(true));

        assert!(matches!(editor.save(), Err(EditorError::Busy)));
        assert!(matches!(editor.insert_blank_after_active(), Err(EditorError::Busy)));

        let asked = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&asked);
        let result = editor.delete_selection(move |_| {
            *flag.borrow_mut() = true;
            true
        });

        assert!(matches!(result, Err(EditorError::Busy)));
        assert!(!*asked.borrow());
        assert!(editor.state().processing);
    }

    #[test]
    fn save_toggles_processing_around_the_commit() {
        let mut editor = memory_editor(&["a", "b"]);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        editor.store_mut().subscribe(move |event| sink.borrow_mut().push(event.action));
        editor.move_visual_page(1, 0).expect("move");

        editor.save().expect("save");

        assert_eq!(
            *seen.borrow(),
            vec!["set_page_order", "set_processing", "replace_document", "set_processing"]
        );
    }

    #[test]
    fn declined_delete_changes_nothing() {
        let mut editor = memory_editor(&["a", "b", "c"]);
        editor.toggle_selection(0, false);
        editor.toggle_selection(2, true);
        let version = editor.state().version;

        let deleted = editor
            .delete_selection(|count| {
                assert_eq!(count, 2);
                false
            })
            .expect("delete");

        assert!(!deleted);
        assert_eq!(editor.state().version, version);
        assert_eq!(editor.state().selection.len(), 2);
    }

    #[test]
    fn delete_without_selection_does_not_ask() {
        let mut editor = memory_editor(&["a"]);

        let deleted = editor.delete_selection(|_| panic!("should not ask")).expect("delete");

        assert!(!deleted);
    }

    #[test]
    fn delete_commits_virtual_order_before_removing() {
        let mut editor = memory_editor(&["a", "b", "c", "d", "e"]);
        editor.move_visual_page(4, 0).expect("move");
        editor.toggle_selection(0, false);
        editor.toggle_selection(2, true);

        let deleted = editor.delete_selection(|_| true).expect("delete");

        assert!(deleted);
        assert_eq!(committed(&editor).labels(), vec!["a", "c", "d"]);
        assert!(editor.state().selection.is_empty());
        assert_eq!(editor.state().page_count, 3);
    }

    #[test]
    fn insert_places_blank_after_active_and_activates_it() {
        let mut editor = memory_editor(&["a", "b", "c"]);
        editor.set_active_page(1);

        let at = editor.insert_blank_after_active().expect("insert");

        assert_eq!(at, 2);
        assert_eq!(committed(&editor).labels(), vec!["a", "b", "blank", "c"]);
        assert_eq!(editor.state().active_page, 2);
    }

    #[test]
    fn insert_commits_pending_rotation_first() {
        let mut editor = memory_editor(&["a", "b"]);
        editor.toggle_selection(1, false);
        editor.rotate_selection(90).expect("rotate");

        editor.insert_blank_after_active().expect("insert");

        let doc = committed(&editor);
        assert_eq!(doc.labels(), vec!["a", "b", "blank"]);
        assert_eq!(doc.rotations(), vec![0, 90, 0]);
    }

    #[test]
    fn operations_without_document_fail() {
        let mut editor = Editor::new(MemoryBackend, EditorConfig::default());

        assert!(matches!(editor.save(), Err(EditorError::NoDocument)));
        assert!(matches!(editor.insert_blank_after_active(), Err(EditorError::NoDocument)));
        assert!(!editor.delete_selection(|_| true).expect("delete"));
    }

    #[test]
    fn discard_drops_virtual_edits() {
        let mut editor = memory_editor(&["a", "b", "c"]);
        editor.toggle_selection(0, false);
        editor.rotate_selection(90).expect("rotate");
        editor.move_visual_page(0, 2).expect("move");

        editor.discard_changes();

        assert_eq!(editor.mode(), EditMode::Committed);
        assert_eq!(committed(&editor).rotations(), vec![0, 0, 0]);
    }

    #[test]
    fn open_applies_configured_view_mode_and_resets_selection() {
        let config = EditorConfig::default().with_default_view_mode(ViewMode::SinglePage);
        let mut editor = memory_editor_with(&["a", "b"], config);
        editor.select_all();

        let bytes = MemoryDocument::with_labels(["x"]).to_bytes().expect("serialize");
        editor.open(bytes).expect("open");

        assert_eq!(editor.state().view_mode, ViewMode::SinglePage);
        assert!(editor.state().selection.is_empty());
        assert_eq!(editor.state().page_count, 1);
    }

    #[test]
    fn lopdf_editor_commits_virtual_edits_into_pdf() {
        let mut editor = Editor::with_config(EditorConfig::default());
        editor.open(sample_pdf(3)).expect("open");
        editor.toggle_selection(1, false);
        editor.rotate_selection(90).expect("rotate");
        editor.move_visual_page(2, 0).expect("move");

        let bytes = editor.document_bytes().expect("export");

        let ops = editor.operations();
        let widths: Vec<f32> =
            ops.page_sizes(&bytes).expect("sizes").into_iter().map(|size| size.width_pt).collect();
        assert_eq!(widths, vec![620.0, 600.0, 610.0]);
        assert_eq!(ops.page_rotations(&bytes).expect("rotations"), vec![0, 0, 90]);
    }
}
