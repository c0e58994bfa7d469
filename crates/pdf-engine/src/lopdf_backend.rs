use crate::{normalize_rotation, PageSize, PdfBackend, PdfEngineError};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// A loaded document with its page tree flattened into an ordered list.
///
/// Page-sequence edits only touch `pages`; the flat `Pages` node is rebuilt
/// from it on save.
#[derive(Debug, Clone)]
pub struct LopdfDocument {
    inner: Document,
    pages_id: ObjectId,
    pages: Vec<ObjectId>,
}

impl LopdfDocument {
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    pub fn page_ids(&self) -> &[ObjectId] {
        &self.pages
    }

    fn page_id(&self, index: usize) -> Result<ObjectId, PdfEngineError> {
        self.pages
            .get(index)
            .copied()
            .ok_or(PdfEngineError::PageOutOfRange { page: index, page_count: self.pages.len() })
    }

    fn page_dict(&self, index: usize) -> Result<&Dictionary, PdfEngineError> {
        Ok(self.inner.get_dictionary(self.page_id(index)?)?)
    }

    fn page_dict_mut(&mut self, index: usize) -> Result<&mut Dictionary, PdfEngineError> {
        let page_id = self.page_id(index)?;
        Ok(self.inner.get_object_mut(page_id)?.as_dict_mut()?)
    }

    fn check_insert_index(&self, index: usize) -> Result<(), PdfEngineError> {
        if index > self.pages.len() {
            return Err(PdfEngineError::PageOutOfRange { page: index, page_count: self.pages.len() });
        }

        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for LopdfBackend {
    type Document = LopdfDocument;
    type Page = ObjectId;

    fn load(&self, bytes: &[u8]) -> Result<LopdfDocument, PdfEngineError> {
        let mut inner = Document::load_mem(bytes)?;
        if inner.is_encrypted() {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let pages_id = root_pages_id(&inner)?;
        let pages: Vec<ObjectId> = inner.get_pages().into_values().collect();

        for &page_id in &pages {
            flatten_inherited(&mut inner, page_id)?;
        }

        log::debug!("loaded PDF with {} pages", pages.len());

        Ok(LopdfDocument { inner, pages_id, pages })
    }

    fn create(&self) -> LopdfDocument {
        let mut inner = Document::with_version("1.7");
        let pages_id = inner.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = inner.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        inner.trailer.set("Root", catalog_id);

        LopdfDocument { inner, pages_id, pages: Vec::new() }
    }

    fn page_count(&self, doc: &LopdfDocument) -> usize {
        doc.pages.len()
    }

    fn copy_pages(
        &self,
        dst: &mut LopdfDocument,
        src: &LopdfDocument,
        indices: &[usize],
    ) -> Result<Vec<ObjectId>, PdfEngineError> {
        let source_pages =
            indices.iter().map(|&index| src.page_id(index)).collect::<Result<Vec<_>, _>>()?;

        let highest_id = dst.inner.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
        let offset = highest_id.max(dst.inner.max_id);
        let source_catalog = src.inner.trailer.get(b"Root").and_then(Object::as_reference).ok();
        let mut max_id = offset;

        // Catalog and page-tree nodes stay behind; copied pages are re-parented on save.
        for (&(id, generation), object) in &src.inner.objects {
            if Some((id, generation)) == source_catalog || is_page_tree_node(object) {
                continue;
            }

            let mut object = object.clone();
            shift_references(&mut object, offset);
            dst.inner.objects.insert((id + offset, generation), object);
            max_id = max_id.max(id + offset);
        }

        dst.inner.max_id = max_id;

        Ok(source_pages.into_iter().map(|(id, generation)| (id + offset, generation)).collect())
    }

    fn add_page(&self, doc: &mut LopdfDocument, page: ObjectId) {
        doc.pages.push(page);
    }

    fn insert_page(
        &self,
        doc: &mut LopdfDocument,
        index: usize,
        page: ObjectId,
    ) -> Result<(), PdfEngineError> {
        doc.check_insert_index(index)?;
        doc.pages.insert(index, page);
        Ok(())
    }

    fn insert_blank_page(
        &self,
        doc: &mut LopdfDocument,
        index: usize,
        size: PageSize,
    ) -> Result<(), PdfEngineError> {
        doc.check_insert_index(index)?;

        let content_id = doc.inner.add_object(Stream::new(Dictionary::new(), Vec::new()));
        let media_box = vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::from(size.width_pt),
            Object::from(size.height_pt),
        ];
        let page_id = doc.inner.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => doc.pages_id,
            "MediaBox" => media_box,
            "Resources" => Dictionary::new(),
            "Contents" => content_id,
        });

        doc.pages.insert(index, page_id);
        Ok(())
    }

    fn remove_page(
        &self,
        doc: &mut LopdfDocument,
        index: usize,
    ) -> Result<ObjectId, PdfEngineError> {
        doc.page_id(index)?;
        Ok(doc.pages.remove(index))
    }

    fn rotation(&self, doc: &LopdfDocument, index: usize) -> Result<i32, PdfEngineError> {
        let rotation = doc
            .page_dict(index)?
            .get(b"Rotate")
            .and_then(Object::as_i64)
            .map(|degrees| normalize_rotation(degrees as i32))
            .unwrap_or(0);

        Ok(rotation)
    }

    fn set_rotation(
        &self,
        doc: &mut LopdfDocument,
        index: usize,
        degrees: i32,
    ) -> Result<(), PdfEngineError> {
        let degrees = normalize_rotation(degrees);
        let page = doc.page_dict_mut(index)?;

        if degrees == 0 {
            page.remove(b"Rotate");
        } else {
            page.set("Rotate", degrees as i64);
        }

        Ok(())
    }

    fn page_size(&self, doc: &LopdfDocument, index: usize) -> Result<PageSize, PdfEngineError> {
        let size = doc
            .page_dict(index)?
            .get(b"MediaBox")
            .ok()
            .and_then(|obj| obj.as_array().ok())
            .and_then(|array| {
                if array.len() != 4 {
                    return None;
                }
                let x0 = array[0].as_float().ok()?;
                let y0 = array[1].as_float().ok()?;
                let x1 = array[2].as_float().ok()?;
                let y1 = array[3].as_float().ok()?;
                Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
            })
            .unwrap_or(PageSize::LETTER);

        Ok(size)
    }

    fn save(&self, doc: &mut LopdfDocument) -> Result<Vec<u8>, PdfEngineError> {
        let pages_id = doc.pages_id;

        for &page_id in &doc.pages {
            doc.inner.get_object_mut(page_id)?.as_dict_mut()?.set("Parent", pages_id);
        }

        let kids: Vec<Object> = doc.pages.iter().map(|&id| Object::Reference(id)).collect();
        let count = doc.pages.len() as i64;
        let pages = doc.inner.get_object_mut(pages_id)?.as_dict_mut()?;
        pages.set("Kids", kids);
        pages.set("Count", count);
        for key in INHERITABLE_KEYS {
            pages.remove(key);
        }

        doc.inner.prune_objects();

        let mut bytes = Vec::new();
        doc.inner.save_to(&mut bytes)?;

        log::debug!("serialized PDF with {count} pages ({} bytes)", bytes.len());

        Ok(bytes)
    }
}

fn root_pages_id(doc: &Document) -> Result<ObjectId, PdfEngineError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfEngineError::MissingPageTree)?;

    doc.get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfEngineError::MissingPageTree)
}

/// Copies inheritable attributes from ancestor `Pages` nodes onto the page so
/// it keeps its appearance once re-parented under a flat page tree.
fn flatten_inherited(doc: &mut Document, page_id: ObjectId) -> Result<(), PdfEngineError> {
    let page = doc.get_dictionary(page_id)?;
    let mut missing: Vec<&[u8]> =
        INHERITABLE_KEYS.iter().copied().filter(|key| !page.has(key)).collect();
    let mut inherited = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }

        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };

        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });

        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    if inherited.is_empty() {
        return Ok(());
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    for (key, value) in inherited {
        page.set(key, value);
    }

    Ok(())
}

fn is_page_tree_node(object: &Object) -> bool {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|kind| kind.as_name().ok())
        == Some(&b"Pages"[..])
}

fn shift_references(object: &mut Object, offset: u32) {
    match object {
        Object::Reference((id, _)) => *id += offset,
        Object::Array(items) => items.iter_mut().for_each(|item| shift_references(item, offset)),
        Object::Dictionary(dict) => {
            dict.iter_mut().for_each(|(_, value)| shift_references(value, offset))
        }
        Object::Stream(stream) => {
            stream.dict.iter_mut().for_each(|(_, value)| shift_references(value, offset))
        }
        _ => {}
    }
}
