//! Small synthetic PDFs for tests.
//!
//! Page `i` is `600 + 10 * i` points wide so page identity can be read back
//! from the output through `PageOperations::page_sizes`.

use lopdf::{dictionary, Document, Object, ObjectId, Stream};

pub fn sample_pdf(page_count: usize) -> Vec<u8> {
    sample_pdf_with_rotations(&vec![0; page_count])
}

pub fn sample_pdf_with_rotations(rotations: &[i32]) -> Vec<u8> {
    let (doc, pages_id) = sample_document(rotations);
    finish(doc, pages_id)
}

/// One page whose trailer points at a standard security handler dictionary.
pub fn encrypted_pdf() -> Vec<u8> {
    let (mut doc, pages_id) = sample_document(&[0]);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::string_literal(vec![0u8; 32]),
        "U" => Object::string_literal(vec![0u8; 32]),
        "P" => -4,
    });
    doc.trailer.set("Encrypt", encrypt_id);

    finish(doc, pages_id)
}

/// One unencrypted page that also shows `text` from an uncompressed stream.
pub fn sample_pdf_with_text(text: &str) -> Vec<u8> {
    let (mut doc, pages_id) = sample_document(&[0]);
    let content = format!("BT /F1 12 Tf 72 680 Td ({text}) Tj ET");
    let text_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

    let page_id = doc
        .get_dictionary(pages_id)
        .and_then(|pages| pages.get(b"Kids"))
        .and_then(Object::as_array)
        .ok()
        .and_then(|kids| kids.first())
        .and_then(|kid| kid.as_reference().ok());
    if let Some(Ok(Object::Dictionary(page))) = page_id.map(|id| doc.get_object_mut(id)) {
        let label = page.get(b"Contents").ok().cloned();
        let mut contents: Vec<Object> = label.into_iter().collect();
        contents.push(Object::Reference(text_id));
        page.set("Contents", contents);
    }

    finish(doc, pages_id)
}

fn sample_document(rotations: &[i32]) -> (Document, ObjectId) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let resources_id = add_resources(&mut doc);

    let kids: Vec<Object> = rotations
        .iter()
        .enumerate()
        .map(|(index, rotation)| {
            let width = 600 + 10 * index as i64;
            let page_id = add_page(&mut doc, pages_id, index, width);
            if *rotation != 0 {
                if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
                    page.set("Rotate", *rotation as i64);
                }
            }
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => rotations.len() as i64,
            "Resources" => resources_id,
        }),
    );

    (doc, pages_id)
}

/// Three pages; pages 2 and 3 sit under an intermediate `Pages` node that
/// carries `Rotate 90` and a 700 pt wide `MediaBox` for its children.
pub fn nested_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let root_id = doc.new_object_id();
    let branch_id = doc.new_object_id();
    let resources_id = add_resources(&mut doc);

    let first = add_page(&mut doc, root_id, 0, 600);
    let second = add_inheriting_page(&mut doc, branch_id, 1);
    let third = add_inheriting_page(&mut doc, branch_id, 2);

    doc.objects.insert(
        branch_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Parent" => root_id,
            "Kids" => vec![Object::Reference(second), Object::Reference(third)],
            "Count" => 2,
            "Rotate" => 90,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(700),
                Object::Integer(800),
            ],
        }),
    );
    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(first), Object::Reference(branch_id)],
            "Count" => 3,
            "Resources" => resources_id,
        }),
    );

    finish(doc, root_id)
}

fn add_resources(doc: &mut Document) -> ObjectId {
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    })
}

fn add_page(doc: &mut Document, parent: ObjectId, index: usize, width: i64) -> ObjectId {
    let content_id = add_label(doc, index);

    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(800),
        ],
        "Contents" => content_id,
    })
}

fn add_inheriting_page(doc: &mut Document, parent: ObjectId, index: usize) -> ObjectId {
    let content_id = add_label(doc, index);

    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => parent,
        "Contents" => content_id,
    })
}

fn add_label(doc: &mut Document, index: usize) -> ObjectId {
    let content = format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", index + 1);
    doc.add_object(Stream::new(dictionary! {}, content.into_bytes()))
}

fn finish(mut doc: Document, pages_id: ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture PDF should serialize");
    bytes
}
