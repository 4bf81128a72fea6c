//! Concatenate standalone PDFs into one document.
//!
//! Pages are moved between documents as objects, never re-rendered. Each
//! input is renumbered into a disjoint id range, its page tree is dropped
//! and its pages are re-parented under a single new `Pages` node in input
//! order.
//!
//! The output is assembled in a local builder that is only serialized once
//! every input parsed, so a bad input anywhere in the list yields an error
//! and no partial document.

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use super::writer::PdfBuilder;
use crate::error::{Error, Result};

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guards against `Parent` cycles in malformed files.
const MAX_TREE_DEPTH: usize = 64;

/// Merge `documents` in order.
///
/// A single document is validated and returned unchanged.
pub fn merge<B: AsRef<[u8]>>(documents: &[B]) -> Result<Vec<u8>> {
    match documents {
        [] => Err(Error::EmptyMerge),
        [only] => {
            load(only.as_ref(), 0)?;
            Ok(only.as_ref().to_vec())
        }
        _ => merge_many(documents),
    }
}

fn load(bytes: &[u8], index: usize) -> Result<Document> {
    Document::load_mem(bytes)
        .map_err(|e| Error::Decoding(format!("document {} is not a valid PDF: {e}", index + 1)))
}

fn merge_many<B: AsRef<[u8]>>(documents: &[B]) -> Result<Vec<u8>> {
    let mut builder = PdfBuilder::new();

    for (index, bytes) in documents.iter().enumerate() {
        let mut doc = load(bytes.as_ref(), index)?;
        doc.renumber_objects_with(builder.next_id());

        let pages: Vec<(ObjectId, Dictionary)> = doc
            .get_pages()
            .into_values()
            .map(|page_id| {
                let page = flatten_page(&doc, page_id).ok_or_else(|| {
                    Error::Decoding(format!(
                        "document {} has a broken page object {page_id:?}",
                        index + 1
                    ))
                })?;
                Ok((page_id, page))
            })
            .collect::<Result<_>>()?;

        debug!("Appending {} pages from document {}", pages.len(), index + 1);

        let objects = std::mem::take(&mut doc.objects)
            .into_iter()
            .filter(|(_, object)| {
                !matches!(
                    object.type_name().unwrap_or(b""),
                    b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline"
                )
            });
        builder.absorb(objects);

        for (page_id, page) in pages {
            builder.push_page(page_id, page);
        }
    }

    if builder.page_count() == 0 {
        return Err(Error::Conversion("merged documents contain no pages".to_string()));
    }

    builder
        .finish(true)
        .map_err(|e| Error::Conversion(format!("failed to write merged PDF: {e}")))
}

/// Copy a page dictionary, pulling in attributes inherited from the page
/// tree that is about to be discarded.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut page = doc.get_dictionary(page_id).ok()?.clone();

    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited(doc, &page, key) {
            page.set(key.to_vec(), value);
        }
    }

    Some(page)
}

fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").ok()?.as_reference().ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").ok()?.as_reference().ok()?;
    }

    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::{page_texts, text_pdf};

    #[test]
    fn test_merge_empty() {
        let empty: [Vec<u8>; 0] = [];
        assert!(matches!(merge(&empty), Err(Error::EmptyMerge)));
    }

    #[test]
    fn test_merge_single_is_identity() {
        let pdf = text_pdf(&["Only"]);
        let merged = merge(std::slice::from_ref(&pdf)).unwrap();
        assert_eq!(merged, pdf);
    }

    #[test]
    fn test_merge_single_invalid() {
        let result = merge(&[b"not a pdf".to_vec()]);
        assert!(matches!(result, Err(Error::Decoding(_))));
    }

    #[test]
    fn test_merge_preserves_order() {
        let a = text_pdf(&["A1", "A2"]);
        let b = text_pdf(&["B1"]);
        let c = text_pdf(&["C1", "C2", "C3"]);

        let merged = merge(&[a, b, c]).unwrap();
        assert_eq!(
            page_texts(&merged),
            vec!["A1", "A2", "B1", "C1", "C2", "C3"]
        );
    }

    #[test]
    fn test_merge_is_atomic() {
        let valid = text_pdf(&["Fine"]);
        let result = merge(&[valid, b"this is not a pdf".to_vec()]);

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Decoding(_)));
        assert!(err.to_string().contains("document 2"));
    }

    #[test]
    fn test_inherited_media_box_survives() {
        // Page without its own MediaBox, inheriting from the page tree
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(lopdf::Stream::new(Dictionary::new(), Vec::new()));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter([
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
                ("Count", Object::Integer(1)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Integer(200),
                        Object::Integer(100),
                    ]),
                ),
            ])),
        );
        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let mut inherited_pdf = Vec::new();
        doc.save_to(&mut inherited_pdf).unwrap();

        let merged = merge(&[inherited_pdf, text_pdf(&["Second"])]).unwrap();
        let merged = Document::load_mem(&merged).unwrap();
        let first = merged.get_pages()[&1];
        let page = merged.get_dictionary(first).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_float().unwrap(), 200.0);
    }
}
