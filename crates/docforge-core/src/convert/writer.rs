//! Minimal PDF assembly on top of lopdf.
//!
//! Every converter ends with the same skeleton: a list of page dictionaries,
//! one `Pages` node and a `Catalog`. [`PdfBuilder`] owns that skeleton so the
//! converters only describe their pages.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

pub(crate) struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl PdfBuilder {
    pub(crate) fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
        }
    }

    pub(crate) fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub(crate) fn add_object(&mut self, object: impl Into<Object>) -> ObjectId {
        self.doc.add_object(object)
    }

    /// First object number not yet handed out.
    pub(crate) const fn next_id(&self) -> u32 {
        self.doc.max_id + 1
    }

    /// Move objects of another document into this one. The caller must have
    /// renumbered them starting at [`Self::next_id`].
    pub(crate) fn absorb(&mut self, objects: impl IntoIterator<Item = (ObjectId, Object)>) {
        for (id, object) in objects {
            self.doc.max_id = self.doc.max_id.max(id.0);
            self.doc.objects.insert(id, object);
        }
    }

    /// Attach an existing page dictionary under our page tree.
    pub(crate) fn push_page(&mut self, id: ObjectId, mut page: Dictionary) {
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        self.doc.max_id = self.doc.max_id.max(id.0);
        self.doc.objects.insert(id, Object::Dictionary(page));
        self.kids.push(id);
    }

    /// Create a page of the given size drawing `content` with `resources`.
    pub(crate) fn add_page(
        &mut self,
        width: f32,
        height: f32,
        resources: Dictionary,
        content: Vec<u8>,
    ) -> ObjectId {
        let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
        let page = Dictionary::from_iter([
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(width),
                    Object::Real(height),
                ]),
            ),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]);
        let page_id = self.doc.new_object_id();
        self.push_page(page_id, page);
        page_id
    }

    /// Write the page tree and catalog, then serialize.
    pub(crate) fn finish(mut self, compress: bool) -> std::io::Result<Vec<u8>> {
        let kids: Vec<Object> = self.kids.iter().map(|&id| Object::Reference(id)).collect();

        #[allow(clippy::cast_possible_wrap)]
        let count = self.kids.len() as i64;

        let pages = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(count)),
        ]);
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]));
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        if compress {
            self.doc.compress();
        }

        let mut output = Vec::new();
        self.doc.save_to(&mut output)?;
        Ok(output)
    }
}
