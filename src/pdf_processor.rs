use crate::types::*;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document as PdfDocument, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::path::Path;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards against cyclic /Parent chains in damaged files.
const MAX_TREE_DEPTH: usize = 64;

const FONT_KEY: &[u8] = b"PdfToolsHelv";

/// Page-level operations on PDF documents, backed by `lopdf`.
///
/// Page numbers are 1-based everywhere and are expected to be validated by
/// [`crate::page_selector`] before they reach this type.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, path: &Path) -> Result<PdfDocument, ConversionError> {
        PdfDocument::load(path)
            .map_err(|e| ConversionError::InvalidPdf(format!("{}", e)))
    }

    pub fn load_mem(&self, content: &[u8]) -> Result<PdfDocument, ConversionError> {
        PdfDocument::load_mem(content)
            .map_err(|e| ConversionError::InvalidPdf(format!("{}", e)))
    }

    pub fn page_count(&self, doc: &PdfDocument) -> u32 {
        doc.get_pages().len() as u32
    }

    pub fn save(&self, doc: &mut PdfDocument) -> Result<Vec<u8>, ConversionError> {
        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| ConversionError::Pdf(format!("Failed to save PDF: {}", e)))?;
        Ok(output)
    }

    /// New document holding `pages` of `doc`, in the order given.
    pub fn extract_pages(&self, doc: &PdfDocument, pages: &[u32]) -> Result<PdfDocument, ConversionError> {
        let mut assembler = PageAssembler::new();
        assembler.append(doc, pages)?;
        log::info!("Extracted {} of {} pages", pages.len(), self.page_count(doc));
        Ok(assembler.finish())
    }

    /// Rebuild the document page by page. Repeated indices clone the page.
    pub fn reorder_pages(&self, doc: &PdfDocument, order: &[u32]) -> Result<PdfDocument, ConversionError> {
        let mut assembler = PageAssembler::new();
        assembler.append(doc, order)?;
        log::info!("Reordered document into {} pages", order.len());
        Ok(assembler.finish())
    }

    /// Delete `pages` from `doc` in place, highest page first so the
    /// remaining numbers stay valid while deleting.
    pub fn delete_pages(&self, doc: &mut PdfDocument, pages: &[u32]) {
        let mut descending = pages.to_vec();
        descending.sort_unstable_by(|a, b| b.cmp(a));
        descending.dedup();
        for page in &descending {
            doc.delete_pages(&[*page]);
        }
        doc.prune_objects();
        log::info!("Deleted {} pages, {} remain", descending.len(), self.page_count(doc));
    }

    /// Set the absolute rotation of `pages` to `degrees`.
    pub fn rotate_pages(&self, doc: &mut PdfDocument, pages: &[u32], degrees: i64) -> Result<(), ConversionError> {
        if degrees % 90 != 0 {
            return Err(ConversionError::InvalidRotation { degrees });
        }
        let rotation = degrees.rem_euclid(360);
        let page_ids = doc.get_pages();

        for page in pages {
            let page_id = *page_ids.get(page).ok_or_else(|| {
                ConversionError::Pdf(format!("page {} not found in page tree", page))
            })?;
            doc.get_object_mut(page_id)?
                .as_dict_mut()?
                .set("Rotate", Object::Integer(rotation));
        }
        log::info!("Rotated {} pages to {}°", pages.len(), rotation);
        Ok(())
    }

    /// One single-page document per requested page.
    pub fn split(&self, doc: &PdfDocument, pages: &[u32]) -> Result<Vec<(u32, Vec<u8>)>, ConversionError> {
        let mut parts = Vec::with_capacity(pages.len());
        for &page in pages {
            let mut single = self.extract_pages(doc, &[page])?;
            parts.push((page, self.save(&mut single)?));
        }
        Ok(parts)
    }

    /// Concatenate documents in the order given.
    pub fn merge(&self, docs: &[PdfDocument]) -> Result<PdfDocument, ConversionError> {
        let mut assembler = PageAssembler::new();
        for doc in docs {
            let all: Vec<u32> = (1..=self.page_count(doc)).collect();
            assembler.append(doc, &all)?;
        }
        log::info!("Merged {} documents into {} pages", docs.len(), assembler.len());
        Ok(assembler.finish())
    }

    /// Grey diagonal text across every page.
    pub fn watermark_text(&self, doc: &mut PdfDocument, text: &str, font_size: f32) -> Result<(), ConversionError> {
        let font_id = add_helvetica(doc);
        let (cos, sin) = (std::f32::consts::FRAC_1_SQRT_2, std::f32::consts::FRAC_1_SQRT_2);

        for page_id in doc.get_pages().into_values() {
            let bbox = page_box(doc, page_id);
            let x = bbox.left + bbox.width() / 4.0;
            let y = bbox.bottom + bbox.height() / 2.0;
            let operations = text_operations(text, font_size, [cos, sin, -sin, cos, x, y], Some(0.5));
            overlay(doc, page_id, font_id, operations)?;
        }
        Ok(())
    }

    /// Number every page in the bottom-right corner, starting at `start`.
    pub fn add_page_numbers(&self, doc: &mut PdfDocument, start: i64) -> Result<(), ConversionError> {
        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let last_offset = page_ids.len().saturating_sub(1) as i64;
        if start.checked_add(last_offset).is_none() {
            return Err(ConversionError::InvalidField {
                field: "start".to_string(),
                message: format!("numbering from {} overflows after {} pages", start, page_ids.len()),
            });
        }
        let font_id = add_helvetica(doc);

        for (offset, page_id) in page_ids.into_iter().enumerate() {
            let bbox = page_box(doc, page_id);
            let label = (start + offset as i64).to_string();
            let origin = [1.0, 0.0, 0.0, 1.0, bbox.right - 50.0, bbox.bottom + 30.0];
            overlay(doc, page_id, font_id, text_operations(&label, 12.0, origin, None))?;
        }
        Ok(())
    }

    /// Write `text` on one page. `(x, y)` is measured from the top-left
    /// corner of the page.
    pub fn add_text(
        &self,
        doc: &mut PdfDocument,
        page: u32,
        x: f32,
        y: f32,
        text: &str,
        font_size: f32,
    ) -> Result<(), ConversionError> {
        let page_id = *doc.get_pages().get(&page).ok_or_else(|| {
            ConversionError::Pdf(format!("page {} not found in page tree", page))
        })?;
        let font_id = add_helvetica(doc);
        let bbox = page_box(doc, page_id);
        let origin = [1.0, 0.0, 0.0, 1.0, bbox.left + x, bbox.top - y];
        overlay(doc, page_id, font_id, text_operations(text, font_size, origin, None))
    }
}

/// Builds a fresh document out of pages copied from one or more sources.
struct PageAssembler {
    target: PdfDocument,
    pages_id: ObjectId,
    kids: Vec<ObjectId>,
}

impl PageAssembler {
    fn new() -> Self {
        let mut target = PdfDocument::with_version("1.7");
        let pages_id = target.new_object_id();
        Self {
            target,
            pages_id,
            kids: Vec::new(),
        }
    }

    fn len(&self) -> usize {
        self.kids.len()
    }

    /// Append `pages` of `source`. Objects shared between those pages
    /// (fonts, images) are copied once.
    fn append(&mut self, source: &PdfDocument, pages: &[u32]) -> Result<(), ConversionError> {
        let page_ids = source.get_pages();
        let mut copied = HashMap::new();

        for page in pages {
            let page_id = *page_ids.get(page).ok_or_else(|| {
                ConversionError::Pdf(format!("page {} not found in page tree", page))
            })?;
            let page_dict = source.get_dictionary(page_id)?;

            let mut new_page = Dictionary::new();
            for (key, value) in page_dict.iter() {
                if key.as_slice() == b"Parent" {
                    continue;
                }
                new_page.set(key.clone(), self.copy_object(source, value, &mut copied));
            }
            for key in INHERITABLE {
                if !new_page.has(key) {
                    if let Some(value) = inherited(source, page_dict, key) {
                        new_page.set(key.to_vec(), self.copy_object(source, value, &mut copied));
                    }
                }
            }
            new_page.set("Parent", Object::Reference(self.pages_id));
            self.kids.push(self.target.add_object(new_page));
        }
        Ok(())
    }

    fn copy_object(
        &mut self,
        source: &PdfDocument,
        object: &Object,
        copied: &mut HashMap<ObjectId, ObjectId>,
    ) -> Object {
        match object {
            Object::Reference(id) => {
                if let Some(new_id) = copied.get(id) {
                    return Object::Reference(*new_id);
                }
                let resolved = match source.get_object(*id) {
                    Ok(resolved) => resolved,
                    Err(e) => {
                        log::warn!("Dangling reference {:?} replaced with null: {}", id, e);
                        return Object::Null;
                    }
                };
                // Links and annotations can point at other pages; copying
                // those would drag their whole content along.
                if is_page_node(resolved) {
                    return Object::Null;
                }
                let new_id = self.target.new_object_id();
                copied.insert(*id, new_id);
                let copy = self.copy_object(source, resolved, copied);
                self.target.objects.insert(new_id, copy);
                Object::Reference(new_id)
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(source, dict, copied)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(source, item, copied))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut stream = stream.clone();
                stream.dict = self.copy_dictionary(source, &stream.dict, copied);
                Object::Stream(stream)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(
        &mut self,
        source: &PdfDocument,
        dict: &Dictionary,
        copied: &mut HashMap<ObjectId, ObjectId>,
    ) -> Dictionary {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            new_dict.set(key.clone(), self.copy_object(source, value, copied));
        }
        new_dict
    }

    fn finish(mut self) -> PdfDocument {
        let kids: Vec<Object> = self.kids.iter().map(|id| Object::Reference(*id)).collect();
        let count = kids.len() as i64;
        self.target.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.target.trailer.set("Root", catalog_id);
        self.target
    }
}

fn is_page_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if name.as_slice() == b"Page" || name.as_slice() == b"Pages"
        ),
        _ => false,
    }
}

/// Look `key` up on the page, then on its ancestors.
fn inherited<'a>(doc: &'a PdfDocument, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// Resolve one level of indirection.
fn resolve<'a>(doc: &'a PdfDocument, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PageBox {
    left: f32,
    bottom: f32,
    right: f32,
    top: f32,
}

impl PageBox {
    const LETTER: PageBox = PageBox {
        left: 0.0,
        bottom: 0.0,
        right: 612.0,
        top: 792.0,
    };

    fn width(&self) -> f32 {
        self.right - self.left
    }

    fn height(&self) -> f32 {
        self.top - self.bottom
    }
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// The visible area of a page: CropBox if present, otherwise MediaBox.
fn page_box(doc: &PdfDocument, page_id: ObjectId) -> PageBox {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return PageBox::LETTER;
    };
    for key in [b"CropBox".as_slice(), b"MediaBox".as_slice()] {
        let Some(value) = inherited(doc, page, key) else {
            continue;
        };
        if let Object::Array(values) = resolve(doc, value) {
            let coords: Vec<f32> = values.iter().filter_map(|v| number(resolve(doc, v))).collect();
            if let [x1, y1, x2, y2] = coords[..] {
                return PageBox {
                    left: x1.min(x2),
                    bottom: y1.min(y2),
                    right: x1.max(x2),
                    top: y1.max(y2),
                };
            }
        }
    }
    PageBox::LETTER
}

fn add_helvetica(doc: &mut PdfDocument) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Text drawing operators. `matrix` positions (and optionally rotates) the
/// text; `gray` sets a fill colour.
fn text_operations(text: &str, font_size: f32, matrix: [f32; 6], gray: Option<f32>) -> Vec<Operation> {
    let mut operations = vec![Operation::new("BT", vec![])];
    if let Some(level) = gray {
        operations.push(Operation::new("g", vec![Object::Real(level as _)]));
    }
    operations.push(Operation::new(
        "Tf",
        vec![
            Object::Name(FONT_KEY.to_vec()),
            Object::Real(font_size as _),
        ],
    ));
    operations.push(Operation::new(
        "Tm",
        matrix.iter().map(|v| Object::Real(*v as _)).collect(),
    ));
    operations.push(Operation::new(
        "Tj",
        vec![Object::string_literal(win_ansi(text))],
    ));
    operations.push(Operation::new("ET", vec![]));
    operations
}

/// Helvetica is used with WinAnsiEncoding; anything outside Latin-1 is
/// replaced.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| match u32::from(c) {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Draw `operations` on top of the existing page content. The original
/// content is wrapped in q/Q so its graphics state cannot leak into the
/// overlay.
fn overlay(
    doc: &mut PdfDocument,
    page_id: ObjectId,
    font_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), ConversionError> {
    let encoded = Content { operations }.encode()?;

    // Resources may be inherited or shared with other pages; give the page
    // its own shallow copy with the overlay font added.
    let mut resources = {
        let page = doc.get_dictionary(page_id)?;
        match inherited(doc, page, b"Resources").map(|r| resolve(doc, r)) {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        }
    };
    let mut fonts = match resources.get(b"Font").map(|f| resolve(doc, f)) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    fonts.set(FONT_KEY.to_vec(), Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let mut contents = vec![Object::Reference(save_id)];
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => contents.push(Object::Reference(*id)),
        Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
        _ => {}
    }
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));
    page.set("Contents", Object::Array(contents));
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}
