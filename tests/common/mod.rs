//! Shared fixtures: in-memory engines, a multipart body builder and a
//! small PDF generator.

#![allow(dead_code)]

use bytes::{BufMut, Bytes, BytesMut};
use futures_util::future::{BoxFuture, FutureExt};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use pdf_tools_gateway::engines::{
    ConversionEngine, EngineError, EngineSet, PageRasterizer, PdfSecurity, RasterFormat,
    TextRecognizer,
};

pub const BOUNDARY: &str = "----pdf-tools-test-boundary";

/// Writes fixed bytes to `<out_dir>/<output_name>`, or reports no output.
pub struct FakeEngine {
    pub name: &'static str,
    pub output_name: &'static str,
    pub output: Option<&'static [u8]>,
}

impl ConversionEngine for FakeEngine {
    fn name(&self) -> &'static str {
        self.name
    }

    fn convert<'a>(
        &'a self,
        _input: &'a Path,
        out_dir: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>> {
        async move {
            let content = self.output.ok_or(EngineError::NoOutput { engine: self.name })?;
            let target = out_dir.join(self.output_name);
            tokio::fs::write(&target, content).await?;
            Ok(target)
        }
        .boxed()
    }
}

/// Renders a fixed number of solid-colour pages regardless of the input.
pub struct FakeRasterizer {
    pub pages: u32,
}

impl PageRasterizer for FakeRasterizer {
    fn rasterize<'a>(
        &'a self,
        _input: &'a Path,
        out_dir: &'a Path,
        format: RasterFormat,
        _dpi: u32,
    ) -> BoxFuture<'a, Result<Vec<PathBuf>, EngineError>> {
        async move {
            let image_format = match format {
                RasterFormat::Jpeg => ImageOutputFormat::Jpeg(80),
                RasterFormat::Png => ImageOutputFormat::Png,
            };
            let mut paths = Vec::new();
            for page in 1..=self.pages {
                let path = out_dir.join(format!("page-{}.{}", page, format.extension()));
                tokio::fs::write(&path, image_bytes(8, 8, image_format.clone())).await?;
                paths.push(path);
            }
            Ok(paths)
        }
        .boxed()
    }
}

pub struct FakeOcr;

impl TextRecognizer for FakeOcr {
    fn recognize<'a>(&'a self, image: &'a Path) -> BoxFuture<'a, Result<String, EngineError>> {
        async move {
            let name = image
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
            Ok(format!("text of {}", name))
        }
        .boxed()
    }
}

/// Protect copies the input; unlock only accepts `secret`.
pub struct FakeSecurity;

impl PdfSecurity for FakeSecurity {
    fn protect<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        _password: &'a str,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>> {
        async move {
            let target = out_dir.join("protected.pdf");
            tokio::fs::copy(input, &target).await?;
            Ok(target)
        }
        .boxed()
    }

    fn unlock<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        password: &'a str,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>> {
        async move {
            if password != "secret" {
                return Err(EngineError::WrongPassword);
            }
            let target = out_dir.join("unlocked.pdf");
            tokio::fs::copy(input, &target).await?;
            Ok(target)
        }
        .boxed()
    }
}

fn fake(name: &'static str, output_name: &'static str, output: Option<&'static [u8]>) -> Arc<FakeEngine> {
    Arc::new(FakeEngine {
        name,
        output_name,
        output,
    })
}

/// Engines that never leave the process. The table extractor finds nothing.
pub fn fake_engines(raster_pages: u32) -> EngineSet {
    EngineSet {
        office_to_pdf: fake("fake-office", "converted.pdf", Some(b"%PDF-office")),
        pdf_to_word: fake("fake-word", "converted.docx", Some(b"docx-bytes")),
        pdf_to_slides: fake("fake-slides", "converted.pptx", Some(b"pptx-bytes")),
        table_extractor: fake("fake-tables", "tables.xlsx", None),
        html_to_pdf: fake("fake-html", "out.pdf", Some(b"%PDF-html")),
        repair: fake("fake-repair", "repaired.pdf", Some(b"%PDF-repaired")),
        pdfa: fake("fake-pdfa", "pdfa.pdf", Some(b"%PDF-pdfa")),
        rasterizer: Arc::new(FakeRasterizer { pages: raster_pages }),
        ocr: Arc::new(FakeOcr),
        security: Arc::new(FakeSecurity),
    }
}

pub fn image_bytes(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([20, 120, 200]));
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut output), format)
        .unwrap();
    output
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    body: BytesMut,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.put_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.put_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.body.put_slice(value.as_bytes());
        self.body.put_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, content: &[u8]) -> Self {
        self.body.put_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        self.body.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, file_name
            )
            .as_bytes(),
        );
        self.body
            .put_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        self.body.put_slice(content);
        self.body.put_slice(b"\r\n");
        self
    }

    pub fn pdf(self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.file(name, file_name, "application/pdf", content)
    }

    /// `(content type header, body)`.
    pub fn finish(mut self) -> (String, Bytes) {
        self.body.put_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        (
            format!("multipart/form-data; boundary={}", BOUNDARY),
            self.body.freeze(),
        )
    }
}

/// A saved document whose page N shows the text "Page N".
pub fn sample_pdf(num_pages: u32) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for i in 1..=num_pages {
        let content = format!("BT /F1 12 Tf 72 720 Td (Page {}) Tj ET", i);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ],
        });
        kids.push(Object::Reference(page_id));
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => num_pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut output = Vec::new();
    doc.save_to(&mut output).unwrap();
    output
}

/// The "Page N" labels of a response PDF, in page order.
pub fn page_labels(content: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(content).unwrap();
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let content = String::from_utf8_lossy(&doc.get_page_content(page_id).unwrap()).into_owned();
            let start = content.find("(Page ").expect("page label");
            let end = content[start..].find(')').unwrap() + start;
            content[start + 1..end].to_string()
        })
        .collect()
}
