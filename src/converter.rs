use actix_web::web;
use lopdf::Document as PdfDocument;
use std::path::{Path, PathBuf};

use crate::archive::zip_entries;
use crate::config::GatewayConfig;
use crate::engines::{ConversionEngine, EngineError, EngineSet, RasterFormat};
use crate::image_processor::{CompressionSettings, ImageProcessor};
use crate::page_selector;
use crate::pdf_processor::PdfProcessor;
use crate::types::*;
use crate::upload::UploadedFile;
use crate::workspace::Workspace;

/// Which pages a rotation applies to.
#[derive(Debug, Clone)]
pub enum RotateTarget {
    /// Sequence grammar, usually a single page number.
    Page(String),
    /// Set grammar, e.g. `"1-3,7"`.
    Pages(String),
}

/// The service object behind every endpoint. Built once at startup and
/// shared read-only between workers.
pub struct DocumentConverter {
    config: GatewayConfig,
    engines: EngineSet,
    image_processor: ImageProcessor,
    pdf_processor: PdfProcessor,
}

impl DocumentConverter {
    pub fn new(config: GatewayConfig) -> Self {
        let engines = EngineSet::from_config(&config);
        Self::with_engines(config, engines)
    }

    pub fn with_engines(config: GatewayConfig, engines: EngineSet) -> Self {
        let image_processor = ImageProcessor::with_settings(CompressionSettings {
            quality: config.jpeg_quality,
        });
        Self {
            config,
            engines,
            image_processor,
            pdf_processor: PdfProcessor::new(),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn engine_names(&self) -> Vec<&'static str> {
        self.engines.names()
    }

    // === OFFICE AND MARKUP CONVERSIONS ===

    /// Word, Excel and PowerPoint files all go through the same office engine.
    pub async fn office_to_pdf(&self, workspace: &Workspace, file: &UploadedFile) -> Result<ConvertedFile, ConversionError> {
        let out = self
            .run_engine(self.engines.office_to_pdf.as_ref(), workspace, &file.path)
            .await?;
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::pdf(content, format!("{}.pdf", file.stem())))
    }

    pub async fn pdf_to_word(&self, workspace: &Workspace, file: &UploadedFile) -> Result<ConvertedFile, ConversionError> {
        let out = self
            .run_engine(self.engines.pdf_to_word.as_ref(), workspace, &file.path)
            .await?;
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::new(content, MEDIA_DOCX, format!("{}.docx", file.stem())))
    }

    pub async fn pdf_to_excel(&self, workspace: &Workspace, file: &UploadedFile) -> Result<ConvertedFile, ConversionError> {
        let out = match self
            .run_engine(self.engines.table_extractor.as_ref(), workspace, &file.path)
            .await
        {
            Err(ConversionError::Engine(EngineError::NoOutput { .. })) => {
                return Err(ConversionError::NoTables)
            }
            other => other?,
        };
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::new(content, MEDIA_XLSX, format!("{}.xlsx", file.stem())))
    }

    /// Image-based slides: every page is rendered and placed on its own slide.
    pub async fn pdf_to_ppt(&self, workspace: &Workspace, file: &UploadedFile) -> Result<ConvertedFile, ConversionError> {
        let images = self
            .rasterize(workspace, &file.path, RasterFormat::Png, self.config.ppt_dpi)
            .await?;
        let contents = read_all(&images).await?;

        let processor = self.image_processor.clone();
        let slides_pdf = web::block(move || processor.images_to_pdf(&contents)).await??;
        let slides_path = workspace.file_path(".pdf");
        tokio::fs::write(&slides_path, slides_pdf).await?;

        let out = self
            .run_engine(self.engines.pdf_to_slides.as_ref(), workspace, &slides_path)
            .await?;
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::new(content, MEDIA_PPTX, "converted.pptx"))
    }

    pub async fn html_to_pdf(&self, workspace: &Workspace, html: &str) -> Result<ConvertedFile, ConversionError> {
        let input = workspace.file_path(".html");
        tokio::fs::write(&input, html).await?;
        let out = self
            .run_engine(self.engines.html_to_pdf.as_ref(), workspace, &input)
            .await?;
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::pdf(content, "out.pdf"))
    }

    // === RASTER CONVERSIONS ===

    /// A single page comes back as one JPEG, longer documents as a zip of
    /// `page_N.jpg` entries.
    pub async fn pdf_to_jpg(&self, workspace: &Workspace, file: &UploadedFile) -> Result<ConvertedFile, ConversionError> {
        let images = self
            .rasterize(workspace, &file.path, RasterFormat::Jpeg, self.config.raster_dpi)
            .await?;
        let mut contents = read_all(&images).await?;

        if contents.len() == 1 {
            let content = contents.remove(0);
            return Ok(ConvertedFile::new(content, MEDIA_JPEG, "page1.jpg"));
        }

        let archive = web::block(move || {
            zip_entries(
                contents
                    .iter()
                    .enumerate()
                    .map(|(i, content)| (format!("page_{}.jpg", i + 1), content)),
            )
        })
        .await??;
        Ok(ConvertedFile::new(archive, MEDIA_ZIP, "pages.zip"))
    }

    pub async fn jpg_to_pdf(&self, files: &[&UploadedFile]) -> Result<ConvertedFile, ConversionError> {
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        let contents = read_all(&paths).await?;

        let processor = self.image_processor.clone();
        let pdf = web::block(move || processor.images_to_pdf(&contents)).await??;
        Ok(ConvertedFile::pdf(pdf, "converted.pdf"))
    }

    /// Text of every page, rendered and recognized in page order.
    pub async fn ocr(&self, workspace: &Workspace, file: &UploadedFile) -> Result<OcrResponse, ConversionError> {
        let images = self
            .rasterize(workspace, &file.path, RasterFormat::Png, self.config.raster_dpi)
            .await?;

        let mut pages = Vec::with_capacity(images.len());
        for image in &images {
            pages.push(self.engines.ocr.recognize(image).await?);
        }
        log::info!("✅ Recognized text on {} pages", pages.len());
        Ok(OcrResponse { text: pages.join("\n") })
    }

    // === PAGE TOOLS ===

    pub async fn merge(&self, files: &[&UploadedFile]) -> Result<ConvertedFile, ConversionError> {
        let paths: Vec<PathBuf> = files.iter().map(|f| f.path.clone()).collect();
        let pdf = self.pdf_processor;

        let content = web::block(move || {
            let docs = paths
                .iter()
                .map(|path| pdf.load(path))
                .collect::<Result<Vec<_>, _>>()?;
            let mut merged = pdf.merge(&docs)?;
            pdf.save(&mut merged)
        })
        .await??;
        Ok(ConvertedFile::pdf(content, "merged.pdf"))
    }

    /// Every page, or only the selected ones, as separate single-page PDFs
    /// in a zip.
    pub async fn split(&self, file: &UploadedFile, pages: Option<&str>) -> Result<ConvertedFile, ConversionError> {
        let spec = pages.map(str::to_string);
        let archive = self
            .with_document(file, move |pdf, doc| {
                let count = pdf.page_count(&doc);
                let selection = match spec {
                    Some(spec) => non_empty(page_selector::parse_set(&spec, count)?, &spec)?,
                    None => (1..=count).collect(),
                };
                let parts = pdf.split(&doc, &selection)?;
                zip_entries(
                    parts
                        .iter()
                        .map(|(page, content)| (format!("page_{}.pdf", page), content)),
                )
            })
            .await?;
        Ok(ConvertedFile::new(archive, MEDIA_ZIP, "pages.zip"))
    }

    pub async fn extract(&self, file: &UploadedFile, pages: &str) -> Result<ConvertedFile, ConversionError> {
        let spec = pages.to_string();
        let content = self
            .with_document(file, move |pdf, doc| {
                let selection = page_selector::parse_set(&spec, pdf.page_count(&doc))?;
                let selection = non_empty(selection, &spec)?;
                let mut extracted = pdf.extract_pages(&doc, &selection)?;
                pdf.save(&mut extracted)
            })
            .await?;
        Ok(ConvertedFile::pdf(content, "extracted.pdf"))
    }

    /// An empty selection returns the document unchanged. Deleting every
    /// page is refused.
    pub async fn delete_pages(&self, file: &UploadedFile, pages: &str) -> Result<ConvertedFile, ConversionError> {
        let spec = pages.to_string();
        let content = self
            .with_document(file, move |pdf, mut doc| {
                let count = pdf.page_count(&doc);
                let selection = page_selector::parse_set(&spec, count)?;
                if selection.len() as u32 == count && count > 0 {
                    return Err(ConversionError::EmptySelection(format!(
                        "'{}' selects all {} pages; a PDF must keep at least one page",
                        spec, count
                    )));
                }
                if !selection.is_empty() {
                    pdf.delete_pages(&mut doc, &selection);
                }
                pdf.save(&mut doc)
            })
            .await?;
        Ok(ConvertedFile::pdf(content, "updated.pdf"))
    }

    pub async fn reorder(&self, file: &UploadedFile, order: &str) -> Result<ConvertedFile, ConversionError> {
        let spec = order.to_string();
        let content = self
            .with_document(file, move |pdf, doc| {
                let order = page_selector::parse_sequence(&spec, pdf.page_count(&doc))?;
                let mut reordered = pdf.reorder_pages(&doc, &order)?;
                pdf.save(&mut reordered)
            })
            .await?;
        Ok(ConvertedFile::pdf(content, "reordered.pdf"))
    }

    pub async fn rotate(&self, file: &UploadedFile, target: RotateTarget, degrees: i64) -> Result<ConvertedFile, ConversionError> {
        if degrees % 90 != 0 {
            return Err(ConversionError::InvalidRotation { degrees });
        }
        let content = self
            .with_document(file, move |pdf, mut doc| {
                let count = pdf.page_count(&doc);
                let pages = match &target {
                    RotateTarget::Page(spec) => vec![single_page(spec, count)?],
                    RotateTarget::Pages(spec) => non_empty(page_selector::parse_set(spec, count)?, spec)?,
                };
                pdf.rotate_pages(&mut doc, &pages, degrees)?;
                pdf.save(&mut doc)
            })
            .await?;
        Ok(ConvertedFile::pdf(content, "rotated.pdf"))
    }

    // === EDITING ===

    pub async fn watermark_text(&self, file: &UploadedFile, text: &str, font_size: f32) -> Result<ConvertedFile, ConversionError> {
        let text = text.to_string();
        let content = self
            .with_document(file, move |pdf, mut doc| {
                pdf.watermark_text(&mut doc, &text, font_size)?;
                pdf.save(&mut doc)
            })
            .await?;
        Ok(ConvertedFile::pdf(content, "watermarked.pdf"))
    }

    pub async fn add_page_numbers(&self, file: &UploadedFile, start: i64) -> Result<ConvertedFile, ConversionError> {
        let content = self
            .with_document(file, move |pdf, mut doc| {
                pdf.add_page_numbers(&mut doc, start)?;
                pdf.save(&mut doc)
            })
            .await?;
        Ok(ConvertedFile::pdf(content, "with-pagenumbers.pdf"))
    }

    /// `page` is a single 1-based page number; `(x, y)` is measured from
    /// the top-left corner.
    pub async fn add_text(
        &self,
        file: &UploadedFile,
        page: &str,
        position: (f32, f32),
        text: &str,
        font_size: f32,
    ) -> Result<ConvertedFile, ConversionError> {
        let spec = page.to_string();
        let text = text.to_string();
        let content = self
            .with_document(file, move |pdf, mut doc| {
                let page = single_page(&spec, pdf.page_count(&doc))?;
                pdf.add_text(&mut doc, page, position.0, position.1, &text, font_size)?;
                pdf.save(&mut doc)
            })
            .await?;
        Ok(ConvertedFile::pdf(content, "edited.pdf"))
    }

    // === SECURITY AND MAINTENANCE ===

    pub async fn protect(&self, workspace: &Workspace, file: &UploadedFile, password: &str) -> Result<ConvertedFile, ConversionError> {
        let out_dir = workspace.subdir("protect")?;
        let out = self.engines.security.protect(&file.path, &out_dir, password).await?;
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::pdf(content, "protected.pdf"))
    }

    pub async fn unlock(&self, workspace: &Workspace, file: &UploadedFile, password: &str) -> Result<ConvertedFile, ConversionError> {
        let out_dir = workspace.subdir("unlock")?;
        let out = self.engines.security.unlock(&file.path, &out_dir, password).await?;
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::pdf(content, "unlocked.pdf"))
    }

    pub async fn repair(&self, workspace: &Workspace, file: &UploadedFile) -> Result<ConvertedFile, ConversionError> {
        let out = self
            .run_engine(self.engines.repair.as_ref(), workspace, &file.path)
            .await?;
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::pdf(content, "repaired.pdf"))
    }

    pub async fn pdfa(&self, workspace: &Workspace, file: &UploadedFile) -> Result<ConvertedFile, ConversionError> {
        let out = self
            .run_engine(self.engines.pdfa.as_ref(), workspace, &file.path)
            .await?;
        let content = tokio::fs::read(out).await?;
        Ok(ConvertedFile::pdf(content, "pdfa.pdf"))
    }

    // === HELPER METHODS ===

    /// Load the upload and run `op` on the blocking pool.
    async fn with_document<T, F>(&self, file: &UploadedFile, op: F) -> Result<T, ConversionError>
    where
        T: Send + 'static,
        F: FnOnce(PdfProcessor, PdfDocument) -> Result<T, ConversionError> + Send + 'static,
    {
        let pdf = self.pdf_processor;
        let path = file.path.clone();
        web::block(move || {
            let doc = pdf.load(&path)?;
            op(pdf, doc)
        })
        .await?
    }

    /// Each engine call writes into its own subdirectory of the workspace.
    async fn run_engine(
        &self,
        engine: &dyn ConversionEngine,
        workspace: &Workspace,
        input: &Path,
    ) -> Result<PathBuf, ConversionError> {
        let out_dir = workspace.subdir(engine.name())?;
        log::info!("Converting {} with {}", input.display(), engine.name());
        Ok(engine.convert(input, &out_dir).await?)
    }

    async fn rasterize(
        &self,
        workspace: &Workspace,
        input: &Path,
        format: RasterFormat,
        dpi: u32,
    ) -> Result<Vec<PathBuf>, ConversionError> {
        let out_dir = workspace.subdir(&format!("raster-{}", format.extension()))?;
        let images = self
            .engines
            .rasterizer
            .rasterize(input, &out_dir, format, dpi)
            .await?;
        if images.is_empty() {
            return Err(EngineError::NoOutput { engine: "rasterizer" }.into());
        }
        Ok(images)
    }
}

fn non_empty(selection: Vec<u32>, spec: &str) -> Result<Vec<u32>, ConversionError> {
    if selection.is_empty() {
        return Err(ConversionError::EmptySelection(format!(
            "'{}' does not select any page of this document",
            spec
        )));
    }
    Ok(selection)
}

/// The `page` field: one 1-based page number, nothing else.
fn single_page(spec: &str, page_count: u32) -> Result<u32, ConversionError> {
    match page_selector::parse_sequence(spec, page_count)?.as_slice() {
        [page] => Ok(*page),
        _ => Err(ConversionError::InvalidField {
            field: "page".to_string(),
            message: format!("expected exactly one page number, got {:?}", spec),
        }),
    }
}

async fn read_all(paths: &[PathBuf]) -> Result<Vec<Vec<u8>>, ConversionError> {
    let mut contents = Vec::with_capacity(paths.len());
    for path in paths {
        contents.push(tokio::fs::read(path).await?);
    }
    Ok(contents)
}
