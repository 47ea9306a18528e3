//! HTTP handlers. Each one opens a request workspace, reads the multipart
//! form into it and hands the typed inputs to the [`DocumentConverter`].

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};

use crate::converter::{DocumentConverter, RotateTarget};
use crate::types::*;
use crate::upload::UploadForm;
use crate::workspace::Workspace;

pub type ConverterState = web::Data<DocumentConverter>;

type FileResult = Result<ConvertedFile, ConversionError>;

async fn receive(
    payload: Multipart,
    converter: &DocumentConverter,
) -> Result<(Workspace, UploadForm), ConversionError> {
    let workspace = Workspace::new()?;
    let form = UploadForm::read(payload, &workspace, converter.config().max_upload_bytes).await?;
    Ok((workspace, form))
}

fn delivered(endpoint: &str, result: FileResult) -> FileResult {
    if let Ok(file) = &result {
        log::info!("✅ {}: sending {} ({} bytes)", endpoint, file.file_name, file.size());
    }
    result
}

pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "message": "PDF Tools API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(PingResponse {
        status: "ok".to_string(),
        message: "pong".to_string(),
    })
}

pub async fn health(converter: ConverterState) -> HttpResponse {
    let config = converter.config();
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "pdf-tools-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "engines": converter.engine_names(),
        "limits": {
            "max_upload_bytes": config.max_upload_bytes,
            "engine_timeout_secs": config.engine_timeout_secs,
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

// === CONVERSIONS ===

pub async fn pdf_to_word(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter.pdf_to_word(&workspace, form.file("file")?).await;
    delivered("pdf-to-word", result)
}

/// Shared by the word, excel and ppt to PDF routes.
pub async fn office_to_pdf(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter.office_to_pdf(&workspace, form.file("file")?).await;
    delivered("office-to-pdf", result)
}

pub async fn pdf_to_jpg(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter.pdf_to_jpg(&workspace, form.file("file")?).await;
    delivered("pdf-to-jpg", result)
}

pub async fn jpg_to_pdf(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let result = converter.jpg_to_pdf(&form.files("files")?).await;
    delivered("jpg-to-pdf", result)
}

pub async fn pdf_to_excel(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter.pdf_to_excel(&workspace, form.file("file")?).await;
    delivered("pdf-to-excel", result)
}

pub async fn pdf_to_ppt(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter.pdf_to_ppt(&workspace, form.file("file")?).await;
    delivered("pdf-to-ppt", result)
}

pub async fn html_to_pdf(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter.html_to_pdf(&workspace, form.text("html")?).await;
    delivered("html-to-pdf", result)
}

// === PAGE TOOLS ===

pub async fn merge(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let result = converter.merge(&form.files("files")?).await;
    delivered("merge", result)
}

pub async fn split(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let result = converter
        .split(form.file("file")?, form.optional_text("pages"))
        .await;
    delivered("split", result)
}

pub async fn extract(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let result = converter
        .extract(form.file("file")?, form.text("pages")?)
        .await;
    delivered("extract", result)
}

pub async fn delete_pages(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let result = converter
        .delete_pages(form.file("file")?, form.text("pages")?)
        .await;
    delivered("delete-pages", result)
}

pub async fn reorder(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let result = converter
        .reorder(form.file("file")?, form.text("order")?)
        .await;
    delivered("reorder", result)
}

/// Accepts either `pages` (ranges allowed) or a single `page`.
pub async fn rotate(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let target = match form.optional_text("pages") {
        Some(pages) => RotateTarget::Pages(pages.to_string()),
        None => RotateTarget::Page(form.text("page")?.to_string()),
    };
    let degrees: i64 = form.parse("degrees")?;
    let result = converter.rotate(form.file("file")?, target, degrees).await;
    delivered("rotate", result)
}

// === EDITING ===

pub async fn watermark_text(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let font_size = form.number_or("fontsize", 36.0)?;
    let result = converter
        .watermark_text(form.file("file")?, form.text("text")?, font_size)
        .await;
    delivered("watermark-text", result)
}

pub async fn add_page_numbers(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let start: i64 = form.parse_or("start", 1)?;
    let result = converter.add_page_numbers(form.file("file")?, start).await;
    delivered("add-page-numbers", result)
}

pub async fn add_text(payload: Multipart, converter: ConverterState) -> FileResult {
    let (_workspace, form) = receive(payload, &converter).await?;
    let x = form.number("x")?;
    let y = form.number("y")?;
    let font_size = form.number_or("fontsize", 12.0)?;
    let result = converter
        .add_text(
            form.file("file")?,
            form.text("page")?,
            (x, y),
            form.text("text")?,
            font_size,
        )
        .await;
    delivered("add-text", result)
}

// === SECURITY AND MAINTENANCE ===

pub async fn protect(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter
        .protect(&workspace, form.file("file")?, form.text("password")?)
        .await;
    delivered("protect", result)
}

pub async fn unlock(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter
        .unlock(&workspace, form.file("file")?, form.text("password")?)
        .await;
    delivered("unlock", result)
}

pub async fn repair(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter.repair(&workspace, form.file("file")?).await;
    delivered("repair", result)
}

pub async fn pdfa(payload: Multipart, converter: ConverterState) -> FileResult {
    let (workspace, form) = receive(payload, &converter).await?;
    let result = converter.pdfa(&workspace, form.file("file")?).await;
    delivered("pdfa", result)
}

pub async fn ocr(
    payload: Multipart,
    converter: ConverterState,
) -> Result<web::Json<OcrResponse>, ConversionError> {
    let (workspace, form) = receive(payload, &converter).await?;
    let text = converter.ocr(&workspace, form.file("file")?).await?;
    Ok(web::Json(text))
}
