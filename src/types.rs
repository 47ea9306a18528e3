use actix_web::{
    body::BoxBody,
    http::{
        header::{self, Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue},
        StatusCode,
    },
    HttpRequest, HttpResponse, Responder, ResponseError,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engines::EngineError;
use crate::page_selector::PageSpecError;

pub const MEDIA_PDF: &str = "application/pdf";
pub const MEDIA_JPEG: &str = "image/jpeg";
pub const MEDIA_ZIP: &str = "application/zip";
pub const MEDIA_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MEDIA_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MEDIA_PPTX: &str =
    "application/vnd.openxmlformats-officedocument.presentationml.presentation";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Could not read PDF: {0}")]
    InvalidPdf(String),

    #[error("PDF processing error: {0}")]
    Pdf(String),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    PageSpec(#[from] PageSpecError),

    #[error("{0}")]
    EmptySelection(String),

    #[error("Rotation must be a multiple of 90 degrees, got {degrees}")]
    InvalidRotation { degrees: i64 },

    #[error("Missing form field '{field}'")]
    MissingField { field: String },

    #[error("Invalid value for form field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Malformed multipart upload: {0}")]
    Multipart(String),

    #[error("Upload exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("No tables found")]
    NoTables,

    #[error("Worker pool unavailable")]
    Blocking,
}

impl From<lopdf::Error> for ConversionError {
    fn from(err: lopdf::Error) -> Self {
        ConversionError::Pdf(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for ConversionError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        ConversionError::Multipart(err.to_string())
    }
}

impl From<actix_web::error::BlockingError> for ConversionError {
    fn from(_: actix_web::error::BlockingError) -> Self {
        ConversionError::Blocking
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl ResponseError for ConversionError {
    fn status_code(&self) -> StatusCode {
        match self {
            ConversionError::PageSpec(_)
            | ConversionError::EmptySelection(_)
            | ConversionError::InvalidRotation { .. }
            | ConversionError::Multipart(_) => StatusCode::BAD_REQUEST,
            ConversionError::MissingField { .. }
            | ConversionError::InvalidField { .. }
            | ConversionError::InvalidPdf(_)
            | ConversionError::Image(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ConversionError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ConversionError::Engine(EngineError::WrongPassword) => StatusCode::UNAUTHORIZED,
            ConversionError::NoTables => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("❌ Request failed: {}", self);
        } else {
            log::warn!("Request rejected ({}): {}", status.as_u16(), self);
        }
        HttpResponse::build(status).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

/// A finished output document, sent back as an attachment.
#[derive(Debug, Clone)]
pub struct ConvertedFile {
    pub content: Vec<u8>,
    pub media_type: &'static str,
    pub file_name: String,
}

impl ConvertedFile {
    pub fn new(content: Vec<u8>, media_type: &'static str, file_name: impl Into<String>) -> Self {
        Self {
            content,
            media_type,
            file_name: file_name.into(),
        }
    }

    pub fn pdf(content: Vec<u8>, file_name: impl Into<String>) -> Self {
        Self::new(content, MEDIA_PDF, file_name)
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    /// `attachment` with a quoted `filename`. Non-ASCII names get an ASCII
    /// fallback plus an RFC 5987 `filename*`.
    pub fn disposition(&self) -> ContentDisposition {
        let fallback: String = self
            .file_name
            .chars()
            .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
            .collect();
        let mut parameters = vec![DispositionParam::Filename(fallback)];
        if !self.file_name.is_ascii() {
            parameters.push(DispositionParam::FilenameExt(ExtendedValue {
                charset: Charset::Ext("UTF-8".to_string()),
                language_tag: None,
                value: self.file_name.clone().into_bytes(),
            }));
        }
        ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters,
        }
    }
}

impl Responder for ConvertedFile {
    type Body = BoxBody;

    fn respond_to(self, _req: &HttpRequest) -> HttpResponse<Self::Body> {
        HttpResponse::Ok()
            .content_type(self.media_type)
            .insert_header(self.disposition())
            .append_header((header::CACHE_CONTROL, "no-cache"))
            .body(self.content)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OcrResponse {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    pub message: String,
}
