//! External conversion engines.
//!
//! Each capability is a small trait so handlers never depend on a concrete
//! binary; the subprocess implementations live in the submodules and tests
//! swap in in-memory doubles.

use futures_util::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;

use crate::config::GatewayConfig;

pub mod camelot;
pub mod ghostscript;
pub mod libreoffice;
pub mod pdftoppm;
pub mod qpdf;
pub mod tesseract;
pub mod wkhtmltopdf;

pub use camelot::Camelot;
pub use ghostscript::{Ghostscript, GhostscriptMode};
pub use libreoffice::{LibreOffice, OfficeTarget};
pub use pdftoppm::Pdftoppm;
pub use qpdf::Qpdf;
pub use tesseract::Tesseract;
pub use wkhtmltopdf::Wkhtmltopdf;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start {engine}: {source}")]
    Spawn {
        engine: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{engine} exited with status {status}: {stderr}")]
    Failed {
        engine: &'static str,
        status: String,
        stderr: String,
    },

    #[error("{engine} did not finish within {secs}s")]
    Timeout { engine: &'static str, secs: u64 },

    #[error("{engine} produced no output")]
    NoOutput { engine: &'static str },

    #[error("Wrong password")]
    WrongPassword,

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One file in, one file out.
pub trait ConversionEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Convert `input`, writing the result somewhere under `out_dir`.
    fn convert<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Jpeg,
    Png,
}

impl RasterFormat {
    pub fn extension(self) -> &'static str {
        match self {
            RasterFormat::Jpeg => "jpg",
            RasterFormat::Png => "png",
        }
    }
}

/// Renders every page of a PDF to an image file.
pub trait PageRasterizer: Send + Sync {
    /// Returns one image per page, in page order.
    fn rasterize<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        format: RasterFormat,
        dpi: u32,
    ) -> BoxFuture<'a, Result<Vec<PathBuf>, EngineError>>;
}

pub trait TextRecognizer: Send + Sync {
    fn recognize<'a>(&'a self, image: &'a Path) -> BoxFuture<'a, Result<String, EngineError>>;
}

/// Password protection. Encryption itself is the engine's business.
pub trait PdfSecurity: Send + Sync {
    fn protect<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        password: &'a str,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>>;

    /// Fails with [`EngineError::WrongPassword`] when the password is rejected.
    fn unlock<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        password: &'a str,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>>;
}

/// The engines a [`crate::converter::DocumentConverter`] dispatches to.
#[derive(Clone)]
pub struct EngineSet {
    pub office_to_pdf: Arc<dyn ConversionEngine>,
    pub pdf_to_word: Arc<dyn ConversionEngine>,
    pub pdf_to_slides: Arc<dyn ConversionEngine>,
    pub table_extractor: Arc<dyn ConversionEngine>,
    pub html_to_pdf: Arc<dyn ConversionEngine>,
    pub repair: Arc<dyn ConversionEngine>,
    pub pdfa: Arc<dyn ConversionEngine>,
    pub rasterizer: Arc<dyn PageRasterizer>,
    pub ocr: Arc<dyn TextRecognizer>,
    pub security: Arc<dyn PdfSecurity>,
}

impl EngineSet {
    /// Subprocess-backed engines using the configured binaries.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let bins = &config.binaries;
        let timeout = config.engine_timeout();
        Self {
            office_to_pdf: Arc::new(LibreOffice::new(&bins.libreoffice, OfficeTarget::Pdf, timeout)),
            pdf_to_word: Arc::new(LibreOffice::new(&bins.libreoffice, OfficeTarget::Docx, timeout)),
            pdf_to_slides: Arc::new(LibreOffice::new(&bins.libreoffice, OfficeTarget::Pptx, timeout)),
            table_extractor: Arc::new(Camelot::new(&bins.camelot, timeout)),
            html_to_pdf: Arc::new(Wkhtmltopdf::new(&bins.wkhtmltopdf, timeout)),
            repair: Arc::new(Ghostscript::new(&bins.ghostscript, GhostscriptMode::Repair, timeout)),
            pdfa: Arc::new(Ghostscript::new(&bins.ghostscript, GhostscriptMode::PdfA, timeout)),
            rasterizer: Arc::new(Pdftoppm::new(&bins.pdftoppm, timeout)),
            ocr: Arc::new(Tesseract::new(&bins.tesseract, timeout)),
            security: Arc::new(Qpdf::new(&bins.qpdf, timeout)),
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        vec![
            self.office_to_pdf.name(),
            self.pdf_to_word.name(),
            self.pdf_to_slides.name(),
            self.table_extractor.name(),
            self.html_to_pdf.name(),
            self.repair.name(),
            self.pdfa.name(),
        ]
    }
}

/// Run a prepared command with piped output, killing it after `timeout`.
pub(crate) async fn run_command(
    engine: &'static str,
    command: &mut Command,
    timeout: Duration,
) -> Result<Output, EngineError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    log::debug!("Running {}: {:?}", engine, command.as_std());
    let started = Instant::now();

    let output = tokio::time::timeout(timeout, command.output())
        .await
        .map_err(|_| EngineError::Timeout {
            engine,
            secs: timeout.as_secs(),
        })?
        .map_err(|source| EngineError::Spawn { engine, source })?;

    log::info!(
        "⚙️  {} finished in {:.2}s ({})",
        engine,
        started.elapsed().as_secs_f64(),
        output.status
    );
    Ok(output)
}

pub(crate) fn check_status(engine: &'static str, output: &Output) -> Result<(), EngineError> {
    if output.status.success() {
        return Ok(());
    }
    Err(EngineError::Failed {
        engine,
        status: output
            .status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string()),
        stderr: stderr_excerpt(output),
    })
}

pub(crate) fn stderr_excerpt(output: &Output) -> String {
    const MAX: usize = 500;
    let text = String::from_utf8_lossy(&output.stderr);
    let text = text.trim();
    match text.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

pub(crate) fn existing(engine: &'static str, path: PathBuf) -> Result<PathBuf, EngineError> {
    if path.is_file() {
        Ok(path)
    } else {
        Err(EngineError::NoOutput { engine })
    }
}

/// Writes an executable shell script standing in for an engine binary.
#[cfg(all(test, unix))]
pub(crate) fn script_binary(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
