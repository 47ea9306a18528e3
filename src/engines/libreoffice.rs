//! LibreOffice in headless mode: office formats to PDF, and PDF imports
//! exported back out as Word or PowerPoint files.

use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::{check_status, existing, run_command, ConversionEngine, EngineError};

const ENGINE: &str = "libreoffice";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfficeTarget {
    Pdf,
    Docx,
    Pptx,
}

impl OfficeTarget {
    fn convert_to(self) -> &'static str {
        match self {
            OfficeTarget::Pdf => "pdf",
            OfficeTarget::Docx => "docx:MS Word 2007 XML",
            OfficeTarget::Pptx => "pptx:Impress MS PowerPoint 2007 XML",
        }
    }

    /// PDF input needs an explicit import filter, otherwise LibreOffice
    /// opens it in Draw and refuses the Writer/Impress export filters.
    fn input_filter(self) -> Option<&'static str> {
        match self {
            OfficeTarget::Pdf => None,
            OfficeTarget::Docx => Some("writer_pdf_import"),
            OfficeTarget::Pptx => Some("impress_pdf_import"),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            OfficeTarget::Pdf => "pdf",
            OfficeTarget::Docx => "docx",
            OfficeTarget::Pptx => "pptx",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LibreOffice {
    binary: PathBuf,
    target: OfficeTarget,
    timeout: Duration,
}

impl LibreOffice {
    pub fn new(binary: impl Into<PathBuf>, target: OfficeTarget, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            target,
            timeout,
        }
    }

    fn command(&self, input: &Path, out_dir: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        // A private profile per call; concurrent soffice instances sharing
        // the user profile block on its lock file.
        let profile = out_dir.join(".lo-profile");
        command
            .arg("--headless")
            .arg("--norestore")
            .arg(format!("-env:UserInstallation=file://{}", profile.display()));
        if let Some(filter) = self.target.input_filter() {
            command.arg(format!("--infilter={}", filter));
        }
        command
            .arg("--convert-to")
            .arg(self.target.convert_to())
            .arg("--outdir")
            .arg(out_dir)
            .arg(input);
        command
    }

    fn expected_output(&self, input: &Path, out_dir: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        out_dir.join(format!("{}.{}", stem, self.target.extension()))
    }
}

impl ConversionEngine for LibreOffice {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn convert<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>> {
        async move {
            let output = run_command(ENGINE, &mut self.command(input, out_dir), self.timeout).await?;
            check_status(ENGINE, &output)?;
            existing(ENGINE, self.expected_output(input, out_dir))
        }
        .boxed()
    }
}
