use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::{check_status, existing, run_command, ConversionEngine, EngineError};

const ENGINE: &str = "ghostscript";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostscriptMode {
    /// Re-write the file through pdfwrite, which rebuilds broken xref tables.
    Repair,
    /// PDF/A-2 output.
    PdfA,
}

#[derive(Debug, Clone)]
pub struct Ghostscript {
    binary: PathBuf,
    mode: GhostscriptMode,
    timeout: Duration,
}

impl Ghostscript {
    pub fn new(binary: impl Into<PathBuf>, mode: GhostscriptMode, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            mode,
            timeout,
        }
    }

    fn command(&self, input: &Path, output: &Path) -> Command {
        let mut command = Command::new(&self.binary);
        match self.mode {
            GhostscriptMode::Repair => {
                command
                    .arg("-o")
                    .arg(output)
                    .args(["-sDEVICE=pdfwrite", "-dPDFSETTINGS=/prepress"]);
            }
            GhostscriptMode::PdfA => {
                command
                    .args([
                        "-dPDFA=2",
                        "-dBATCH",
                        "-dNOPAUSE",
                        "-sProcessColorModel=DeviceCMYK",
                        "-sDEVICE=pdfwrite",
                    ])
                    .arg(format!("-sOutputFile={}", output.display()));
            }
        }
        command.arg(input);
        command
    }
}

impl ConversionEngine for Ghostscript {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn convert<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>> {
        async move {
            let target = out_dir.join(match self.mode {
                GhostscriptMode::Repair => "repaired.pdf",
                GhostscriptMode::PdfA => "pdfa.pdf",
            });
            let output = run_command(ENGINE, &mut self.command(input, &target), self.timeout).await?;
            check_status(ENGINE, &output)?;
            existing(ENGINE, target)
        }
        .boxed()
    }
}
