//! Password protection via qpdf.
//!
//! Arguments go through an `@argfile` inside the request workspace so that
//! passwords never show up in the process list.

use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use super::{check_status, existing, run_command, EngineError, PdfSecurity};

const ENGINE: &str = "qpdf";

/// qpdf exits with 3 when it succeeded with warnings.
const EXIT_WARNINGS: i32 = 3;

#[derive(Debug, Clone)]
pub struct Qpdf {
    binary: PathBuf,
    timeout: Duration,
}

impl Qpdf {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    async fn run_with_args(&self, out_dir: &Path, args: Vec<String>) -> Result<Output, EngineError> {
        let arg_file = out_dir.join("qpdf.args");
        tokio::fs::write(&arg_file, args.join("\n")).await?;

        let mut command = Command::new(&self.binary);
        command.arg(format!("@{}", arg_file.display()));
        let result = run_command(ENGINE, &mut command, self.timeout).await;

        if let Err(err) = tokio::fs::remove_file(&arg_file).await {
            log::warn!("Could not remove qpdf argument file: {}", err);
        }
        result
    }
}

impl PdfSecurity for Qpdf {
    fn protect<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        password: &'a str,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>> {
        async move {
            let target = out_dir.join("protected.pdf");
            let args = vec![
                "--encrypt".to_string(),
                password.to_string(),
                password.to_string(),
                "256".to_string(),
                "--".to_string(),
                input.display().to_string(),
                target.display().to_string(),
            ];
            let output = self.run_with_args(out_dir, args).await?;
            accept_warnings(&output)?;
            existing(ENGINE, target)
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
            let target = out_dir.join("unlocked.pdf");
            let args = vec![
                format!("--password={}", password),
                "--decrypt".to_string(),
                input.display().to_string(),
                target.display().to_string(),
            ];
            let output = self.run_with_args(out_dir, args).await?;
            if String::from_utf8_lossy(&output.stderr).contains("invalid password") {
                return Err(EngineError::WrongPassword);
            }
            accept_warnings(&output)?;
            existing(ENGINE, target)
        }
        .boxed()
    }
}

fn accept_warnings(output: &Output) -> Result<(), EngineError> {
    if output.status.code() == Some(EXIT_WARNINGS) {
        log::warn!("qpdf finished with warnings");
        return Ok(());
    }
    check_status(ENGINE, output)
}
