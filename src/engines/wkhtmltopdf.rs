use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::{check_status, run_command, stderr_excerpt, ConversionEngine, EngineError};

const ENGINE: &str = "wkhtmltopdf";

#[derive(Debug, Clone)]
pub struct Wkhtmltopdf {
    binary: PathBuf,
    timeout: Duration,
}

impl Wkhtmltopdf {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl ConversionEngine for Wkhtmltopdf {
    fn name(&self) -> &'static str {
        ENGINE
    }

    fn convert<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>> {
        async move {
            let target = out_dir.join("out.pdf");
            let mut command = Command::new(&self.binary);
            command.arg("--quiet").arg(input).arg(&target);

            let output = run_command(ENGINE, &mut command, self.timeout).await?;
            // wkhtmltopdf exits non-zero on unreachable sub-resources while
            // still writing a usable document.
            if target.is_file() {
                if !output.status.success() {
                    log::warn!("wkhtmltopdf reported problems: {}", stderr_excerpt(&output));
                }
                return Ok(target);
            }
            check_status(ENGINE, &output)?;
            Err(EngineError::NoOutput { engine: ENGINE })
        }
        .boxed()
    }
}
