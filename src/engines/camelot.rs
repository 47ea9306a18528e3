//! Table extraction through the Camelot CLI, exporting an Excel workbook.

use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

use super::{check_status, run_command, ConversionEngine, EngineError};

const ENGINE: &str = "camelot";

/// Ruled tables first, then whitespace-separated ones.
const FLAVORS: [&str; 2] = ["lattice", "stream"];

#[derive(Debug, Clone)]
pub struct Camelot {
    binary: PathBuf,
    timeout: Duration,
}

impl Camelot {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl ConversionEngine for Camelot {
    fn name(&self) -> &'static str {
        ENGINE
    }

    /// Fails with [`EngineError::NoOutput`] when neither flavor finds a table.
    fn convert<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, EngineError>> {
        async move {
            let target = out_dir.join("tables.xlsx");
            for flavor in FLAVORS {
                let mut command = Command::new(&self.binary);
                command
                    .args(["--pages", "all", "--format", "excel", "--output"])
                    .arg(&target)
                    .arg(flavor)
                    .arg(input);

                let output = run_command(ENGINE, &mut command, self.timeout).await?;
                if output.status.success() && target.is_file() {
                    return Ok(target);
                }
                if !reports_no_tables(&output) {
                    check_status(ENGINE, &output)?;
                }
                log::info!("camelot found no tables with the {} flavor", flavor);
            }
            Err(EngineError::NoOutput { engine: ENGINE })
        }
        .boxed()
    }
}

fn reports_no_tables(output: &Output) -> bool {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    stdout.contains("Found 0 tables") || stderr.contains("Found 0 tables") || stderr.contains("No tables found")
}
