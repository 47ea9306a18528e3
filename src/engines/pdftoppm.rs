//! Poppler's `pdftoppm` rasterizer.

use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::{check_status, run_command, EngineError, PageRasterizer, RasterFormat};

const ENGINE: &str = "pdftoppm";
const PREFIX: &str = "page";

#[derive(Debug, Clone)]
pub struct Pdftoppm {
    binary: PathBuf,
    timeout: Duration,
}

impl Pdftoppm {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl PageRasterizer for Pdftoppm {
    fn rasterize<'a>(
        &'a self,
        input: &'a Path,
        out_dir: &'a Path,
        format: RasterFormat,
        dpi: u32,
    ) -> BoxFuture<'a, Result<Vec<PathBuf>, EngineError>> {
        async move {
            let mut command = Command::new(&self.binary);
            command
                .arg(match format {
                    RasterFormat::Jpeg => "-jpeg",
                    RasterFormat::Png => "-png",
                })
                .arg("-r")
                .arg(dpi.to_string())
                .arg(input)
                .arg(out_dir.join(PREFIX));

            let output = run_command(ENGINE, &mut command, self.timeout).await?;
            check_status(ENGINE, &output)?;

            let pages = collect_pages(out_dir, format)?;
            if pages.is_empty() {
                return Err(EngineError::NoOutput { engine: ENGINE });
            }
            Ok(pages)
        }
        .boxed()
    }
}

/// pdftoppm zero-pads the page number to the width of the page count
/// (`page-1.jpg` or `page-01.jpg`), so order by the parsed number.
fn collect_pages(dir: &Path, format: RasterFormat) -> Result<Vec<PathBuf>, EngineError> {
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(format.extension()) {
            continue;
        }
        let number = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix(PREFIX))
            .and_then(|s| s.strip_prefix('-'))
            .and_then(|n| n.parse::<u32>().ok());
        if let Some(number) = number {
            pages.push((number, path));
        }
    }
    pages.sort_by_key(|(number, _)| *number);
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}
