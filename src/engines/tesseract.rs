use futures_util::future::{BoxFuture, FutureExt};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use super::{check_status, run_command, EngineError, TextRecognizer};

const ENGINE: &str = "tesseract";

#[derive(Debug, Clone)]
pub struct Tesseract {
    binary: PathBuf,
    timeout: Duration,
}

impl Tesseract {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl TextRecognizer for Tesseract {
    fn recognize<'a>(&'a self, image: &'a Path) -> BoxFuture<'a, Result<String, EngineError>> {
        async move {
            let mut command = Command::new(&self.binary);
            command.arg(image).arg("stdout");
            let output = run_command(ENGINE, &mut command, self.timeout).await?;
            check_status(ENGINE, &output)?;
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
        .boxed()
    }
}
