//! Runtime configuration, read once from the environment at startup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for the sum of all parts of one multipart upload.
    pub max_upload_bytes: u64,
    pub raster_dpi: u32,
    /// Slides are rendered at a lower resolution than JPG exports.
    pub ppt_dpi: u32,
    pub jpeg_quality: u8,
    pub engine_timeout_secs: u64,
    pub binaries: EngineBinaries,
}

/// Executable names or absolute paths of the external engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineBinaries {
    pub libreoffice: PathBuf,
    pub pdftoppm: PathBuf,
    pub tesseract: PathBuf,
    pub camelot: PathBuf,
    pub ghostscript: PathBuf,
    pub wkhtmltopdf: PathBuf,
    pub qpdf: PathBuf,
}

impl Default for EngineBinaries {
    fn default() -> Self {
        Self {
            libreoffice: PathBuf::from("libreoffice"),
            pdftoppm: PathBuf::from("pdftoppm"),
            tesseract: PathBuf::from("tesseract"),
            camelot: PathBuf::from("camelot"),
            ghostscript: PathBuf::from("gs"),
            wkhtmltopdf: PathBuf::from("wkhtmltopdf"),
            qpdf: PathBuf::from("qpdf"),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: 50 * 1024 * 1024, // 50MB
            raster_dpi: 200,
            ppt_dpi: 150,
            jpeg_quality: 90,
            engine_timeout_secs: 120,
            binaries: EngineBinaries::default(),
        }
    }
}

impl GatewayConfig {
    /// Defaults overridden by whatever is set in the environment.
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("PDF_TOOLS_HOST") {
            config.host = host;
        }
        override_parsed("PORT", &mut config.port);
        let mut upload_mb = config.max_upload_bytes / (1024 * 1024);
        override_parsed("PDF_TOOLS_MAX_UPLOAD_MB", &mut upload_mb);
        config.max_upload_bytes = upload_mb * 1024 * 1024;
        override_parsed("PDF_TOOLS_RASTER_DPI", &mut config.raster_dpi);
        override_parsed("PDF_TOOLS_PPT_DPI", &mut config.ppt_dpi);
        override_parsed("PDF_TOOLS_JPEG_QUALITY", &mut config.jpeg_quality);
        override_parsed("PDF_TOOLS_ENGINE_TIMEOUT", &mut config.engine_timeout_secs);

        let bins = &mut config.binaries;
        override_path("LIBREOFFICE_BIN", &mut bins.libreoffice);
        override_path("PDFTOPPM_BIN", &mut bins.pdftoppm);
        override_path("TESSERACT_BIN", &mut bins.tesseract);
        override_path("CAMELOT_BIN", &mut bins.camelot);
        override_path("GS_BIN", &mut bins.ghostscript);
        override_path("WKHTMLTOPDF_BIN", &mut bins.wkhtmltopdf);
        override_path("QPDF_BIN", &mut bins.qpdf);

        config.jpeg_quality = config.jpeg_quality.clamp(1, 100);
        config
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout_secs)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn override_parsed<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("Ignoring invalid value for {}: {:?}", key, raw),
        }
    }
}

fn override_path(key: &str, target: &mut PathBuf) {
    if let Some(value) = std::env::var_os(key).filter(|v| !v.is_empty()) {
        *target = PathBuf::from(value);
    }
}
