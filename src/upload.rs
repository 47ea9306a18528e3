//! Multipart form handling: file parts are streamed into the request
//! workspace, plain parts are kept as text fields.

use actix_multipart::Multipart;
use futures_util::TryStreamExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::io::AsyncWriteExt;

use crate::types::ConversionError;
use crate::workspace::Workspace;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl UploadedFile {
    /// Client file name without its extension, for naming outputs.
    pub fn stem(&self) -> &str {
        Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document")
    }
}

#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(
        mut payload: Multipart,
        workspace: &Workspace,
        max_bytes: u64,
    ) -> Result<Self, ConversionError> {
        let mut form = UploadForm::default();
        let mut received: u64 = 0;

        while let Some(mut field) = payload.try_next().await? {
            let disposition = field.content_disposition();
            let name = disposition.get_name().unwrap_or_default().to_string();
            let file_name = disposition.get_filename().map(sanitize_file_name);

            match file_name {
                Some(file_name) => {
                    let path = workspace.file_path(&extension_of(&file_name));
                    let mut out = tokio::fs::File::create(&path).await?;
                    let mut size: u64 = 0;
                    while let Some(chunk) = field.try_next().await? {
                        size += chunk.len() as u64;
                        received += chunk.len() as u64;
                        if received > max_bytes {
                            return Err(ConversionError::PayloadTooLarge { limit: max_bytes });
                        }
                        out.write_all(&chunk).await?;
                    }
                    out.flush().await?;

                    log::info!("📥 Received '{}' ({} bytes) as field '{}'", file_name, size, name);
                    form.files.push(UploadedFile {
                        field: name,
                        file_name,
                        path,
                        size,
                    });
                }
                None => {
                    let mut value = Vec::new();
                    while let Some(chunk) = field.try_next().await? {
                        received += chunk.len() as u64;
                        if received > max_bytes {
                            return Err(ConversionError::PayloadTooLarge { limit: max_bytes });
                        }
                        value.extend_from_slice(&chunk);
                    }
                    let value = String::from_utf8(value).map_err(|_| ConversionError::InvalidField {
                        field: name.clone(),
                        message: "not valid UTF-8".to_string(),
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    pub fn file(&self, field: &str) -> Result<&UploadedFile, ConversionError> {
        self.files
            .iter()
            .find(|f| f.field == field)
            .ok_or_else(|| ConversionError::MissingField {
                field: field.to_string(),
            })
    }

    /// All files sent under `field`, in upload order. At least one is required.
    pub fn files(&self, field: &str) -> Result<Vec<&UploadedFile>, ConversionError> {
        let files: Vec<_> = self.files.iter().filter(|f| f.field == field).collect();
        if files.is_empty() {
            return Err(ConversionError::MissingField {
                field: field.to_string(),
            });
        }
        Ok(files)
    }

    pub fn text(&self, field: &str) -> Result<&str, ConversionError> {
        self.optional_text(field)
            .ok_or_else(|| ConversionError::MissingField {
                field: field.to_string(),
            })
    }

    pub fn optional_text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn parse<T: FromStr>(&self, field: &str) -> Result<T, ConversionError> {
        let raw = self.text(field)?;
        parse_field(field, raw)
    }

    pub fn parse_or<T: FromStr>(&self, field: &str, default: T) -> Result<T, ConversionError> {
        match self.optional_text(field) {
            Some(raw) => parse_field(field, raw),
            None => Ok(default),
        }
    }

    /// A finite `f32`; `NaN` and infinities are rejected.
    pub fn number(&self, field: &str) -> Result<f32, ConversionError> {
        finite(field, self.parse(field)?)
    }

    pub fn number_or(&self, field: &str, default: f32) -> Result<f32, ConversionError> {
        finite(field, self.parse_or(field, default)?)
    }
}

fn finite(field: &str, value: f32) -> Result<f32, ConversionError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ConversionError::InvalidField {
            field: field.to_string(),
            message: format!("{} is not a finite number", value),
        })
    }
}

fn parse_field<T: FromStr>(field: &str, raw: &str) -> Result<T, ConversionError> {
    raw.trim().parse().map_err(|_| ConversionError::InvalidField {
        field: field.to_string(),
        message: format!("cannot parse {:?}", raw),
    })
}

/// Keep only the final path component of a client-supplied name.
fn sanitize_file_name(raw: &str) -> String {
    let name = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let name: String = name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != ';')
        .collect();
    if name.trim().is_empty() {
        "upload".to_string()
    } else {
        name
    }
}

fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
