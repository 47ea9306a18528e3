//! Zip bundles for endpoints that produce one file per page.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::types::ConversionError;

/// Pack `(name, content)` entries into an in-memory zip, in the order given.
pub fn zip_entries<N, C>(entries: impl IntoIterator<Item = (N, C)>) -> Result<Vec<u8>, ConversionError>
where
    N: AsRef<str>,
    C: AsRef<[u8]>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    for (name, content) in entries {
        writer.start_file(name.as_ref(), options)?;
        writer.write_all(content.as_ref())?;
        count += 1;
    }

    let bytes = writer.finish()?.into_inner();
    log::debug!("Packed {} entries into {} byte archive", count, bytes.len());
    Ok(bytes)
}
