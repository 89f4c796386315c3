//! Encoding of local experiment files for upload over the channel.

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};

use crate::error::{Error, Result};

const DATA_URL_PREFIX: &str = "data:application/octet-stream;base64,";

/// File prepared for a `dials.import` upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedFile {
    /// Bare file name, without directories.
    pub filename: String,
    /// Contents as a base64 data URL.
    pub data_url: String,
}

/// Read `path` and encode it as a data URL.
///
/// # Errors
///
/// Returns [`Error::NotAFile`] if the path has no file name and
/// [`Error::Io`] if it cannot be read.
pub fn encode_file(path: &Path) -> Result<EncodedFile> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| Error::NotAFile(path.display().to_string()))?;
    let bytes = std::fs::read(path)?;
    log::debug!("encoding {filename} ({} bytes) for upload", bytes.len());
    Ok(EncodedFile {
        filename,
        data_url: to_data_url(&bytes),
    })
}

/// Encode raw bytes as an `application/octet-stream` data URL.
#[must_use]
pub fn to_data_url(bytes: &[u8]) -> String {
    let mut url = String::with_capacity(DATA_URL_PREFIX.len() + bytes.len().div_ceil(3) * 4);
    url.push_str(DATA_URL_PREFIX);
    general_purpose::STANDARD.encode_string(bytes, &mut url);
    url
}
