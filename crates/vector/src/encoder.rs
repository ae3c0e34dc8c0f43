/// File → base64 text, for blob properties and image queries.
use std::{io, path::Path};

use {
    base64::{Engine as _, engine::general_purpose::STANDARD},
    mmrag_common::{Error, Result},
};

/// Read `path` and return its bytes as standard base64.
pub fn encode_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| read_error(path, e))?;
    Ok(STANDARD.encode(bytes))
}

/// Async variant of [`encode_file`] for use inside request handlers.
pub async fn encode_file_async(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| read_error(path, e))?;
    Ok(STANDARD.encode(bytes))
}

pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|e| Error::Serialization(format!("invalid base64: {e}")))
}

fn read_error(path: &Path, source: io::Error) -> Error {
    if source.kind() == io::ErrorKind::NotFound {
        Error::file_not_found(path)
    } else {
        Error::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
