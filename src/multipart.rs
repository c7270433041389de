// Multipart/form-data encoding for the upload request. The encoder is a
// pure function over already-loaded bytes so it can be tested without a
// network or a filesystem.

use crate::error::{Result, UploadError};
use std::path::Path;
use uuid::Uuid;

const CRLF: &str = "\r\n";

/// Media type used when the extension tells us nothing.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// An image read from disk, ready to be sent as a form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    /// Read the whole file and derive its base name and media type.
    pub fn load(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                UploadError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
                )
            })?;
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let bytes = std::fs::read(path).map_err(|e| UploadError::io(path, e))?;

        Ok(ImageFile {
            file_name,
            content_type,
            bytes,
        })
    }

    /// The `image_file` form part the background-removal API expects.
    pub fn into_field(self) -> MultipartField {
        MultipartField {
            name: "image_file".to_string(),
            file_name: Some(self.file_name),
            content_type: Some(self.content_type),
            bytes: self.bytes,
        }
    }
}

/// One part of a multipart/form-data body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A fresh boundary token: `----` followed by 32 random hex characters.
pub fn generate_boundary() -> String {
    format!("----{}", Uuid::new_v4().simple())
}

/// Value of the request `Content-Type` header for `boundary`.
pub fn content_type_header(boundary: &str) -> String {
    format!("multipart/form-data; boundary={}", boundary)
}

/// Escape a value for use inside a quoted header parameter.
///
/// Double quotes are backslash-escaped. Line breaks are percent-encoded so a
/// hostile file name cannot start a new header line.
pub fn escape_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\r' => out.push_str("%0D"),
            '\n' => out.push_str("%0A"),
            other => out.push(other),
        }
    }
    out
}

/// Encode `fields` as a multipart/form-data body delimited by `boundary`.
pub fn encode_multipart(boundary: &str, fields: &[MultipartField]) -> Vec<u8> {
    let payload: usize = fields.iter().map(|f| f.bytes.len()).sum();
    let mut body = Vec::with_capacity(payload + 256 * fields.len().max(1));

    for field in fields {
        body.extend_from_slice(format!("--{}{}", boundary, CRLF).as_bytes());

        let mut disposition = format!(
            "Content-Disposition: form-data; name=\"{}\"",
            escape_quoted(&field.name)
        );
        if let Some(file_name) = &field.file_name {
            disposition.push_str(&format!("; filename=\"{}\"", escape_quoted(file_name)));
        }
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(CRLF.as_bytes());

        if let Some(content_type) = &field.content_type {
            body.extend_from_slice(format!("Content-Type: {}{}", content_type, CRLF).as_bytes());
        }
        body.extend_from_slice(CRLF.as_bytes());
        body.extend_from_slice(&field.bytes);
        body.extend_from_slice(CRLF.as_bytes());
    }

    body.extend_from_slice(format!("--{}--{}", boundary, CRLF).as_bytes());
    body
}
