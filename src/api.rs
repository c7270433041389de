// API client module: a small blocking HTTP client that uploads one image to
// the background-removal service and stores the cut-out it returns.
// One call is one POST; there is no retry and no streaming.

use crate::config::ClientConfig;
use crate::error::{Result, UploadError};
use crate::multipart::{content_type_header, encode_multipart, generate_boundary, ImageFile};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const API_KEY_HEADER: &str = "x-api-key";

/// Status code plus body of one API call.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    /// `Content-Type` the service declared for the body, if any.
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK.as_u16()
    }

    /// The body as an error message. Invalid UTF-8 is replaced, not rejected.
    pub fn message(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Output path used when none is given: `<stem>-nobg.png` next to `source`.
pub fn default_destination(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    source.with_file_name(format!("{}-nobg.png", stem))
}

/// Write `bytes` to a temp file beside `destination`, then rename it into
/// place. On failure the destination is left as it was and the temp file
/// is removed.
pub fn write_atomically(destination: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match destination.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| UploadError::io(destination, e))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| UploadError::io(destination, e))?;
    tmp.persist(destination)
        .map_err(|e| UploadError::io(destination, e.error))?;
    Ok(())
}

/// Absolute form of an already-written `path`. Falls back to joining the
/// working directory when the path cannot be canonicalized.
fn absolute_path(path: &Path) -> PathBuf {
    match std::fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!(path = %path.display(), "cannot canonicalize output path: {}", e);
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    }
}

/// Upload client holding a configured reqwest blocking client and the
/// endpoint/key it was built for.
#[derive(Clone)]
pub struct UploadClient {
    client: Client,
    config: ClientConfig,
}

impl UploadClient {
    /// Build a client with the connect and request timeouts from `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| UploadError::config(format!("failed to build HTTP client: {}", e)))?;
        Ok(UploadClient { client, config })
    }

    fn headers(&self, boundary: &str) -> Result<HeaderMap> {
        let mut key = HeaderValue::from_str(&self.config.api_key)
            .map_err(|_| UploadError::config("API key contains characters not allowed in a header"))?;
        key.set_sensitive(true);
        let content_type = HeaderValue::from_str(&content_type_header(boundary))
            .map_err(|_| UploadError::config("invalid multipart boundary"))?;

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), key);
        headers.insert(CONTENT_TYPE, content_type);
        Ok(headers)
    }

    // A request that never left the builder means the endpoint is malformed.
    fn request_error(&self, e: reqwest::Error) -> UploadError {
        if e.is_builder() {
            UploadError::config(format!("invalid endpoint {}: {}", self.config.endpoint, e))
        } else {
            UploadError::Network(e)
        }
    }

    /// POST an already-encoded multipart body and collect the full response.
    pub fn send(&self, boundary: &str, body: Vec<u8>) -> Result<ApiResponse> {
        let res = self
            .client
            .post(&self.config.endpoint)
            .headers(self.headers(boundary)?)
            .body(body)
            .send()
            .map_err(|e| self.request_error(e))?;

        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let bytes = res.bytes()?.to_vec();

        debug!(status, content_type = ?content_type, bytes = bytes.len(), "received response");
        Ok(ApiResponse {
            status,
            content_type,
            bytes,
        })
    }

    /// Remove the background of the image at `source` and write the result
    /// to `destination`, overwriting it. Returns the absolute output path.
    ///
    /// The destination is only touched after a complete 200 response; any
    /// other status comes back as `UploadError::Api` with the body as text.
    pub fn remove_background(&self, source: &Path, destination: &Path) -> Result<PathBuf> {
        info!(source = %source.display(), endpoint = %self.config.endpoint, "removing background");

        let image = ImageFile::load(source)?;
        let boundary = generate_boundary();
        debug!(
            file_name = %image.file_name,
            content_type = %image.content_type,
            size = image.bytes.len(),
            %boundary,
            "loaded source image"
        );
        let body = encode_multipart(&boundary, &[image.into_field()]);

        let response = self.send(&boundary, body)?;
        if !response.is_success() {
            let message = response.message();
            warn!(status = response.status, %message, "background removal rejected");
            return Err(UploadError::Api {
                status: response.status,
                message,
            });
        }

        write_atomically(destination, &response.bytes)?;
        let saved = absolute_path(destination);
        info!(path = %saved.display(), bytes = response.bytes.len(), "saved output image");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_message_is_lossy_utf8() {
        let res = ApiResponse {
            status: 400,
            content_type: None,
            bytes: vec![b'b', b'a', b'd', 0xff],
        };
        assert!(!res.is_success());
        assert_eq!(res.message(), "bad\u{fffd}");
    }

    #[test]
    fn only_200_counts_as_success() {
        let mk = |status| ApiResponse {
            status,
            content_type: None,
            bytes: Vec::new(),
        };
        assert!(mk(200).is_success());
        assert!(!mk(201).is_success());
        assert!(!mk(204).is_success());
    }

    #[test]
    fn default_destination_sits_next_to_source() {
        assert_eq!(
            default_destination(Path::new("photos/cat.jpg")),
            PathBuf::from("photos/cat-nobg.png")
        );
        assert_eq!(
            default_destination(Path::new("logo.png")),
            PathBuf::from("logo-nobg.png")
        );
    }

    #[test]
    fn malformed_endpoint_is_config_error() {
        let config = ClientConfig::new("k").with_endpoint("not a url");
        let client = UploadClient::new(config).unwrap();
        let err = client.send("b", Vec::new()).unwrap_err();
        assert!(matches!(err, UploadError::Config(_)), "got {:?}", err);
        assert!(err.to_string().contains("not a url"));
    }

    #[test]
    fn atomic_write_replaces_contents_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("out.png");
        std::fs::write(&destination, b"a much longer previous output").unwrap();

        write_atomically(&destination, b"PNGDATA").unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"PNGDATA");
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn failed_atomic_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        // Renaming a file over a non-empty directory fails.
        let destination = dir.path().join("taken");
        std::fs::create_dir(&destination).unwrap();
        std::fs::write(destination.join("keep.txt"), b"x").unwrap();

        let err = write_atomically(&destination, b"PNGDATA").unwrap_err();

        assert!(matches!(err, UploadError::Io { .. }));
        assert!(destination.is_dir());
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn absolute_path_falls_back_to_working_directory() {
        let relative = Path::new("definitely-not-here-bgerase/out.png");
        let resolved = absolute_path(relative);
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with(relative));
    }

    #[test]
    fn headers_carry_key_and_boundary() {
        let client = UploadClient::new(ClientConfig::new("secret-key")).unwrap();
        let headers = client.headers("----abc").unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "secret-key");
        assert!(headers.get("x-api-key").unwrap().is_sensitive());
        assert_eq!(
            headers.get(CONTENT_TYPE).unwrap(),
            "multipart/form-data; boundary=----abc"
        );
    }

    #[test]
    fn key_with_newline_is_rejected() {
        let client = UploadClient::new(ClientConfig::new("bad\nkey")).unwrap();
        assert!(matches!(
            client.headers("b").unwrap_err(),
            UploadError::Config(_)
        ));
    }
}
