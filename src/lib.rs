// Library root
// ------------
// This crate exposes the upload client behind the `bgerase` binary. The
// binary (`main.rs`) parses arguments and either runs one removal or opens
// the interactive menu.
//
// Module responsibilities:
// - `api`: the blocking `UploadClient` that POSTs one image and stores the
//   returned cut-out.
// - `multipart`: loading the source image and encoding the form body.
// - `config`: API key / endpoint / timeout resolution and the settings file.
// - `error`: the `UploadError` taxonomy.
// - `ui`: terminal menu flows, prompts and the upload spinner.
// - `logging`: tracing subscriber setup for the binary.
pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod multipart;
pub mod ui;

pub use api::{default_destination, ApiResponse, UploadClient};
pub use config::{ClientConfig, Settings};
pub use error::{Result, UploadError};
