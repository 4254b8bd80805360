// Library root
// ------------
// A command-line client for the Splunkbase app marketplace. The binary
// (`main.rs`) parses arguments and hands them to `ui`.
//
// Module responsibilities:
// - `api`: the authenticated Splunkbase session (login, app id and metadata
//   lookups with per-session memoization, artifact download).
// - `models`: metadata documents and release selection rules.
// - `download`: checksum selection and the streaming copy loop.
// - `error`: the error kinds callers branch on.
// - `app_conf`, `extract`: local app.conf reading and .tgz unpacking.
// - `cli`, `ui`: argument definitions and the command implementations.
pub mod api;
pub mod app_conf;
pub mod cli;
pub mod download;
pub mod error;
pub mod extract;
pub mod models;
pub mod ui;

pub use api::{Credentials, Downloaded, Session, SessionConfig};
pub use error::{ClientError, DownloadFailure, Result};
