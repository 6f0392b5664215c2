pub mod classify;
pub mod config;
pub mod errors;
pub mod http_client;
pub mod models;
pub mod output;
pub mod probe;
pub mod scanner;
pub mod waf;

// re-export the types callers need to drive a scan
pub use crate::config::{ScanConfig, SignatureMode};
pub use crate::errors::{ConfigError, RequestError, RequestErrorKind, ScanError};
pub use crate::models::{Candidate, Group, Outcome, ResultSet, ScanRecord, Signature};
pub use crate::scanner::Scanner;
