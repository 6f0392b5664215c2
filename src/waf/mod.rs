// WAF bypass headers
// Only sent when explicitly requested by the scan configuration

pub mod bypass;

pub use bypass::{BypassTechnique, WafBypass};
