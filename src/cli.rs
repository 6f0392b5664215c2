use clap::Parser;
use std::path::PathBuf;
use vhost_hunter::SignatureMode;

#[derive(clap::Parser, Debug)]
#[command(author, version, about = "Discover virtual hosts by probing a server with candidate Host headers", long_about = None)]
pub struct Cli {
    /// Target host, IP, or IPv4 last-octet range (e.g. 10.11.1.1-255)
    #[arg(short = 't', long)]
    pub target: String,

    /// Newline-delimited candidate names
    #[arg(short = 'w', long)]
    pub wordlist: Option<PathBuf>,

    /// Also read candidate names from stdin
    #[arg(long, default_value_t = false)]
    pub stdin: bool,

    /// Value substituted for %s in candidate names (default: the target address)
    #[arg(short = 'b', long = "base-host")]
    pub base_host: Option<String>,

    /// Port to connect to
    #[arg(short = 'p', long, default_value_t = 80)]
    pub port: u16,

    /// Port the server believes it listens on, when scanning through a forwarder
    #[arg(short = 'r', long = "real-port")]
    pub real_port: Option<u16>,

    /// Comma separated status codes to ignore
    #[arg(long = "ignore-http-codes", value_delimiter = ',', default_value = "404")]
    pub ignore_http_codes: Vec<u16>,

    /// Ignore responses of exactly this content length (0 disables)
    #[arg(long = "ignore-content-length", default_value_t = 0)]
    pub ignore_content_length: u64,

    /// Groups with at most this many hosts are reported as likely matches
    #[arg(long = "unique-depth", default_value_t = 1)]
    pub unique_depth: usize,

    /// Connect over TLS
    #[arg(long, default_value_t = false)]
    pub ssl: bool,

    /// Merge groups whose bodies are near-identical
    #[arg(long = "fuzzy-logic", default_value_t = false)]
    pub fuzzy_logic: bool,

    /// Seconds each worker waits between requests
    #[arg(long = "rate-limit", default_value_t = 0.0)]
    pub rate_limit: f64,

    /// Add loopback source headers (X-Forwarded-For and friends)
    #[arg(long, default_value_t = false)]
    pub waf: bool,

    /// Concurrent requests
    #[arg(short = 'c', long, default_value_t = 1)]
    pub concurrency: usize,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10.0)]
    pub timeout: f64,

    /// Exact grouping key
    #[arg(long, value_enum, default_value_t = SignatureArg::StatusLength)]
    pub signature: SignatureArg,

    /// Write the full group listing to FILE
    #[arg(long = "oN", value_name = "FILE")]
    pub output_normal: Option<PathBuf>,

    /// Write JSON results to FILE
    #[arg(long = "oJ", value_name = "FILE")]
    pub output_json: Option<PathBuf>,

    /// Write one CSV row per probe to FILE
    #[arg(long = "oC", value_name = "FILE")]
    pub output_csv: Option<PathBuf>,

    /// Enable detailed debug logging
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// Enable verbose logging
    #[arg(long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureArg {
    /// Status code and content length
    StatusLength,
    /// Status code, content length and body hash
    Digest,
}

impl From<SignatureArg> for SignatureMode {
    fn from(arg: SignatureArg) -> Self {
        match arg {
            SignatureArg::StatusLength => SignatureMode::StatusLength,
            SignatureArg::Digest => SignatureMode::ContentDigest,
        }
    }
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_output_flags() {
        let cli = Cli::try_parse_from([
            "vhost_hunter",
            "-t",
            "10.0.0.1",
            "-w",
            "names.txt",
            "-p",
            "8443",
            "--ssl",
            "--ignore-http-codes",
            "404,403",
            "--oJ",
            "out.json",
            "--signature",
            "digest",
        ])
        .unwrap();
        assert_eq!(cli.port, 8443);
        assert!(cli.ssl);
        assert_eq!(cli.ignore_http_codes, vec![404, 403]);
        assert_eq!(cli.output_json, Some(PathBuf::from("out.json")));
        assert_eq!(SignatureMode::from(cli.signature), SignatureMode::ContentDigest);
    }

    #[test]
    fn defaults_match_scan_defaults() {
        let cli = Cli::try_parse_from(["vhost_hunter", "-t", "example.com"]).unwrap();
        assert_eq!(cli.ignore_http_codes, vec![404]);
        assert_eq!(cli.unique_depth, 1);
        assert_eq!(cli.concurrency, 1);
        assert!(cli.wordlist.is_none());
    }
}
