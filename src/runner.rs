use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::cli::Cli;
use vhost_hunter::output::{render_fuzzy, render_likely, write_csv, write_json, write_normal};
use vhost_hunter::waf::WafBypass;
use vhost_hunter::{Candidate, ScanConfig, Scanner};

fn print_banner() {
    println!(
        r#"
   _   ____  __         __    __  __            __
  | | / / / / /__  ___ / /_  / / / /_ _____  __/ /____ ____
  | |/ / _ \/ / _ \(_-</ __/ / _ \/ // / _ \/ _  __/ -_) __/
  |___/_//_/_/\___/___/\__/ /_//_/\_,_/_//_/\__/\__/\__/_/
"#
    );
}

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Keep reqwest/hyper at INFO so --debug stays readable
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!(
        "vhost_hunter={crate},reqwest=info,hyper=info",
        crate = crate_level
    );
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let candidates = load_candidates(cli.wordlist.as_deref(), cli.stdin).await?;
    if candidates.is_empty() {
        bail!("no candidate names: pass a wordlist with -w or pipe names with --stdin");
    }

    let config = build_config(&cli);
    let scanner = Scanner::new(config).context("invalid scan configuration")?;

    print_banner();
    print_configuration(&scanner, candidates.len());
    println!("\n{}\n", "-".repeat(60));

    let total = scanner.planned_requests(candidates.len()) as u64;
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("    {spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} hosts ({percent}%) | ETA: {eta}")
            .context("invalid progress bar template")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(120));
    let scanner = scanner.with_progress(pb.clone());

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n[!] Interrupted, finishing with partial results");
            on_signal.cancel();
        }
    });

    let started = std::time::Instant::now();
    let results = scanner.scan(candidates, cancel).await;
    pb.finish_and_clear();

    print!("{}", render_likely(&results));
    let fuzzy = render_fuzzy(&results);
    if !fuzzy.is_empty() {
        print!("{}", fuzzy);
    }

    if let Some(path) = &cli.output_normal {
        write_normal(path, &results).with_context(|| format!("writing {}", path.display()))?;
        println!("[+] Normal output written to {}", path.display());
    }
    if let Some(path) = &cli.output_json {
        write_json(path, &results).with_context(|| format!("writing {}", path.display()))?;
        println!("[+] JSON output written to {}", path.display());
    }
    if let Some(path) = &cli.output_csv {
        write_csv(path, &results).with_context(|| format!("writing {}", path.display()))?;
        println!("[+] CSV output written to {}", path.display());
    }

    let (completed, failed) = scanner.stats();
    println!(
        "\n[*] {} requests ({} failed) in {:.1}s",
        completed,
        failed,
        started.elapsed().as_secs_f64()
    );
    if results.iter().any(|r| r.cancelled) || results.len() < scanner.targets().count() {
        println!("[!] Scan was interrupted before completion");
    }
    Ok(())
}

fn build_config(cli: &Cli) -> ScanConfig {
    ScanConfig {
        target: cli.target.clone(),
        base_host: cli.base_host.clone(),
        port: cli.port,
        real_port: cli.real_port,
        ssl: cli.ssl,
        ignore_http_codes: cli.ignore_http_codes.iter().copied().collect::<BTreeSet<u16>>(),
        ignore_content_length: cli.ignore_content_length,
        unique_depth: cli.unique_depth,
        fuzzy_logic: cli.fuzzy_logic,
        rate_limit: cli.rate_limit,
        add_waf_bypass_headers: cli.waf,
        concurrency: cli.concurrency,
        timeout: cli.timeout,
        signature_mode: cli.signature.into(),
        ..ScanConfig::default()
    }
}

fn print_configuration(scanner: &Scanner, candidates: usize) {
    let config = scanner.config();
    let targets: Vec<&str> = scanner.targets().collect();
    println!("[>] Target: {} ({} address(es))", config.target, targets.len());
    println!("[>] Port: {} (real port {})", config.port, config.real_port());
    println!(
        "[~] Candidates: {} | concurrency: {} | rate limit: {}s | timeout: {}s",
        candidates, config.concurrency, config.rate_limit, config.timeout
    );
    let ignored: Vec<String> = config.ignore_http_codes.iter().map(u16::to_string).collect();
    println!("[·] Ignoring status codes: {}", ignored.join(","));
    if config.ignore_content_length > 0 {
        println!("[·] Ignoring content length: {}", config.ignore_content_length);
    }
    if config.ssl {
        println!("[·] TLS enabled (certificates are not verified)");
    }
    if config.fuzzy_logic {
        println!("[·] Fuzzy logic enabled (threshold {})", config.fuzzy_threshold);
    }
    if config.add_waf_bypass_headers {
        let bypass = WafBypass::new();
        println!("[·] WAF bypass: {}", WafBypass::explain_technique(&bypass.technique()));
    }
}

/// Wordlist file lines followed by stdin lines, trimmed, blanks skipped.
async fn load_candidates(wordlist: Option<&Path>, stdin: bool) -> anyhow::Result<Vec<Candidate>> {
    let mut names = Vec::new();
    if let Some(path) = wordlist {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading wordlist {}", path.display()))?;
        names.extend(parse_names(&content));
    }
    if stdin {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await.context("reading candidates from stdin")? {
            names.extend(parse_names(&line));
        }
    }
    tracing::info!(count = names.len(), "Loaded candidate names");
    Ok(names)
}

fn parse_names(content: &str) -> impl Iterator<Item = Candidate> + '_ {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(Candidate::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_skipped() {
        let names: Vec<String> = parse_names("www\n\n  dev \r\n%s-admin\n").map(|c| c.name).collect();
        assert_eq!(names, vec!["www", "dev", "%s-admin"]);
    }

    #[tokio::test]
    async fn missing_wordlist_is_an_error() {
        let err = load_candidates(Some(Path::new("/nonexistent/words.txt")), false).await;
        assert!(err.is_err());
    }
}
