use anyhow::{Context, Result, bail};
use clap::ArgMatches;
use colored::Colorize;
use fls_scout_core::probe::{ProbeOptions, execute_probe, partition_results};
use fls_scout_core::report::now_at;
use fls_scout_core::{PublishError, RunOutcome, ScoutConfig};
use fls_scout_scanner::Prober;
use fls_scout_scanner::prober::normalize_url;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Exit status used by `--fail-if-none` when nothing answered.
pub const EXIT_NO_LIVE_SERVERS: i32 = 2;

// Helper functions for the probe handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&String>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        parse_url_line(url)
            .with_context(|| format!("Invalid URL '{}'", url))
            .map(|url| vec![url])
    } else {
        bail!("Either --url or --hosts-file must be provided")
    }
}

/// Load URLs from a newline-delimited file. Blank lines and `#` comments are
/// skipped, so a manifest written by `run` can be fed straight back in.
pub fn load_urls_from_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read hosts file {}", path.display()))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        bail!("No valid URLs found in {}", path.display());
    }

    Ok(urls)
}

/// Parse a single line as a URL, adding http:// if it has no scheme
pub fn parse_url_line(line: &str) -> Option<String> {
    let candidate = normalize_url(line);
    match Url::parse(&candidate) {
        Ok(parsed) if parsed.host_str().is_some() => Some(candidate),
        _ => {
            eprintln!("{} Skipping invalid URL '{}'", "⚠".yellow(), line);
            None
        }
    }
}

/// Resolve the `run` subcommand's arguments into a [`ScoutConfig`].
pub fn build_config(args: &ArgMatches) -> Result<ScoutConfig> {
    let output_dir = args
        .get_one::<String>("output-dir")
        .map(|dir| shellexpand::tilde(dir).into_owned())
        .unwrap_or_else(|| ".".to_string());

    let mut config = ScoutConfig::default()
        .with_api_key(
            args.get_one::<String>("api-key")
                .filter(|key| !key.trim().is_empty())
                .cloned(),
        )
        .with_output_dir(output_dir)
        .with_threads(*args.get_one::<usize>("threads").unwrap_or(&10))?
        .with_probe_timeout(Duration::from_secs(
            *args.get_one::<u64>("timeout").unwrap_or(&5),
        ))?
        .with_utc_offset_hours(*args.get_one::<i32>("utc-offset").unwrap_or(&8))?;

    if let Some(search_url) = args.get_one::<String>("search-url") {
        config.search_url = search_url.clone();
    }
    if let Some(page) = args.get_one::<u32>("page") {
        config.page = *page;
    }
    if let Some(manifest) = args.get_one::<String>("manifest") {
        config.manifest_name = manifest.clone();
    }
    if let Some(status_page) = args.get_one::<String>("status-page") {
        config.status_page_name = status_page.clone();
    }
    config.json_path = args.get_one::<PathBuf>("json").cloned();
    config.accept_invalid_certs = args.get_flag("insecure");

    Ok(config)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

pub fn print_banner() {
    print_divider();
    println!(
        "{}",
        format!("  FLS-SCOUT v{}", env!("CARGO_PKG_VERSION"))
            .bright_white()
            .bold()
    );
    println!("  JetBrains license server discovery");
    print_divider();
    println!();
}

fn exit_code(live: usize, fail_if_none: bool) -> i32 {
    if live == 0 && fail_if_none {
        EXIT_NO_LIVE_SERVERS
    } else {
        0
    }
}

pub async fn handle_run(args: &ArgMatches, quiet: bool) -> Result<i32> {
    let config = build_config(args)?;
    let fail_if_none = args.get_flag("fail-if-none");
    let echo_manifest = !quiet && !args.get_flag("no-print");

    if !quiet {
        println!(
            "{} Updating server list - {}",
            "→".blue(),
            now_at(config.utc_offset).format("%Y-%m-%d %H:%M:%S")
        );
        if config.api_key.is_none() {
            println!("{} SHODAN_API_KEY is not set", "⚠".yellow());
        }
    }

    let outcome = fls_scout_core::run(&config, !quiet).await;
    print_run_summary(&outcome, &config, quiet);

    if echo_manifest && let Some(Ok(path)) = &outcome.published.manifest {
        print_manifest(path);
    }

    Ok(exit_code(outcome.live_count(), fail_if_none))
}

fn print_run_summary(outcome: &RunOutcome, config: &ScoutConfig, quiet: bool) {
    if let Some(ref error) = outcome.discovery_error {
        eprintln!("{} Search failed: {}", "✗".red().bold(), error);
    }

    if outcome.nothing_to_update() {
        println!("{} No servers found, nothing to update", "→".blue());
        return;
    }

    if !quiet {
        println!(
            "{} Search returned {} candidate(s)",
            "✓".green().bold(),
            outcome.candidates.len().to_string().cyan()
        );
        for result in &outcome.results {
            let marker = if result.is_live() {
                "✓".green().bold()
            } else {
                "✗".red().bold()
            };
            println!(
                "  {} {} {}",
                marker,
                result.url,
                format!("({})", result.outcome.label()).bright_black()
            );
        }
    }

    if let Some(ref report) = outcome.report {
        println!(
            "{} {} live, {} dead out of {}",
            "✓".green().bold(),
            report.live.len().to_string().green(),
            report.dead.len().to_string().red(),
            report.total()
        );
    }

    report_artifact("Manifest", &outcome.published.manifest);
    report_artifact("Status page", &outcome.published.status_page);
    report_artifact("JSON summary", &outcome.published.json);

    if !quiet && outcome.published.errors().is_empty() {
        println!(
            "{} Output directory: {}",
            "→".blue(),
            config.output_dir.display().to_string().bright_white()
        );
    }
}

fn report_artifact(label: &str, artifact: &Option<std::result::Result<PathBuf, PublishError>>) {
    match artifact {
        Some(Ok(path)) => println!(
            "{} {}: {}",
            "✓".green().bold(),
            label,
            path.display().to_string().bright_white()
        ),
        Some(Err(e)) => eprintln!("{} {}: {}", "✗".red().bold(), label, e),
        None => {}
    }
}

fn print_manifest(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => {
            println!();
            print_divider();
            print!("{}", content);
            print_divider();
        }
        Err(e) => eprintln!("{} Could not read back {}: {}", "⚠".yellow(), path.display(), e),
    }
}

pub async fn handle_probe(args: &ArgMatches, quiet: bool) -> Result<i32> {
    let urls = load_urls_from_source(
        args.get_one::<String>("url"),
        args.get_one::<PathBuf>("hosts-file"),
    )?;
    let threads = *args.get_one::<usize>("threads").unwrap_or(&10);
    let timeout = Duration::from_secs(*args.get_one::<u64>("timeout").unwrap_or(&5));

    if !quiet {
        println!("{} Probing {} server(s)", "→".blue(), urls.len());
        println!("Workers: {}", threads);
        println!("Timeout: {}s\n", timeout.as_secs());
    }

    let prober = Prober::with_options(timeout, args.get_flag("insecure"))
        .context("Failed to create HTTP client")?;
    let results = execute_probe(
        &prober,
        ProbeOptions {
            urls,
            threads: threads.max(1),
            show_progress_bar: !quiet,
        },
    )
    .await;

    for result in &results {
        if result.is_live() {
            println!("{} {}", "✓".green().bold(), result.url);
        } else {
            println!(
                "{} {} {}",
                "✗".red().bold(),
                result.url,
                format!("({})", result.outcome.label()).bright_black()
            );
        }
    }

    let (live, dead) = partition_results(&results);
    if !quiet {
        println!(
            "\n{} {} live, {} dead",
            "✓".green().bold(),
            live.len().to_string().green(),
            dead.len().to_string().red()
        );
    }

    Ok(exit_code(live.len(), args.get_flag("fail-if-none")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code() {
        assert_eq!(exit_code(0, false), 0);
        assert_eq!(exit_code(3, true), 0);
        assert_eq!(exit_code(0, true), EXIT_NO_LIVE_SERVERS);
    }
}
