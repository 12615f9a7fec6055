// Artifact rendering and publishing: the manifest, the status page and the
// optional JSON summary.

use crate::config::ScoutConfig;
use crate::error::PublishError;
use chrono::{DateTime, FixedOffset, Utc};
use fls_scout_scanner::ProbeResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const MANIFEST_TITLE: &str = "JetBrains License Servers";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The classified outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<FixedOffset>,
    pub live: Vec<String>,
    pub dead: Vec<String>,
}

impl RunReport {
    pub fn new(live: Vec<String>, dead: Vec<String>, generated_at: DateTime<FixedOffset>) -> Self {
        Self {
            generated_at,
            live,
            dead,
        }
    }

    /// Build a report from results already sorted in discovery order.
    pub fn from_results(results: &[ProbeResult], generated_at: DateTime<FixedOffset>) -> Self {
        let (live, dead) = crate::probe::partition_results(results);
        Self::new(live, dead, generated_at)
    }

    pub fn total(&self) -> usize {
        self.live.len() + self.dead.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.dead.is_empty()
    }

    pub fn timestamp(&self) -> String {
        self.generated_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Current time at the given fixed offset.
pub fn now_at(offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&offset)
}

/// Render the plain-text manifest. Only live servers are listed.
pub fn render_manifest(report: &RunReport) -> String {
    let mut manifest = String::new();
    manifest.push_str(&format!("# {}\n", MANIFEST_TITLE));
    manifest.push_str(&format!("# Generated: {}\n\n", report.timestamp()));
    for url in &report.live {
        manifest.push_str(url);
        manifest.push('\n');
    }
    manifest
}

const STATUS_PAGE_STYLE: &str = r#"
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Arial, sans-serif;
            max-width: 860px;
            margin: 0 auto;
            padding: 20px;
            background-color: #f5f5f5;
            color: #2b2b2b;
        }
        .container {
            background-color: #fff;
            padding: 20px;
            border-radius: 8px;
            box-shadow: 0 2px 4px rgba(0, 0, 0, 0.1);
        }
        h1 { text-align: center; }
        h2 { margin-top: 28px; }
        .update-time { color: #666; text-align: center; margin-bottom: 20px; }
        .stats { display: flex; justify-content: space-around; margin-bottom: 20px; }
        .stat { text-align: center; }
        .stat-value { display: block; font-size: 28px; font-weight: bold; }
        .stat-live .stat-value { color: #28a745; }
        .stat-dead .stat-value { color: #dc3545; }
        .server-list { list-style: none; padding: 0; }
        .server-item {
            padding: 10px;
            margin: 5px 0;
            background-color: #f8f9fa;
            border: 1px solid #e9ecef;
            border-radius: 4px;
            word-break: break-all;
            display: flex;
            justify-content: space-between;
            align-items: center;
        }
        .server-item:hover { background-color: #e9ecef; }
        .server-item.dead .server-url { color: #888; text-decoration: line-through; }
        .server-item.empty { color: #888; justify-content: center; }
        .copy-btn {
            background-color: #007bff;
            color: #fff;
            border: none;
            padding: 5px 10px;
            border-radius: 4px;
            cursor: pointer;
            font-size: 14px;
        }
        .copy-btn:hover { background-color: #0056b3; }
        .copy-btn.copied { background-color: #28a745; }
        @media (max-width: 600px) {
            body { padding: 10px; }
            .server-item { font-size: 14px; }
            .copy-btn { padding: 4px 8px; font-size: 12px; }
        }
"#;

const STATUS_PAGE_SCRIPT: &str = r#"
        function markCopied(button) {
            button.textContent = 'Copied';
            button.classList.add('copied');
            setTimeout(function () {
                button.textContent = 'Copy';
                button.classList.remove('copied');
            }, 2000);
        }

        function fallbackCopy(text) {
            const input = document.createElement('textarea');
            input.value = text;
            document.body.appendChild(input);
            input.select();
            document.execCommand('copy');
            document.body.removeChild(input);
        }

        document.querySelectorAll('.copy-btn').forEach(function (button) {
            button.addEventListener('click', function () {
                const text = button.getAttribute('data-url');
                if (navigator.clipboard && window.isSecureContext) {
                    navigator.clipboard.writeText(text)
                        .then(function () { markCopied(button); })
                        .catch(function () { fallbackCopy(text); markCopied(button); });
                } else {
                    fallbackCopy(text);
                    markCopied(button);
                }
            });
        });
"#;

/// Render the self-contained HTML status page.
pub fn render_status_page(report: &RunReport) -> String {
    let mut html = String::new();

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("    <meta charset=\"UTF-8\">\n");
    html.push_str(
        "    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n",
    );
    html.push_str(&format!("    <title>{}</title>\n", MANIFEST_TITLE));
    html.push_str(&format!("    <style>{}    </style>\n", STATUS_PAGE_STYLE));
    html.push_str("</head>\n<body>\n<div class=\"container\">\n");

    html.push_str(&format!("    <h1>{}</h1>\n", MANIFEST_TITLE));
    html.push_str(&format!(
        "    <div class=\"update-time\">Updated: <span id=\"generated-at\">{}</span></div>\n",
        report.timestamp()
    ));

    html.push_str("    <div class=\"stats\">\n");
    push_stat(&mut html, "total", "Total", report.total());
    push_stat(&mut html, "live", "Live", report.live.len());
    push_stat(&mut html, "dead", "Dead", report.dead.len());
    html.push_str("    </div>\n");

    push_server_list(&mut html, "live", "Live servers", &report.live);
    push_server_list(&mut html, "dead", "Unreachable servers", &report.dead);

    html.push_str("</div>\n");
    html.push_str(&format!("<script>{}</script>\n", STATUS_PAGE_SCRIPT));
    html.push_str("</body>\n</html>\n");

    html
}

fn push_stat(html: &mut String, key: &str, label: &str, value: usize) {
    html.push_str(&format!(
        "        <div class=\"stat stat-{key}\"><span class=\"stat-value\" id=\"{key}-count\">{value}</span>{label}</div>\n"
    ));
}

fn push_server_list(html: &mut String, key: &str, heading: &str, urls: &[String]) {
    html.push_str(&format!("    <h2>{}</h2>\n", heading));
    html.push_str(&format!(
        "    <ul class=\"server-list\" id=\"{}-servers\">\n",
        key
    ));

    if urls.is_empty() {
        html.push_str("        <li class=\"server-item empty\">None</li>\n");
    }

    for url in urls {
        let escaped = escape_html(url);
        html.push_str(&format!(
            "        <li class=\"server-item {key}\"><span class=\"server-url\">{escaped}</span>\
             <button class=\"copy-btn\" data-url=\"{escaped}\">Copy</button></li>\n"
        ));
    }

    html.push_str("    </ul>\n");
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the run as pretty JSON, including per-candidate detail.
pub fn generate_json_report(
    report: &RunReport,
    results: &[ProbeResult],
) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "fls-scout",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": report.generated_at.to_rfc3339(),
            },
            "summary": {
                "total": report.total(),
                "live": report.live.len(),
                "dead": report.dead.len(),
            },
            "live": report.live,
            "dead": report.dead,
            "probes": results.iter().map(|r| serde_json::json!({
                "url": r.url,
                "live": r.is_live(),
                "status_code": r.outcome.status_code(),
                "outcome": r.outcome,
                "response_time_ms": r.response_time.as_millis() as u64,
            })).collect::<Vec<_>>(),
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// Write `content` to `path`, replacing whatever was there.
pub fn save_report(content: &str, path: &Path) -> Result<(), PublishError> {
    let to_io_error = |source| PublishError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_io_error)?;
    }
    fs::write(path, content).map_err(to_io_error)
}

/// What happened to each artifact. `None` means the artifact was not
/// attempted.
#[derive(Debug, Default)]
pub struct PublishOutcome {
    pub manifest: Option<Result<PathBuf, PublishError>>,
    pub status_page: Option<Result<PathBuf, PublishError>>,
    pub json: Option<Result<PathBuf, PublishError>>,
}

impl PublishOutcome {
    pub fn is_skipped(&self) -> bool {
        self.manifest.is_none() && self.status_page.is_none() && self.json.is_none()
    }

    pub fn errors(&self) -> Vec<&PublishError> {
        [&self.manifest, &self.status_page, &self.json]
            .into_iter()
            .filter_map(|artifact| artifact.as_ref().and_then(|r| r.as_ref().err()))
            .collect()
    }
}

/// Write every artifact for `report`. Each write is independent: a failure
/// is recorded and the remaining artifacts are still attempted. Nothing is
/// written for an empty report.
pub fn publish(report: &RunReport, results: &[ProbeResult], config: &ScoutConfig) -> PublishOutcome {
    if report.is_empty() {
        info!("No servers to publish, skipping artifacts");
        return PublishOutcome::default();
    }

    let manifest = write_artifact(&render_manifest(report), config.manifest_path());
    let status_page = write_artifact(&render_status_page(report), config.status_page_path());

    let json = config.json_path().map(|path| {
        generate_json_report(report, results)
            .map_err(PublishError::from)
            .and_then(|content| write_artifact(&content, path))
    });

    PublishOutcome {
        manifest: Some(manifest),
        status_page: Some(status_page),
        json,
    }
}

fn write_artifact(content: &str, path: PathBuf) -> Result<PathBuf, PublishError> {
    match save_report(content, &path) {
        Ok(()) => {
            info!("Wrote {}", path.display());
            Ok(path)
        }
        Err(e) => {
            warn!("{}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"http://x/?a=1&b="<c>"'"#),
            "http://x/?a=1&amp;b=&quot;&lt;c&gt;&quot;&#39;"
        );
        assert_eq!(escape_html("https://1.2.3.4"), "https://1.2.3.4");
    }
}
