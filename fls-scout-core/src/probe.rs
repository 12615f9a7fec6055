// Liveness probing over a bounded worker pool

use fls_scout_scanner::{ProbeResult, Prober};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

/// Options for configuring a probe batch
pub struct ProbeOptions {
    pub urls: Vec<String>,
    pub threads: usize,
    pub show_progress_bar: bool,
}

/// Probe every URL and return one result per URL, in input order.
///
/// Up to `threads` probes are in flight at once. Each result carries the
/// index of its URL and the batch is re-sorted on that index, so the output
/// order never depends on which probe finished first.
pub async fn execute_probe(prober: &Prober, options: ProbeOptions) -> Vec<ProbeResult> {
    let ProbeOptions {
        urls,
        threads,
        show_progress_bar,
    } = options;

    if urls.is_empty() {
        return Vec::new();
    }

    let workers = threads.max(1);
    info!(
        "Probing {} candidates with {} workers (timeout {:?})",
        urls.len(),
        workers,
        prober.timeout()
    );

    let progress_bar = if show_progress_bar {
        let pb = ProgressBar::new(urls.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    } else {
        None
    };

    let mut results: Vec<ProbeResult> = stream::iter(urls.into_iter().enumerate())
        .map(|(index, url)| async move { prober.probe(index, &url).await })
        .buffer_unordered(workers)
        .inspect(|result| {
            debug!("[{}] {} -> {}", result.index, result.url, result.outcome.label());
            if let Some(ref pb) = progress_bar {
                pb.set_message(result.url.clone());
                pb.inc(1);
            }
        })
        .collect()
        .await;

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    results.sort_by_key(|result| result.index);
    results
}

/// Split sorted results into (live, dead) URL lists, each keeping input order.
pub fn partition_results(results: &[ProbeResult]) -> (Vec<String>, Vec<String>) {
    let (live, dead): (Vec<&ProbeResult>, Vec<&ProbeResult>) =
        results.iter().partition(|result| result.is_live());

    (
        live.into_iter().map(|r| r.url.clone()).collect(),
        dead.into_iter().map(|r| r.url.clone()).collect(),
    )
}
