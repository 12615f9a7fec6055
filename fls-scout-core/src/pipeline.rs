use crate::config::ScoutConfig;
use crate::probe::{ProbeOptions, execute_probe};
use crate::report::{PublishOutcome, RunReport, now_at, publish};
use fls_scout_scanner::{Candidate, FLS_QUERY, ProbeResult, Prober, ScanError, SearchClient};
use tracing::{info, warn};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub candidates: Vec<String>,
    /// Why discovery came back empty, when it failed
    pub discovery_error: Option<String>,
    pub results: Vec<ProbeResult>,
    pub report: Option<RunReport>,
    pub published: PublishOutcome,
}

impl RunOutcome {
    pub fn live_count(&self) -> usize {
        self.report.as_ref().map(|r| r.live.len()).unwrap_or(0)
    }

    /// True when there was nothing to probe, so nothing was written.
    pub fn nothing_to_update(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Query the search index for license servers.
pub async fn discover_candidates(config: &ScoutConfig) -> Result<Vec<Candidate>, ScanError> {
    let client = SearchClient::new(config.api_key.clone())?
        .with_base_url(config.search_url.clone())
        .with_page(config.page);
    client.search(FLS_QUERY).await
}

/// Run discovery, probing and publishing in sequence.
///
/// No stage failure stops the run: a failed search counts as zero
/// candidates, a failed probe as a dead server, a failed write is recorded
/// in [`PublishOutcome`].
pub async fn run(config: &ScoutConfig, show_progress_bar: bool) -> RunOutcome {
    let (candidates, discovery_error) = match discover_candidates(config).await {
        Ok(candidates) => (candidates.iter().map(Candidate::url).collect::<Vec<_>>(), None),
        Err(e) => {
            warn!("Discovery failed: {}", e);
            (Vec::new(), Some(e.to_string()))
        }
    };

    if candidates.is_empty() {
        info!("No candidates found, nothing to update");
        return RunOutcome {
            candidates,
            discovery_error,
            results: Vec::new(),
            report: None,
            published: PublishOutcome::default(),
        };
    }

    let results = match Prober::with_options(config.probe_timeout, config.accept_invalid_certs) {
        Ok(prober) => {
            execute_probe(
                &prober,
                ProbeOptions {
                    urls: candidates.clone(),
                    threads: config.threads,
                    show_progress_bar,
                },
            )
            .await
        }
        Err(e) => {
            // Without a client every candidate is unreachable.
            warn!("Could not build probe client: {}", e);
            candidates
                .iter()
                .enumerate()
                .map(|(index, url)| ProbeResult::unreachable(index, url.clone(), e.to_string()))
                .collect()
        }
    };

    let report = RunReport::from_results(&results, now_at(config.utc_offset));
    info!(
        "{} live, {} dead out of {} candidates",
        report.live.len(),
        report.dead.len(),
        report.total()
    );

    let published = publish(&report, &results, config);

    RunOutcome {
        candidates,
        discovery_error,
        results,
        report: Some(report),
        published,
    }
}
