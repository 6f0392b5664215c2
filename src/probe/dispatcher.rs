use crate::config::ScanConfig;
use crate::errors::{RequestError, RequestErrorKind};
use crate::models::{Candidate, Outcome, ScanRecord};
use crate::probe::request::RequestBuilder;
use crate::probe::throttle::Pacer;
use crate::probe::transport::Transport;
use indicatif::ProgressBar;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Raw records from one dispatch run, in candidate submission order.
#[derive(Debug, Default)]
pub struct Dispatch {
    pub records: Vec<ScanRecord>,
    /// True when the run stopped before every candidate was probed.
    pub cancelled: bool,
}

/// Bounded worker pool issuing one request per candidate.
///
/// Workers pull candidate indices from a shared atomic cursor and keep their records in a
/// local buffer; buffers are merged and re-sorted by index once every worker has joined,
/// so output order never depends on scheduling.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    concurrency: usize,
    rate_limit: Duration,
    keep_bodies: bool,
    progress: Option<ProgressBar>,
    completed: Arc<AtomicUsize>,
    errors: Arc<AtomicUsize>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, config: &ScanConfig) -> Self {
        Self {
            transport,
            concurrency: config.concurrency.max(1),
            rate_limit: config.rate_limit_duration(),
            keep_bodies: config.fuzzy_logic,
            progress: None,
            completed: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Tick `progress` once per finished request.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// `(completed, failed)` requests across every run of this dispatcher.
    pub fn get_stats(&self) -> (usize, usize) {
        (
            self.completed.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed),
        )
    }

    pub async fn run(
        &self,
        builder: Arc<RequestBuilder>,
        candidates: Arc<[Candidate]>,
        cancel: CancellationToken,
    ) -> Dispatch {
        let total = candidates.len();
        let cursor = Arc::new(AtomicUsize::new(0));
        let workers = self.concurrency.min(total.max(1));
        let mut set = JoinSet::new();

        for worker in 0..workers {
            let transport = self.transport.clone();
            let builder = builder.clone();
            let candidates = candidates.clone();
            let cursor = cursor.clone();
            let cancel = cancel.clone();
            let progress = self.progress.clone();
            let completed = self.completed.clone();
            let errors = self.errors.clone();
            let rate_limit = self.rate_limit;
            let keep_bodies = self.keep_bodies;

            set.spawn(async move {
                let mut pacer = Pacer::new(rate_limit);
                let mut local = Vec::new();

                while !cancel.is_cancelled() {
                    let index = cursor.fetch_add(1, Ordering::Relaxed);
                    let Some(candidate) = candidates.get(index) else {
                        break;
                    };
                    let request = builder.build(candidate);

                    let sent = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => None,
                        result = async {
                            pacer.wait().await;
                            transport.send(&request).await
                        } => Some(result),
                    };
                    let Some(result) = sent else {
                        break;
                    };

                    let outcome = match result {
                        Ok(raw) => {
                            debug!(worker, host = %request.host, status = raw.status, bytes = raw.body.len(), "probe finished");
                            Outcome::Response(raw.into_capture(keep_bodies))
                        }
                        Err(e) => {
                            warn!(worker, host = %request.host, error = %e, "probe failed");
                            errors.fetch_add(1, Ordering::Relaxed);
                            Outcome::Failed(e)
                        }
                    };
                    completed.fetch_add(1, Ordering::Relaxed);
                    if let Some(pb) = &progress {
                        pb.inc(1);
                    }

                    local.push(ScanRecord {
                        index,
                        candidate: candidate.clone(),
                        host: request.host,
                        outcome,
                    });
                }
                local
            });
        }

        let mut records = Vec::with_capacity(total);
        let mut aborted = false;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(local) => records.extend(local),
                Err(e) => {
                    error!(error = %e, "dispatch worker aborted");
                    aborted = true;
                }
            }
        }

        // A dead worker's buffer is gone; account for its candidates as failures
        if aborted {
            let reach = if cancel.is_cancelled() {
                cursor.load(Ordering::Relaxed).min(total)
            } else {
                total
            };
            let mut seen = vec![false; reach];
            for r in records.iter().filter(|r| r.index < reach) {
                seen[r.index] = true;
            }
            for (index, _) in seen.iter().enumerate().filter(|(_, done)| !**done) {
                let candidate = &candidates[index];
                self.errors.fetch_add(1, Ordering::Relaxed);
                records.push(ScanRecord {
                    index,
                    candidate: candidate.clone(),
                    host: builder.build(candidate).host,
                    outcome: Outcome::Failed(RequestError::new(
                        RequestErrorKind::Other,
                        "worker aborted before recording a result",
                    )),
                });
            }
        }
        records.sort_by_key(|r| r.index);

        Dispatch {
            cancelled: records.len() < total && cancel.is_cancelled(),
            records,
        }
    }
}
