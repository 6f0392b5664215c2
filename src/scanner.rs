use crate::classify::{FuzzyClusterer, SignatureClassifier};
use crate::config::ScanConfig;
use crate::errors::ScanError;
use crate::models::{Candidate, ResultSet, ScanRecord};
use crate::probe::{Dispatcher, ReqwestTransport, RequestBuilder, Transport};
use indicatif::ProgressBar;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs the candidate list against every target address and classifies the responses.
pub struct Scanner {
    config: ScanConfig,
    builders: Vec<(String, Arc<RequestBuilder>)>,
    dispatcher: Dispatcher,
    classifier: SignatureClassifier,
    fuzzy: Option<FuzzyClusterer>,
}

impl Scanner {
    /// Validate `config` and build a scanner backed by a real HTTP client.
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    pub fn with_transport(config: ScanConfig, transport: Arc<dyn Transport>) -> Result<Self, ScanError> {
        config.validate()?;
        let builders = config
            .targets()?
            .into_iter()
            .map(|address| {
                let builder = RequestBuilder::new(&config, &address)?;
                Ok((address, Arc::new(builder)))
            })
            .collect::<Result<Vec<_>, ScanError>>()?;

        Ok(Self {
            dispatcher: Dispatcher::new(transport, &config),
            classifier: SignatureClassifier::from_config(&config),
            fuzzy: config.fuzzy_logic.then(|| FuzzyClusterer::from_config(&config)),
            builders,
            config,
        })
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.dispatcher = self.dispatcher.with_progress(progress);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.builders.iter().map(|(address, _)| address.as_str())
    }

    /// Total requests a full run will issue.
    pub fn planned_requests(&self, candidates: usize) -> usize {
        self.builders.len() * candidates
    }

    /// `(completed, failed)` request counters across all targets.
    pub fn stats(&self) -> (usize, usize) {
        self.dispatcher.get_stats()
    }

    /// Scan every target in order. Targets not yet started when `cancel` fires are skipped.
    pub async fn scan(&self, candidates: Vec<Candidate>, cancel: CancellationToken) -> Vec<ResultSet> {
        let candidates: Arc<[Candidate]> = candidates.into();
        let mut results = Vec::with_capacity(self.builders.len());
        for (address, builder) in &self.builders {
            if cancel.is_cancelled() {
                break;
            }
            results.push(
                self.scan_with(address, builder.clone(), candidates.clone(), cancel.clone())
                    .await,
            );
        }
        results
    }

    async fn scan_with(
        &self,
        address: &str,
        builder: Arc<RequestBuilder>,
        candidates: Arc<[Candidate]>,
        cancel: CancellationToken,
    ) -> ResultSet {
        let started = Instant::now();
        info!(
            target_addr = address,
            url = %builder.url(),
            candidates = candidates.len(),
            concurrency = self.config.concurrency,
            rate_limit = self.config.rate_limit,
            fuzzy_threshold = ?self.fuzzy.as_ref().map(FuzzyClusterer::threshold),
            "Starting virtual host scan"
        );

        let dispatch = self.dispatcher.run(builder, candidates, cancel).await;
        let result = self.classify(address, dispatch.records, dispatch.cancelled);

        info!(
            target_addr = address,
            scanned = result.scanned(),
            groups = result.groups.len(),
            likely = result.likely_groups().len(),
            filtered = result.filtered_count,
            errors = result.error_count(),
            cancelled = result.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Scan finished"
        );
        result
    }

    /// Group an already collected record sequence. Pure: the same records always give the same result.
    pub fn classify(&self, target: &str, records: Vec<ScanRecord>, cancelled: bool) -> ResultSet {
        let records: Vec<Arc<ScanRecord>> = records.into_iter().map(Arc::new).collect();
        let classification = self.classifier.classify(&records);
        let (groups, fuzzy_applied) = match &self.fuzzy {
            Some(clusterer) => (clusterer.cluster(classification.groups), true),
            None => (classification.groups, false),
        };

        ResultSet {
            target: target.to_string(),
            records,
            groups,
            filtered_count: classification.filtered_count,
            unique_depth: self.config.unique_depth,
            fuzzy_applied,
            cancelled,
        }
    }
}
