use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::ApiSettings;
use crate::domain::{Document, KEEP_ABSTRACT_KEY, NormalizedRecord, Product};
use crate::error::HarvestError;
use crate::impactu::ProductsClient;
use crate::normalize::normalize;
use crate::store::Collection;

#[derive(Debug, Clone, Serialize)]
pub struct FetchReport {
    pub staging_collection: String,
    pub pages_requested: u32,
    pub records_seen: usize,
    pub records_staged: usize,
    pub records_skipped: usize,
    pub total_results: u64,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopyReport {
    pub staging_collection: String,
    pub destination_collection: String,
    pub records_read: usize,
    pub records_written: usize,
    pub batches: usize,
    pub started_at: String,
    pub finished_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub fetch: FetchReport,
    pub copy: CopyReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct CollectionStatus {
    pub name: String,
    pub documents: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub staging: CollectionStatus,
    pub destination: CollectionStatus,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Runs the fetch and copy procedures against injected collections.
pub struct Harvester<C: ProductsClient, S: Collection, D: Collection> {
    client: C,
    staging: S,
    destination: D,
    api: ApiSettings,
    copy_batch_size: Option<usize>,
}

impl<C: ProductsClient, S: Collection, D: Collection> Harvester<C, S, D> {
    pub fn new(client: C, staging: S, destination: D, api: ApiSettings) -> Self {
        Self {
            client,
            staging,
            destination,
            api,
            copy_batch_size: None,
        }
    }

    pub fn with_copy_batch_size(mut self, copy_batch_size: Option<usize>) -> Self {
        self.copy_batch_size = copy_batch_size.filter(|size| *size > 0);
        self
    }

    pub fn staging(&self) -> &S {
        &self.staging
    }

    /// Walks the listing page by page and stages every product without an
    /// id from the excluded source.
    ///
    /// A failed page aborts the walk; documents staged before it are kept.
    pub fn fetch(&self, sink: &dyn ProgressSink) -> Result<FetchReport, HarvestError> {
        let started = Instant::now();
        let mut report = FetchReport {
            staging_collection: self.staging.name().to_string(),
            pages_requested: 0,
            records_seen: 0,
            records_staged: 0,
            records_skipped: 0,
            total_results: 0,
            started_at: now(),
            finished_at: String::new(),
        };
        let page_size = self.api.page_size;
        info!(
            staging = self.staging.name(),
            page_size,
            excluded_source = %self.api.excluded_source,
            "starting fetch"
        );

        let mut page: u32 = 1;
        loop {
            report.pages_requested += 1;
            let listing = match self.client.fetch_page(page, page_size) {
                Ok(listing) => listing,
                Err(err) => {
                    error!(page, error = %err, "aborting fetch after request error");
                    sink.event(ProgressEvent {
                        message: format!("phase=Fetch; page {page} failed, aborting: {err}"),
                        elapsed: Some(started.elapsed()),
                    });
                    return Err(err);
                }
            };
            report.total_results = listing.total_results;

            for document in listing.data {
                report.records_seen += 1;
                if self.stage(document)? {
                    report.records_staged += 1;
                } else {
                    report.records_skipped += 1;
                }
            }

            let reached = u64::from(page) * u64::from(page_size);
            debug!(page, reached, total = listing.total_results, "page processed");
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Fetch; progress {} of {}",
                    reached.min(listing.total_results),
                    listing.total_results
                ),
                elapsed: Some(started.elapsed()),
            });

            if reached >= listing.total_results {
                break;
            }
            page += 1;
            if !self.api.request_delay.is_zero() {
                thread::sleep(self.api.request_delay);
            }
        }

        report.finished_at = now();
        info!(
            pages = report.pages_requested,
            staged = report.records_staged,
            skipped = report.records_skipped,
            "fetch finished"
        );
        Ok(report)
    }

    /// Normalizes every staged document into the destination collection.
    ///
    /// Nothing guards against re-running: each run appends a fresh copy.
    pub fn copy(&self, sink: &dyn ProgressSink) -> Result<CopyReport, HarvestError> {
        let started = Instant::now();
        let started_at = now();
        sink.event(ProgressEvent {
            message: format!("phase=Copy; reading {}", self.staging.name()),
            elapsed: None,
        });

        let staged = self.staging.find_all()?;
        let records_read = staged.len();
        let mut pending = staged
            .iter()
            .map(|document| normalize(document).into_document())
            .collect::<Result<Vec<_>, HarvestError>>()?;

        let mut records_written = 0;
        let mut batches = 0;
        if pending.is_empty() {
            info!(staging = self.staging.name(), "no staged documents, nothing copied");
            sink.event(ProgressEvent {
                message: format!("phase=Copy; {} is empty, nothing copied", self.staging.name()),
                elapsed: Some(started.elapsed()),
            });
        } else {
            let batch_size = self.copy_batch_size.unwrap_or(pending.len());
            while !pending.is_empty() {
                let rest = pending.split_off(batch_size.min(pending.len()));
                records_written += self.destination.insert_many(pending)?;
                batches += 1;
                pending = rest;
            }
            info!(
                staging = self.staging.name(),
                destination = self.destination.name(),
                records_written,
                batches,
                "copy finished"
            );
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Copy; copied {records_written} documents from {} to {}",
                    self.staging.name(),
                    self.destination.name()
                ),
                elapsed: Some(started.elapsed()),
            });
        }

        Ok(CopyReport {
            staging_collection: self.staging.name().to_string(),
            destination_collection: self.destination.name().to_string(),
            records_read,
            records_written,
            batches,
            started_at,
            finished_at: now(),
        })
    }

    pub fn run(&self, sink: &dyn ProgressSink) -> Result<RunReport, HarvestError> {
        let fetch = self.fetch(sink)?;
        let copy = self.copy(sink)?;
        Ok(RunReport { fetch, copy })
    }

    pub fn status(&self) -> Result<StatusReport, HarvestError> {
        Ok(StatusReport {
            staging: CollectionStatus {
                name: self.staging.name().to_string(),
                documents: self.staging.count()?,
            },
            destination: CollectionStatus {
                name: self.destination.name().to_string(),
                documents: self.destination.count()?,
            },
        })
    }

    fn stage(&self, mut document: Document) -> Result<bool, HarvestError> {
        if Product::from_document(&document).has_external_source(&self.api.excluded_source) {
            return Ok(false);
        }
        document.insert(KEEP_ABSTRACT_KEY.to_string(), false.into());
        self.staging.insert_one(document)?;
        Ok(true)
    }
}

/// Normalizes staged documents without writing anything.
pub fn preview(documents: &[Document]) -> Vec<NormalizedRecord> {
    documents.iter().map(normalize).collect()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
