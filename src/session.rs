//! Datasets held by one user plus the last combined result.

use std::path::Path;

use tracing::{info, warn};

use crate::combine::{self, Combined, Operation};
use crate::dataset::{Dataset, DatasetSummary};
use crate::error::{CombineError, IngestError};
use crate::guardrail::{self, Limits};
use crate::ingest::{self, ReadOptions};
use crate::transfer::TransferService;
use crate::FileFormat;

/// Ordered slots of input datasets. Created empty, cleared by [`Session::reset`].
#[derive(Debug, Default)]
pub struct Session {
    limits: Limits,
    datasets: Vec<Dataset>,
    last_result: Option<Combined>,
}

impl Session {
    pub fn new(limits: Limits) -> Self {
        Self {
            limits,
            datasets: Vec::new(),
            last_result: None,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Hold a parsed dataset in the next slot. Rejected datasets are not stored.
    pub fn add(&mut self, dataset: Dataset) -> Result<usize, IngestError> {
        let checked = guardrail::check_capacity(self.datasets.len(), &self.limits)
            .and_then(|_| guardrail::check_rows(dataset.name(), dataset.height(), &self.limits));
        if let Err(e) = checked {
            warn!(name = dataset.name(), error = %e, "dataset rejected");
            return Err(e);
        }
        info!(
            name = dataset.name(),
            rows = dataset.height(),
            columns = dataset.width(),
            slot = self.datasets.len(),
            "dataset accepted"
        );
        self.datasets.push(dataset);
        Ok(self.datasets.len() - 1)
    }

    pub fn ingest_bytes(
        &mut self,
        name: &str,
        bytes: &[u8],
        extension: &str,
        options: &ReadOptions,
    ) -> Result<usize, IngestError> {
        guardrail::check_capacity(self.datasets.len(), &self.limits)?;
        let dataset = ingest::read_bytes(name, bytes, extension, options)?;
        self.add(dataset)
    }

    pub fn ingest_path(
        &mut self,
        path: &Path,
        format: Option<FileFormat>,
        options: &ReadOptions,
    ) -> Result<usize, IngestError> {
        guardrail::check_capacity(self.datasets.len(), &self.limits)?;
        let dataset = ingest::read_path(path, format, options)?;
        self.add(dataset)
    }

    /// Fetch a dataset through a transfer token. It is named after the transferred filename.
    pub fn ingest_token(
        &mut self,
        service: &dyn TransferService,
        token: &str,
    ) -> Result<usize, IngestError> {
        guardrail::check_capacity(self.datasets.len(), &self.limits)?;
        let transferred = service.fetch(token)?;
        self.add(transferred.dataset)
    }

    /// Swap the dataset in `slot`. The old one is kept if the new one is rejected.
    pub fn replace(&mut self, slot: usize, dataset: Dataset) -> Result<Dataset, IngestError> {
        if slot >= self.datasets.len() {
            return Err(IngestError::EmptySlot { slot });
        }
        guardrail::check_rows(dataset.name(), dataset.height(), &self.limits)?;
        Ok(std::mem::replace(&mut self.datasets[slot], dataset))
    }

    pub fn remove(&mut self, slot: usize) -> Result<Dataset, IngestError> {
        if slot >= self.datasets.len() {
            return Err(IngestError::EmptySlot { slot });
        }
        Ok(self.datasets.remove(slot))
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn summaries(&self) -> Vec<DatasetSummary> {
        self.datasets.iter().map(Dataset::summary).collect()
    }

    /// Run `operation` over every held dataset in slot order. On failure the
    /// previous result is kept.
    pub fn run(&mut self, operation: &Operation) -> Result<&Combined, CombineError> {
        let combined = combine::execute(operation, &self.datasets, &self.limits)?;
        Ok(self.last_result.insert(combined))
    }

    pub fn last_result(&self) -> Option<&Combined> {
        self.last_result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<Combined> {
        self.last_result.take()
    }

    pub fn reset(&mut self) {
        self.datasets.clear();
        self.last_result = None;
    }
}
