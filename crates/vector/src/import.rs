//! Batched import of [`Record`]s into one collection.
//!
//! Per-record problems never abort an import: an unreadable image or
//! unserializable metadata drops that field, and objects the store refuses
//! are counted as skipped. Only a failed request aborts, after the pending
//! batch has been attempted.

use std::mem;

use {
    mmrag_common::{
        Error, Result,
        types::{IMAGE_PROPERTY, METADATA_PROPERTY},
    },
    serde::Serialize,
    tracing::{debug, info, warn},
};

#[cfg(feature = "metrics")]
use mmrag_metrics::{counter, histogram, import as import_metrics, labels};

use crate::{
    encoder::encode_file,
    record::Record,
    store::{ObjectProperties, VectorStore},
};

/// Outcome of one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Objects the store accepted.
    pub imported: usize,
    /// Objects the store refused.
    pub skipped: usize,
    /// Records imported with at least one field dropped.
    pub degraded: usize,
}

impl ImportReport {
    pub fn total(&self) -> usize {
        self.imported + self.skipped
    }
}

/// Accumulates objects and writes them to the store `capacity` at a time.
///
/// Call [`BatchWriter::finish`] to write the tail; dropping a writer with
/// pending objects loses them.
pub struct BatchWriter<'a> {
    store: &'a dyn VectorStore,
    collection: &'a str,
    capacity: usize,
    pending: Vec<ObjectProperties>,
    report: ImportReport,
}

impl<'a> BatchWriter<'a> {
    /// A `capacity` of 0 is treated as 1.
    pub fn new(store: &'a dyn VectorStore, collection: &'a str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            store,
            collection,
            capacity,
            pending: Vec::with_capacity(capacity),
            report: ImportReport::default(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub async fn add(&mut self, object: ObjectProperties) -> Result<()> {
        self.pending.push(object);
        if self.pending.len() >= self.capacity {
            self.flush().await?;
        }
        Ok(())
    }

    pub fn mark_degraded(&mut self) {
        self.report.degraded += 1;
    }

    /// Write everything pending as one request.
    pub async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = mem::take(&mut self.pending);

        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let outcome = self.store.insert_objects(self.collection, &batch).await?;

        #[cfg(feature = "metrics")]
        histogram!(import_metrics::BATCH_FLUSH_DURATION_SECONDS, labels::COLLECTION => self.collection.to_string())
            .record(start.elapsed().as_secs_f64());

        for (index, reason) in &outcome.failures {
            warn!(
                collection = self.collection,
                index = *index,
                reason = %reason,
                "store refused object"
            );
        }
        let failed = outcome.failed(batch.len());
        let accepted = outcome.accepted(batch.len());
        self.report.imported += accepted;
        self.report.skipped += failed;
        debug!(
            collection = self.collection,
            accepted, failed, "flushed batch"
        );
        Ok(())
    }

    /// Flush the tail and return the totals.
    pub async fn finish(mut self) -> Result<ImportReport> {
        self.flush().await?;
        Ok(self.report)
    }

    pub fn report(&self) -> ImportReport {
        self.report
    }
}

impl Drop for BatchWriter<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                collection = self.collection,
                pending = self.pending.len(),
                "batch writer dropped with unflushed objects"
            );
        }
    }
}

/// Import `records` into `collection`, `batch_size` objects per request.
///
/// The pending batch is always flushed before returning, including when a
/// flush partway through fails. The first request failure is returned.
pub async fn import_records<M: Serialize>(
    store: &dyn VectorStore,
    collection: &str,
    records: &[Record<M>],
    batch_size: usize,
) -> Result<ImportReport> {
    let declared = store
        .collection_properties(collection)
        .await?
        .ok_or_else(|| Error::collection_not_found(collection))?;

    let mut writer = BatchWriter::new(store, collection, batch_size);
    let filled = fill(&mut writer, collection, records, &declared).await;
    let pending = writer.pending();
    let finished = writer.finish().await;

    let report = match (filled, finished) {
        (Ok(()), Ok(report)) => report,
        (Err(e), tail) => {
            if let Err(tail_err) = tail {
                warn!(collection, pending, error = %tail_err, "final flush after failed batch also failed");
            }
            return Err(e);
        },
        (Ok(()), Err(e)) => return Err(e),
    };

    #[cfg(feature = "metrics")]
    {
        counter!(import_metrics::OBJECTS_IMPORTED_TOTAL, labels::COLLECTION => collection.to_string())
            .increment(report.imported as u64);
        counter!(import_metrics::OBJECTS_SKIPPED_TOTAL, labels::COLLECTION => collection.to_string())
            .increment(report.skipped as u64);
        counter!(import_metrics::OBJECTS_DEGRADED_TOTAL, labels::COLLECTION => collection.to_string())
            .increment(report.degraded as u64);
    }

    info!(
        collection,
        imported = report.imported,
        skipped = report.skipped,
        degraded = report.degraded,
        "import complete"
    );
    Ok(report)
}

async fn fill<M: Serialize>(
    writer: &mut BatchWriter<'_>,
    collection: &str,
    records: &[Record<M>],
    declared: &[String],
) -> Result<()> {
    for (index, record) in records.iter().enumerate() {
        let (mut object, mut degraded) = prepare_object(index, record);
        let dropped = object.retain_declared(declared);
        if !dropped.is_empty() {
            debug!(collection, index, ?dropped, "dropping undeclared properties");
            // Losing a field the record actually supplied counts as degraded.
            degraded |= dropped
                .iter()
                .any(|name| *name == IMAGE_PROPERTY || *name == METADATA_PROPERTY);
        }
        if degraded {
            writer.mark_degraded();
        }
        writer.add(object).await?;
    }
    Ok(())
}

/// Build the object for one record. The flag is set when a field had to be
/// dropped.
fn prepare_object<M: Serialize>(index: usize, record: &Record<M>) -> (ObjectProperties, bool) {
    let mut degraded = false;

    let image = record
        .image_path()
        .and_then(|path| match encode_file(path) {
            Ok(encoded) => Some(encoded),
            Err(e) => {
                warn!(index, path = %path.display(), error = %e, "image unreadable, importing without it");
                degraded = true;
                None
            },
        });

    let metadata = record
        .metadata
        .as_ref()
        .and_then(|m| match serde_json::to_string(m) {
            Ok(json) if is_empty_json(&json) => None,
            Ok(json) => Some(json),
            Err(e) => {
                warn!(index, error = %e, "metadata not serializable, importing without it");
                degraded = true;
                None
            },
        });

    let object = ObjectProperties {
        text: Some(record.text.clone()),
        image,
        metadata,
    };
    (object, degraded)
}

fn is_empty_json(json: &str) -> bool {
    matches!(json, "null" | "{}" | "[]" | "\"\"")
}
