// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-kind batch buffers and the cascading writer that flushes them.

use crate::error::{ImportError, Result};
use crate::kind::ImporterKind;
use crate::rows::Row;
use crate::scheduler::DependencyScheduler;
use crate::sink::StorageSink;
use std::sync::Arc;

/// Pending rows of one kind.
#[derive(Debug)]
pub struct BatchBuffer {
    kind: ImporterKind,
    rows: Vec<Row>,
    counter: usize,
    threshold: usize,
}

impl BatchBuffer {
    pub fn new(kind: ImporterKind, threshold: usize) -> Self {
        Self {
            kind,
            rows: Vec::new(),
            counter: 0,
            threshold: threshold.max(1),
        }
    }

    /// Append a row. Returns `true` once the threshold is reached.
    pub fn add(&mut self, row: Row) -> bool {
        self.rows.push(row);
        self.counter += 1;
        self.counter >= self.threshold
    }

    /// Write exactly this kind's pending rows. Empty buffers are a no-op.
    pub fn flush(&mut self, sink: &dyn StorageSink) -> Result<usize> {
        self.counter = 0;
        if self.rows.is_empty() {
            return Ok(0);
        }
        let rows = std::mem::take(&mut self.rows);
        let written = rows.len();
        sink.write(self.kind, rows)
            .map_err(|source| ImportError::Write {
                kind: self.kind,
                source,
            })?;
        Ok(written)
    }

    /// Drop pending rows without writing them.
    pub fn discard(&mut self) -> usize {
        self.counter = 0;
        let dropped = self.rows.len();
        self.rows.clear();
        dropped
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Owns one [`BatchBuffer`] per kind and flushes them in dependency order.
pub struct BatchWriter {
    scheduler: Arc<DependencyScheduler>,
    buffers: Vec<BatchBuffer>,
    sink: Arc<dyn StorageSink>,
    flushes: [usize; ImporterKind::COUNT],
    rows_written: usize,
}

impl BatchWriter {
    pub fn new(
        scheduler: Arc<DependencyScheduler>,
        sink: Arc<dyn StorageSink>,
        threshold: usize,
    ) -> Self {
        Self {
            scheduler,
            buffers: ImporterKind::ALL
                .iter()
                .map(|&kind| BatchBuffer::new(kind, threshold))
                .collect(),
            sink,
            flushes: [0; ImporterKind::COUNT],
            rows_written: 0,
        }
    }

    /// Buffer a row. Reaching the threshold flushes the row's kind together
    /// with everything it depends on.
    pub fn add(&mut self, row: Row) -> Result<()> {
        let kind = row.kind();
        if self.buffers[kind.index()].add(row) {
            tracing::debug!(kind = %kind, "batch threshold reached");
            self.flush(kind)?;
        }
        Ok(())
    }

    /// Flush `kind` and its transitive dependencies in write order.
    pub fn flush(&mut self, kind: ImporterKind) -> Result<()> {
        let scheduler = Arc::clone(&self.scheduler);
        for &k in scheduler.order_for(kind) {
            self.flush_buffer(k)?;
        }
        Ok(())
    }

    /// Flush every buffer in the full write order.
    pub fn flush_all(&mut self) -> Result<()> {
        let scheduler = Arc::clone(&self.scheduler);
        for &k in scheduler.full_order() {
            self.flush_buffer(k)?;
        }
        Ok(())
    }

    /// Drop all pending rows. Returns how many were dropped.
    pub fn discard_all(&mut self) -> usize {
        let dropped: usize = self.buffers.iter_mut().map(BatchBuffer::discard).sum();
        if dropped > 0 {
            tracing::debug!(rows = dropped, "discarded pending batches");
        }
        dropped
    }

    fn flush_buffer(&mut self, kind: ImporterKind) -> Result<()> {
        let written = self.buffers[kind.index()].flush(self.sink.as_ref())?;
        if written > 0 {
            self.flushes[kind.index()] += 1;
            self.rows_written += written;
            tracing::debug!(kind = %kind, rows = written, "flushed batch");
        }
        Ok(())
    }

    /// Number of non-empty flushes of `kind` so far.
    pub fn flush_count(&self, kind: ImporterKind) -> usize {
        self.flushes[kind.index()]
    }

    pub fn pending(&self, kind: ImporterKind) -> usize {
        self.buffers[kind.index()].len()
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn scheduler(&self) -> &Arc<DependencyScheduler> {
        &self.scheduler
    }

    pub fn sink(&self) -> &Arc<dyn StorageSink> {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SurrogateId;
    use crate::rows::{CityObjectRow, RoomRow};
    use crate::sink::{MemorySink, WriteError};
    use crate::rows::Patch;

    fn room(id: u64) -> Row {
        Row::Room(RoomRow {
            id: SurrogateId::new(id),
            ..Default::default()
        })
    }

    fn writer(threshold: usize) -> (BatchWriter, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let scheduler = Arc::new(DependencyScheduler::new().unwrap());
        (BatchWriter::new(scheduler, sink.clone(), threshold), sink)
    }

    #[test]
    fn buffer_signals_at_threshold() {
        let mut buffer = BatchBuffer::new(ImporterKind::Room, 2);
        assert!(!buffer.add(room(1)));
        assert!(buffer.add(room(2)));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn empty_flush_is_a_no_op() {
        let sink = MemorySink::new();
        let mut buffer = BatchBuffer::new(ImporterKind::Room, 10);
        assert_eq!(buffer.flush(&sink).unwrap(), 0);
        assert!(sink.write_log().is_empty());
    }

    #[test]
    fn cascade_writes_dependencies_first() {
        let (mut writer, sink) = writer(2);
        writer
            .add(Row::CityObject(CityObjectRow {
                id: SurrogateId::new(1),
                ..Default::default()
            }))
            .unwrap();
        writer.add(room(1)).unwrap();
        assert!(sink.write_log().is_empty());

        writer.add(room(2)).unwrap();
        assert_eq!(
            sink.write_log(),
            vec![(ImporterKind::CityObject, 1), (ImporterKind::Room, 2)]
        );
        assert_eq!(writer.pending(ImporterKind::Room), 0);
        assert_eq!(writer.flush_count(ImporterKind::Room), 1);
        assert_eq!(writer.rows_written(), 3);
    }

    #[test]
    fn discard_drops_everything() {
        let (mut writer, sink) = writer(100);
        writer.add(room(1)).unwrap();
        writer.add(room(2)).unwrap();
        assert_eq!(writer.discard_all(), 2);
        writer.flush_all().unwrap();
        assert!(sink.write_log().is_empty());
    }

    struct FailingSink;

    impl StorageSink for FailingSink {
        fn write(&self, _: ImporterKind, _: Vec<Row>) -> std::result::Result<(), WriteError> {
            Err(WriteError::Unavailable("connection refused".into()))
        }

        fn patch(&self, _: ImporterKind, _: Vec<Patch>) -> std::result::Result<(), WriteError> {
            Ok(())
        }
    }

    #[test]
    fn write_failure_is_fatal_and_names_the_kind() {
        let scheduler = Arc::new(DependencyScheduler::new().unwrap());
        let mut writer = BatchWriter::new(scheduler, Arc::new(FailingSink), 1);
        let err = writer.add(room(1)).unwrap_err();
        assert!(matches!(
            err,
            ImportError::Write {
                kind: ImporterKind::Room,
                ..
            }
        ));
    }
}
