// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resolver worker pool
//!
//! Workers share the receiving end of a bounded channel. A miss is retried
//! when a worker goes idle, up to `xlink_max_retries` extra attempts; after
//! that the task is parked until the producer closes the channel, gets one
//! final attempt against the complete identity index, and is reported as
//! unresolved if it still misses.
//!
//! Outputs are kept in memory and committed by [`XlinkPool::drain`], which
//! runs after the producer's final flush so every patch targets a row that
//! already exists.

use super::library::LibraryObjectRegistry;
use super::resolve::{Output, Resolution, ResolveContext};
use super::texcoord::TexCoordAssembler;
use super::{DeferredReferenceTask, ResolveState, TaskKey};
use crate::config::ImporterConfig;
use crate::error::{ImportError, Result};
use crate::identity::{FxBuildHasher, IdentityIndex, RingIndex};
use crate::ids::SequenceAllocator;
use crate::kind::ImporterKind;
use crate::report::{DiagnosticKind, ImportReport};
use crate::rows::{Patch, Row};
use crate::scheduler::DependencyScheduler;
use crate::sink::StorageSink;
use dashmap::DashSet;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Shared state the resolver reads from and writes to.
pub struct ResolverDeps {
    pub identities: Arc<IdentityIndex>,
    pub rings: Arc<RingIndex>,
    pub allocator: Arc<dyn SequenceAllocator>,
    pub sink: Arc<dyn StorageSink>,
    pub scheduler: Arc<DependencyScheduler>,
    pub report: Arc<ImportReport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolverSummary {
    pub resolved: usize,
    pub unresolved: usize,
    pub duplicates: usize,
    pub rows_written: usize,
    pub patches_written: usize,
    pub library_objects: usize,
    pub incomplete_textures: usize,
}

/// Producer side of the resolver queue. Blocks while the queue is full.
#[derive(Debug)]
pub struct XlinkSender {
    tx: Option<SyncSender<DeferredReferenceTask>>,
}

impl XlinkSender {
    pub fn send(&self, task: DeferredReferenceTask) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(ImportError::ResolverDisconnected)?;
        tx.send(task).map_err(|_| ImportError::ResolverDisconnected)
    }

    /// Signal end of input. Workers drain their retries and exit.
    pub fn close(&mut self) {
        self.tx = None;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }
}

#[derive(Debug, Default)]
struct RetryState {
    queue: VecDeque<DeferredReferenceTask>,
    parked: Vec<DeferredReferenceTask>,
    closed: bool,
}

#[derive(Debug, Default)]
struct Collected {
    rows: FxHashMap<ImporterKind, Vec<Row>>,
    patches: FxHashMap<ImporterKind, Vec<Patch>>,
}

struct Shared {
    deps: ResolverDeps,
    libraries: LibraryObjectRegistry,
    textures: TexCoordAssembler,
    seen: DashSet<TaskKey, FxBuildHasher>,
    retry: Mutex<RetryState>,
    collected: Mutex<Collected>,
    unresolved: Mutex<Vec<DeferredReferenceTask>>,
    failure: Mutex<Option<ImportError>>,
    discard: AtomicBool,
    resolved: AtomicUsize,
    duplicates: AtomicUsize,
    max_retries: u32,
}

impl Shared {
    fn accept(&self, task: DeferredReferenceTask) {
        if !self.seen.insert(task.key()) {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(href = %task.target_href, source = %task.source_id, "duplicate reference");
            return;
        }
        self.attempt(task);
    }

    fn attempt(&self, mut task: DeferredReferenceTask) {
        if self.discard.load(Ordering::Relaxed) || self.failure.lock().is_some() {
            return;
        }
        let after_close = self.retry.lock().closed;
        task.attempts += 1;
        task.state = ResolveState::Resolving;

        let ctx = ResolveContext {
            identities: &self.deps.identities,
            rings: &self.deps.rings,
            libraries: &self.libraries,
            textures: &self.textures,
            allocator: self.deps.allocator.as_ref(),
            sink: self.deps.sink.as_ref(),
        };

        match ctx.resolve(&task) {
            Ok(Resolution::Resolved(outputs)) => {
                task.state = ResolveState::Resolved;
                self.resolved.fetch_add(1, Ordering::Relaxed);
                self.collect(outputs);
            }
            Ok(Resolution::Miss) => self.on_miss(task, after_close),
            Ok(Resolution::Mismatch(reason)) => self.give_up(task, &reason),
            Err(err) => {
                tracing::error!(error = %err, href = %task.target_href, "reference resolution failed");
                let mut failure = self.failure.lock();
                if failure.is_none() {
                    *failure = Some(err);
                }
            }
        }
    }

    fn on_miss(&self, task: DeferredReferenceTask, after_close: bool) {
        let mut retry = self.retry.lock();
        if task.attempts <= self.max_retries {
            retry.queue.push_back(task);
        } else if after_close {
            drop(retry);
            self.give_up(task, "target not found");
        } else if retry.closed {
            // input ended while this attempt was running
            retry.queue.push_back(task);
        } else {
            retry.parked.push(task);
        }
    }

    fn give_up(&self, mut task: DeferredReferenceTask, reason: &str) {
        task.state = ResolveState::Unresolved;
        self.deps.report.warn(
            DiagnosticKind::UnresolvedReference,
            task.feature.as_deref(),
            None,
            format!(
                "{} {} → #{} after {} attempt(s): {}",
                task.source_kind, task.source_id, task.target_href, task.attempts, reason
            ),
        );
        self.unresolved.lock().push(task);
    }

    fn collect(&self, outputs: Vec<Output>) {
        if outputs.is_empty() {
            return;
        }
        let mut collected = self.collected.lock();
        for output in outputs {
            match output {
                Output::Row(row) => collected.rows.entry(row.kind()).or_default().push(row),
                Output::Patch(patch) => collected.patches.entry(patch.kind).or_default().push(patch),
            }
        }
    }

    fn retry_pending(&self) {
        let batch: Vec<_> = self.retry.lock().queue.drain(..).collect();
        for task in batch {
            self.attempt(task);
        }
    }

    fn close(&self) {
        let mut retry = self.retry.lock();
        if !retry.closed {
            retry.closed = true;
            let parked = std::mem::take(&mut retry.parked);
            retry.queue.extend(parked);
        }
    }

    fn drain_retries(&self) {
        loop {
            let next = self.retry.lock().queue.pop_front();
            match next {
                Some(task) => self.attempt(task),
                None => break,
            }
        }
    }
}

fn run_worker(shared: Arc<Shared>, rx: Arc<Mutex<Receiver<DeferredReferenceTask>>>, idle: Duration) {
    loop {
        if shared.discard.load(Ordering::Relaxed) {
            break;
        }
        // a worker that cannot get the receiver is idle too
        let received = match rx.try_lock_for(idle) {
            Some(rx) => rx.recv_timeout(idle),
            None => Err(RecvTimeoutError::Timeout),
        };
        match received {
            Ok(task) => shared.accept(task),
            Err(RecvTimeoutError::Timeout) => shared.retry_pending(),
            Err(RecvTimeoutError::Disconnected) => {
                shared.close();
                shared.drain_retries();
                break;
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Fixed pool of resolver threads.
pub struct XlinkPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl XlinkPool {
    /// Start `config.xlink_workers` threads and return the pool together
    /// with the producer's sender.
    pub fn spawn(config: &ImporterConfig, deps: ResolverDeps) -> Result<(Self, XlinkSender)> {
        let (tx, rx) = mpsc::sync_channel(config.xlink_queue_capacity);
        let rx = Arc::new(Mutex::new(rx));
        let shared = Arc::new(Shared {
            deps,
            libraries: LibraryObjectRegistry::new(),
            textures: TexCoordAssembler::new(),
            seen: DashSet::default(),
            retry: Mutex::new(RetryState::default()),
            collected: Mutex::new(Collected::default()),
            unresolved: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
            discard: AtomicBool::new(false),
            resolved: AtomicUsize::new(0),
            duplicates: AtomicUsize::new(0),
            max_retries: config.xlink_max_retries,
        });
        let idle = Duration::from_millis(config.xlink_retry_idle_ms.max(1));

        let mut pool = Self {
            shared,
            workers: Vec::with_capacity(config.xlink_workers),
        };
        for i in 0..config.xlink_workers {
            let shared = Arc::clone(&pool.shared);
            let rx = Arc::clone(&rx);
            let spawned = thread::Builder::new()
                .name(format!("xlink-worker-{i}"))
                .spawn(move || run_worker(shared, rx, idle));
            match spawned {
                Ok(handle) => pool.workers.push(handle),
                Err(err) => {
                    pool.abort();
                    return Err(err.into());
                }
            }
        }

        tracing::debug!(
            workers = config.xlink_workers,
            capacity = config.xlink_queue_capacity,
            max_retries = config.xlink_max_retries,
            "reference resolver started"
        );
        Ok((pool, XlinkSender { tx: Some(tx) }))
    }

    /// Wait for the workers and commit everything they resolved: rows in
    /// dependency order first, then patches.
    ///
    /// The [`XlinkSender`] must be closed beforehand, otherwise the workers
    /// never see the end of input. Calling this again writes nothing new.
    pub fn drain(&mut self) -> Result<ResolverSummary> {
        let mut panicked = None;
        for handle in self.workers.drain(..) {
            if let Err(payload) = handle.join() {
                panicked = Some(panic_message(payload));
            }
        }
        if let Some(message) = panicked {
            return Err(ImportError::WorkerPanicked(message));
        }
        if let Some(err) = self.shared.failure.lock().take() {
            return Err(err);
        }

        let shared = &self.shared;
        let mut summary = self.counters();
        if shared.discard.load(Ordering::Relaxed) {
            return Ok(summary);
        }

        let mut collected = std::mem::take(&mut *shared.collected.lock());
        let incomplete = shared.textures.drain_incomplete();
        for row in &incomplete {
            shared.deps.report.warn(
                DiagnosticKind::IncompleteTexture,
                None,
                None,
                format!(
                    "surface data {} on polygon {}: texture coordinates missing for some rings",
                    row.surface_data_id, row.surface_geometry_id
                ),
            );
        }
        summary.incomplete_textures = incomplete.len();
        collected
            .rows
            .entry(ImporterKind::TextureParam)
            .or_default()
            .extend(incomplete.into_iter().map(Row::TextureParam));

        let sink = shared.deps.sink.as_ref();
        for &kind in shared.deps.scheduler.full_order() {
            let Some(rows) = collected.rows.remove(&kind).filter(|r| !r.is_empty()) else {
                continue;
            };
            summary.rows_written += rows.len();
            sink.write(kind, rows)
                .map_err(|source| ImportError::Write { kind, source })?;
        }
        for &kind in shared.deps.scheduler.full_order() {
            let Some(patches) = collected.patches.remove(&kind).filter(|p| !p.is_empty()) else {
                continue;
            };
            summary.patches_written += patches.len();
            sink.patch(kind, patches)
                .map_err(|source| ImportError::Write { kind, source })?;
        }

        tracing::info!(
            resolved = summary.resolved,
            unresolved = summary.unresolved,
            duplicates = summary.duplicates,
            rows = summary.rows_written,
            patches = summary.patches_written,
            "reference resolver drained"
        );
        Ok(summary)
    }

    /// Stop the workers and drop everything resolved so far.
    pub fn abort(&mut self) {
        self.shared.discard.store(true, Ordering::Relaxed);
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        let mut collected = self.shared.collected.lock();
        collected.rows.clear();
        collected.patches.clear();
    }

    /// Tasks given up on so far.
    pub fn unresolved_tasks(&self) -> Vec<DeferredReferenceTask> {
        self.shared.unresolved.lock().clone()
    }

    pub fn library_objects(&self) -> &LibraryObjectRegistry {
        &self.shared.libraries
    }

    fn counters(&self) -> ResolverSummary {
        ResolverSummary {
            resolved: self.shared.resolved.load(Ordering::Relaxed),
            unresolved: self.shared.unresolved.lock().len(),
            duplicates: self.shared.duplicates.load(Ordering::Relaxed),
            library_objects: self.shared.libraries.len(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityEntry;
    use crate::ids::{AtomicSequenceAllocator, SurrogateId};
    use crate::rows::{BuildingRow, Column};
    use crate::sink::MemorySink;

    fn setup(max_retries: u32) -> (XlinkPool, XlinkSender, Arc<IdentityIndex>, Arc<MemorySink>) {
        let config = ImporterConfig {
            xlink_workers: 2,
            xlink_queue_capacity: 4,
            xlink_max_retries: max_retries,
            ..Default::default()
        };
        let identities = Arc::new(IdentityIndex::new());
        let sink = Arc::new(MemorySink::new());
        let deps = ResolverDeps {
            identities: Arc::clone(&identities),
            rings: Arc::new(RingIndex::new()),
            allocator: Arc::new(AtomicSequenceAllocator::new()),
            sink: sink.clone(),
            scheduler: Arc::new(DependencyScheduler::new().unwrap()),
            report: Arc::new(ImportReport::new()),
        };
        let (pool, sender) = XlinkPool::spawn(&config, deps).unwrap();
        (pool, sender, identities, sink)
    }

    fn building(sink: &MemorySink, id: u64) {
        sink.write(
            ImporterKind::Building,
            vec![Row::Building(BuildingRow {
                id: SurrogateId::new(id),
                root_id: SurrogateId::new(id),
                ..Default::default()
            })],
        )
        .unwrap();
    }

    fn solid_ref(source: u64) -> DeferredReferenceTask {
        DeferredReferenceTask::basic(
            ImporterKind::Building,
            SurrogateId::new(source),
            Column::Lod2Solid,
            "#solid-y",
            ImporterKind::SurfaceGeometry,
        )
    }

    #[test]
    fn target_registered_after_send_is_resolved_at_close() {
        let (mut pool, mut sender, identities, sink) = setup(0);
        building(&sink, 1);
        sender.send(solid_ref(1)).unwrap();
        identities.put(IdentityEntry::resolved(
            "solid-y",
            SurrogateId::new(50),
            SurrogateId::new(50),
            ImporterKind::SurfaceGeometry,
        ));
        sender.close();

        let summary = pool.drain().unwrap();
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.unresolved, 0);
        let row = sink.row(ImporterKind::Building, SurrogateId::new(1)).unwrap();
        assert_eq!(row.reference(Column::Lod2Solid), Some(SurrogateId::new(50)));
    }

    #[test]
    fn idle_retries_resolve_before_close() {
        let (mut pool, mut sender, identities, sink) = setup(100_000);
        building(&sink, 1);
        sender.send(solid_ref(1)).unwrap();
        identities.put(IdentityEntry::resolved(
            "solid-y",
            SurrogateId::new(50),
            SurrogateId::new(50),
            ImporterKind::SurfaceGeometry,
        ));

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while pool.counters().resolved == 0 {
            assert!(std::time::Instant::now() < deadline, "still pending before close");
            thread::sleep(Duration::from_millis(5));
        }
        sender.close();

        let summary = pool.drain().unwrap();
        assert_eq!(summary.resolved, 1);
        assert_eq!(summary.unresolved, 0);
    }

    #[test]
    fn duplicates_resolve_once_and_misses_are_reported() {
        let (mut pool, mut sender, _identities, sink) = setup(1);
        building(&sink, 1);
        for _ in 0..3 {
            sender.send(solid_ref(1)).unwrap();
        }
        sender.close();

        let summary = pool.drain().unwrap();
        assert_eq!(summary.duplicates, 2);
        assert_eq!(summary.unresolved, 1);
        let unresolved = pool.unresolved_tasks();
        assert_eq!(unresolved[0].state, ResolveState::Unresolved);
        assert!(unresolved[0].attempts >= 2);
        assert!(sink.patches().is_empty());
    }

    #[test]
    fn send_after_close_fails() {
        let (mut pool, mut sender, _, _) = setup(0);
        sender.close();
        assert!(matches!(
            sender.send(solid_ref(1)),
            Err(ImportError::ResolverDisconnected)
        ));
        pool.drain().unwrap();
    }

    #[test]
    fn abort_discards_outputs() {
        let (mut pool, mut sender, identities, sink) = setup(0);
        building(&sink, 1);
        identities.put(IdentityEntry::resolved(
            "solid-y",
            SurrogateId::new(50),
            SurrogateId::new(50),
            ImporterKind::SurfaceGeometry,
        ));
        sender.send(solid_ref(1)).unwrap();
        sender.close();
        pool.abort();
        let summary = pool.drain().unwrap();
        assert_eq!(summary.patches_written, 0);
        assert!(sink.patches().is_empty());
    }
}
