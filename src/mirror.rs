//! Shared directory mirror.
//!
//! Owns the directory and the event log behind a single reader-writer lock.
//! Each reconciliation, live update and tick holds the write lock for its
//! whole pass; readers see only complete passes.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::config::MirrorConfig;
use crate::directory::{Directory, Snapshot};
use crate::error::{IngestError, ReconcileError};
use crate::events::{Event, EventLog};
use crate::log_warn;
use crate::pipeline::{
    discard_flushed_alerts, flush, FlushOutcome, LiveUpdateIngestor, PassContext, Reconciler,
    SensorAlertNotification, StateChangeNotification, TickProcessor,
};
use crate::storage::{ServerInfoStore, ServerInformation};
use crate::version::VersionInformer;

/// Directory plus the events emitted against it.
#[derive(Debug, Clone, Default)]
pub struct MirrorState {
    pub directory: Directory,
    pub events: EventLog,
}

pub struct Mirror {
    state: RwLock<MirrorState>,
    /// Serializes ticks so two flushes never discard the same alerts.
    tick_lock: Mutex<()>,
    config: MirrorConfig,
    store: Arc<dyn ServerInfoStore>,
    version_informer: Option<Arc<dyn VersionInformer>>,
}

impl Mirror {
    pub fn new(config: MirrorConfig, store: Arc<dyn ServerInfoStore>) -> Self {
        Self {
            state: RwLock::new(MirrorState::default()),
            tick_lock: Mutex::new(()),
            config,
            store,
            version_informer: None,
        }
    }

    pub fn with_version_informer(mut self, informer: Arc<dyn VersionInformer>) -> Self {
        self.version_informer = Some(informer);
        self
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Shared view of the directory and event log.
    pub fn read(&self) -> RwLockReadGuard<'_, MirrorState> {
        self.state.read()
    }

    /// Take every pending event, oldest first.
    pub fn take_events(&self) -> Vec<Event> {
        self.state.write().events.drain()
    }

    pub fn reconcile(&self, snapshot: Snapshot) -> Result<(), ReconcileError> {
        self.reconcile_with(snapshot, &PassContext::new())
    }

    /// Reconcile `snapshot` as one transaction.
    ///
    /// A failed pass restores the directory and event log to their state
    /// before the call.
    pub fn reconcile_with(&self, snapshot: Snapshot, ctx: &PassContext) -> Result<(), ReconcileError> {
        let mut state = self.state.write();
        let MirrorState { directory, events } = &mut *state;

        let saved = directory.clone();
        let first_event = events.len();

        let result = Reconciler::new(directory, events, ctx).reconcile(snapshot);
        if result.is_err() {
            *directory = saved;
            events.truncate(first_event);
            log_warn!(ctx.log_context("reconcile"), "RECONCILE_ROLLED_BACK");
        }
        result
    }

    pub fn sensor_alert(&self, alert: SensorAlertNotification) {
        self.sensor_alert_with(alert, &PassContext::new());
    }

    pub fn sensor_alert_with(&self, alert: SensorAlertNotification, ctx: &PassContext) {
        let mut state = self.state.write();
        let MirrorState { directory, events } = &mut *state;
        LiveUpdateIngestor::new(directory, events, &self.config, ctx).sensor_alert(alert);
    }

    pub fn state_change(&self, change: StateChangeNotification) -> Result<(), IngestError> {
        self.state_change_with(change, &PassContext::new())
    }

    pub fn state_change_with(
        &self,
        change: StateChangeNotification,
        ctx: &PassContext,
    ) -> Result<(), IngestError> {
        let mut state = self.state.write();
        let MirrorState { directory, events } = &mut *state;
        LiveUpdateIngestor::new(directory, events, &self.config, ctx).state_change(change)
    }

    pub fn tick(&self) -> FlushOutcome {
        self.tick_with(&PassContext::new())
    }

    /// Run one maintenance pass and flush to storage.
    ///
    /// The directory is copied under the write lock; the storage call runs
    /// without it. Alerts that arrive during the flush stay buffered.
    pub fn tick_with(&self, ctx: &PassContext) -> FlushOutcome {
        let _tick = self.tick_lock.lock();

        let info = {
            let mut state = self.state.write();
            let MirrorState { directory, events } = &mut *state;
            TickProcessor::new(
                directory,
                events,
                &self.config,
                self.version_informer.as_deref(),
                ctx,
            )
            .maintain();
            ServerInformation::from_directory(directory)
        };

        let outcome = flush(&*self.store, &info, &ctx.log_context("tick"));
        if let FlushOutcome::Stored { sensor_alerts } = outcome {
            discard_flushed_alerts(&mut self.state.write().directory, sensor_alerts);
        }
        outcome
    }
}
