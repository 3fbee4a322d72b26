//! Relay actor
//!
//! One task owns the engine phase and the active run. Commands arrive over an
//! mpsc channel and are handled strictly in order, so two runs can never
//! mutate the same `RunState` at once.

use super::types::{RelayCommand, RelayEvent};
use crate::capture::{CaptureNotice, TemplateStore};
use crate::engine::{EnginePhase, PaginationEngine, RunConfig, RunOutcome};
use crate::error::{Error, Result};
use crate::normalize::CanonicalRecord;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

const COMMAND_CAPACITY: usize = 32;
const EVENT_CAPACITY: usize = 256;

/// Controller-side handle to a running relay
///
/// Cloning is cheap. The relay task exits once every handle is dropped.
#[derive(Debug, Clone)]
pub struct RelayHandle {
    commands: mpsc::Sender<RelayCommand>,
    events: broadcast::Sender<RelayEvent>,
    phase: watch::Receiver<EnginePhase>,
    engine: PaginationEngine,
}

impl RelayHandle {
    /// Deliver a command; outcomes arrive as events
    pub async fn send(&self, command: RelayCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|e| Error::Other(format!("Relay is not running, dropped '{}'", e.0.name())))
    }

    /// Deliver `start`
    pub async fn start(&self, config: RunConfig) -> Result<()> {
        self.send(RelayCommand::Start(config)).await
    }

    /// Deliver `stop`
    pub async fn stop(&self) -> Result<()> {
        self.send(RelayCommand::Stop).await
    }

    /// Deliver `getData`
    pub async fn get_data(&self) -> Result<()> {
        self.send(RelayCommand::GetData).await
    }

    /// Deliver `reset`
    pub async fn reset(&self) -> Result<()> {
        self.send(RelayCommand::Reset).await
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    /// Current engine phase
    pub fn phase(&self) -> EnginePhase {
        *self.phase.borrow()
    }

    /// Copy of the records held by the engine, bypassing the event channel
    pub async fn snapshot(&self) -> Vec<CanonicalRecord> {
        self.engine.snapshot().await
    }
}

struct ActiveRun {
    stop: watch::Sender<bool>,
    handle: JoinHandle<RunOutcome>,
}

/// The relay actor
pub struct Relay {
    engine: PaginationEngine,
    store: TemplateStore,
    commands: mpsc::Receiver<RelayCommand>,
    notices: broadcast::Receiver<CaptureNotice>,
    events: broadcast::Sender<RelayEvent>,
    phase: watch::Sender<EnginePhase>,
    active: Option<ActiveRun>,
}

impl Relay {
    /// Spawn the relay task and return its handle
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(engine: PaginationEngine, store: TemplateStore) -> RelayHandle {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (phase_tx, phase_rx) = watch::channel(EnginePhase::Idle);

        let relay = Self {
            engine: engine.clone(),
            notices: store.subscribe(),
            store,
            commands: command_rx,
            events: event_tx.clone(),
            phase: phase_tx,
            active: None,
        };
        tokio::spawn(relay.run());

        RelayHandle {
            commands: command_tx,
            events: event_tx,
            phase: phase_rx,
            engine,
        }
    }

    async fn run(mut self) {
        debug!("Relay started");

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
                joined = wait_for_run(&mut self.active) => self.finish(joined),
                notice = self.notices.recv() => match notice {
                    Ok(notice) => self.captured(notice),
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Relay missed {missed} capture notices");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        // Controller is gone: halt any run before exiting
        if let Some(active) = self.active.take() {
            let _ = active.stop.send(true);
            let joined = active.handle.await;
            self.finish(joined);
        }
        debug!("Relay stopped");
    }

    fn phase(&self) -> EnginePhase {
        *self.phase.borrow()
    }

    fn set_phase(&self, phase: EnginePhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            debug!("Engine phase {previous} -> {phase}");
        }
    }

    fn emit(&self, event: RelayEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    async fn handle(&mut self, command: RelayCommand) {
        info!("Relay command '{}' in phase {}", command.name(), self.phase());
        match command {
            RelayCommand::Start(config) => self.start(config).await,
            RelayCommand::Stop => self.stop(),
            RelayCommand::GetData => {
                let records = self.engine.snapshot().await;
                self.emit(RelayEvent::Data { records });
            }
            RelayCommand::Reset => self.reset().await,
        }
    }

    async fn start(&mut self, config: RunConfig) {
        let phase = self.phase();
        if !matches!(phase, EnginePhase::Idle | EnginePhase::Done) {
            let reason = match phase {
                EnginePhase::Failed => "last run failed; reset first".to_string(),
                other => format!("a run is already {other}"),
            };
            warn!("Rejected start: {reason}");
            self.emit(RelayEvent::rejected(&RelayCommand::Start(config), reason));
            return;
        }

        let template = match config.template.clone() {
            Some(template) => Some(template),
            None => self.store.get().await,
        };
        let Some(template) = template else {
            let progress = self.engine.progress().await;
            warn!("Cannot start: {}", Error::TemplateMissing);
            self.emit(RelayEvent::Error {
                message: Error::TemplateMissing.to_string(),
                pages: progress.pages,
                count: progress.count,
            });
            return;
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let engine = self.engine.clone();
        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            engine
                .run(template, config, stop_rx, move |progress| {
                    let _ = events.send(RelayEvent::Progress(progress));
                })
                .await
        });

        self.active = Some(ActiveRun {
            stop: stop_tx,
            handle,
        });
        self.set_phase(EnginePhase::Running);
    }

    fn stop(&mut self) {
        match &self.active {
            Some(active) if self.phase() == EnginePhase::Running => {
                let _ = active.stop.send(true);
                self.set_phase(EnginePhase::Stopping);
            }
            _ => {
                let reason = format!("no run in progress (phase {})", self.phase());
                self.emit(RelayEvent::rejected(&RelayCommand::Stop, reason));
            }
        }
    }

    async fn reset(&mut self) {
        let phase = self.phase();
        if matches!(phase, EnginePhase::Running | EnginePhase::Stopping) {
            self.emit(RelayEvent::rejected(
                &RelayCommand::Reset,
                format!("a run is {phase}"),
            ));
            return;
        }
        self.engine.reset().await;
        self.set_phase(EnginePhase::Idle);
    }

    fn finish(&mut self, joined: std::result::Result<RunOutcome, JoinError>) {
        self.active = None;
        match joined {
            Ok(outcome) => {
                self.set_phase(outcome.phase());
                let event = match &outcome.result {
                    Ok(reason) => RelayEvent::Done {
                        count: outcome.count,
                        pages: outcome.pages,
                        reason: Some(*reason),
                    },
                    Err(e) => RelayEvent::Error {
                        message: e.to_string(),
                        pages: outcome.pages,
                        count: outcome.count,
                    },
                };
                self.emit(event);
            }
            Err(e) => {
                warn!("Run task ended abnormally: {e}");
                self.set_phase(EnginePhase::Failed);
                self.emit(RelayEvent::Error {
                    message: format!("Run task ended abnormally: {e}"),
                    pages: 0,
                    count: 0,
                });
            }
        }
    }

    fn captured(&self, notice: CaptureNotice) {
        self.emit(RelayEvent::from(notice));
    }
}

/// Resolve when the active run finishes; never resolves without one
async fn wait_for_run(
    active: &mut Option<ActiveRun>,
) -> std::result::Result<RunOutcome, JoinError> {
    match active {
        Some(run) => (&mut run.handle).await,
        None => std::future::pending().await,
    }
}
