//! Case actor for CQRS command handling.
//!
//! `CaseActor` wraps the CQRS framework behind a message mailbox, which is
//! what makes each case single-writer: every command and stage completion
//! for one case number is serialized through its actor, while different
//! cases run on independent actors with no shared mutable state.

use crate::config::EngineConfig;
use crate::domain::cqrs::CaseAggregate;
use crate::domain::errors::CaseError;
use crate::domain::services::CaseServices;
use crate::domain::types::CaseNumber;
use crate::domain::view::CaseView;
use crate::domain::CaseCommand;
use crate::domain::CaseQuery;
use crate::event_store::{FileEventStore, StoredEvent};
use crate::projections::Projector;
use async_trait::async_trait;
use cqrs_es::{AggregateError, CqrsFramework};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{oneshot, watch, RwLock};

/// Messages that can be sent to a case actor.
pub enum CaseMessage {
    /// Execute a command and return the updated view (or error).
    Command(
        Box<CaseCommand>,
        oneshot::Sender<Result<CaseView, CaseError>>,
    ),
    /// Get the current view.
    GetView(oneshot::Sender<CaseView>),
}

/// Arguments for spawning a case actor.
#[derive(Clone)]
pub struct CaseActorArgs {
    /// The case number, used as the aggregate id.
    pub case_number: CaseNumber,
    /// Path to this case's event log file.
    pub log_path: PathBuf,
    /// Path to this case's snapshot file.
    pub snapshot_path: PathBuf,
    /// Snapshot after every N events.
    pub snapshot_every: u64,
    /// Shared per-case view.
    pub view: Arc<RwLock<CaseView>>,
    /// Watch channel sender for view snapshots.
    pub snapshot_tx: watch::Sender<CaseView>,
    /// Shared read-side projector.
    pub projector: Arc<Projector>,
    /// Services for command handling.
    pub services: CaseServices,
}

/// State maintained by a case actor.
pub struct CaseActorState {
    cqrs: CqrsFramework<CaseAggregate, FileEventStore>,
    case_number: CaseNumber,
    view: Arc<RwLock<CaseView>>,
}

/// The case actor.
pub struct CaseActor;

impl CaseActor {
    /// Builds the CQRS framework from actor arguments.
    fn build_cqrs(args: &CaseActorArgs) -> CqrsFramework<CaseAggregate, FileEventStore> {
        let store = FileEventStore::new(
            args.log_path.clone(),
            args.snapshot_path.clone(),
            args.snapshot_every,
        );

        let query = CaseQuery::new(
            args.view.clone(),
            args.snapshot_tx.clone(),
            args.projector.clone(),
        );

        CqrsFramework::new(store, vec![Box::new(query)], args.services.clone())
    }
}

#[async_trait]
impl Actor for CaseActor {
    type Msg = CaseMessage;
    type State = CaseActorState;
    type Arguments = CaseActorArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(CaseActorState {
            cqrs: CaseActor::build_cqrs(&args),
            case_number: args.case_number,
            view: args.view,
        })
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            CaseMessage::Command(boxed_cmd, reply) => {
                let cmd = *boxed_cmd;
                let result = state.cqrs.execute(state.case_number.as_str(), cmd).await;
                let view = state.view.read().await.clone();

                let mapped = match result {
                    Ok(()) => Ok(view),
                    Err(AggregateError::UserError(err)) => Err(err),
                    Err(AggregateError::AggregateConflict) => Err(CaseError::ConcurrencyConflict {
                        message: "case was modified concurrently".to_string(),
                    }),
                    Err(err) => Err(CaseError::StorageFailure {
                        message: err.to_string(),
                    }),
                };

                if reply.send(mapped).is_err() {
                    tracing::debug!("command reply channel closed");
                }
            }
            CaseMessage::GetView(reply) => {
                let view = state.view.read().await.clone();
                if reply.send(view).is_err() {
                    tracing::debug!("view reply channel closed");
                }
            }
        }

        Ok(())
    }
}

/// Executes a command against a case actor and awaits the result.
pub async fn execute_command(
    actor: &ActorRef<CaseMessage>,
    command: CaseCommand,
) -> Result<CaseView, CaseError> {
    let (tx, rx) = oneshot::channel();
    actor
        .send_message(CaseMessage::Command(Box::new(command), tx))
        .map_err(|e| CaseError::StorageFailure {
            message: format!("case actor unavailable: {}", e),
        })?;
    rx.await.map_err(|_| CaseError::StorageFailure {
        message: "case actor dropped the command".to_string(),
    })?
}

/// Fetches the current view from a case actor.
pub async fn current_view(actor: &ActorRef<CaseMessage>) -> Result<CaseView, CaseError> {
    let (tx, rx) = oneshot::channel();
    actor
        .send_message(CaseMessage::GetView(tx))
        .map_err(|e| CaseError::StorageFailure {
            message: format!("case actor unavailable: {}", e),
        })?;
    rx.await.map_err(|_| CaseError::StorageFailure {
        message: "case actor dropped the query".to_string(),
    })
}

/// Bootstraps a `CaseView` by replaying events from an event log file.
///
/// Used when re-attaching a case after a process restart to restore the view
/// from persisted events. Returns `CaseView::default()` if the log file does
/// not exist.
pub fn bootstrap_view_from_events(log_path: &Path, aggregate_id: &str) -> CaseView {
    let mut view = CaseView::default();

    let file = match File::open(log_path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return view,
        Err(e) => {
            tracing::warn!("could not open event log {}: {}", log_path.display(), e);
            return view;
        }
    };

    let reader = BufReader::new(file);
    let mut skipped_lines = 0;

    for line in reader.lines().map_while(Result::ok) {
        if let Ok(stored) = serde_json::from_str::<StoredEvent>(&line) {
            if stored.aggregate_id == aggregate_id {
                view.apply_event(&stored.aggregate_id, &stored.event, stored.sequence);
            }
        } else {
            skipped_lines += 1;
        }
    }

    if skipped_lines > 0 {
        tracing::warn!("skipped {} unparseable lines in event log", skipped_lines);
    }

    view
}

/// Creates actor arguments for a case, bootstrapping the view from any
/// existing event log so re-attached cases resume from committed state.
pub fn create_actor_args(
    case_number: &CaseNumber,
    config: &EngineConfig,
    projector: Arc<Projector>,
) -> (CaseActorArgs, watch::Receiver<CaseView>) {
    let log_path = config.case_log_path(case_number);
    let snapshot_path = config.case_snapshot_path(case_number);

    let initial_view = bootstrap_view_from_events(&log_path, case_number.as_str());
    let view = Arc::new(RwLock::new(initial_view.clone()));
    let (snapshot_tx, snapshot_rx) = watch::channel(initial_view);

    let args = CaseActorArgs {
        case_number: case_number.clone(),
        log_path,
        snapshot_path,
        snapshot_every: config.snapshot_every,
        view,
        snapshot_tx,
        projector,
        services: CaseServices::default(),
    };

    (args, snapshot_rx)
}

#[cfg(test)]
#[path = "tests/actor_tests.rs"]
mod tests;
