//! Process-wide facade over cases, engines, and projections.
//!
//! `CourtSystem` owns the supervisor tree, one actor plus one engine
//! task per open case, the shared projector, and a per-case notifier.
//! Commands route through the case actor's mailbox by registered name,
//! so human commands and engine progress for one case never interleave.

use crate::config::EngineConfig;
use crate::decision::DecisionService;
use crate::domain::types::{CaseNumber, CaseStatus};
use crate::domain::{
    bootstrap_view_from_events, create_actor_args, current_view, execute_command, CaseError,
    CaseMessage, CaseSupervisor, CaseView, SupervisorMsg,
};
use crate::domain::CaseCommand;
use crate::engine::CaseEngine;
use crate::notify::{NotificationStream, Notifier};
use crate::projections::{
    AuditTrailRow, KpiRow, Projector, QueueRow, QueueStream,
};
use anyhow::{anyhow, Context, Result};
use ractor::{Actor, ActorRef};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, watch, RwLock};
use tracing::info;
use uuid::Uuid;

/// Everything the gateway tracks for one open case.
struct CaseHandle {
    actor_name: String,
    notifier: Arc<Notifier>,
    view_rx: watch::Receiver<CaseView>,
    engine: tokio::task::JoinHandle<()>,
}

pub struct CourtSystem {
    config: EngineConfig,
    service: Arc<dyn DecisionService>,
    projector: Arc<Projector>,
    supervisor: ActorRef<SupervisorMsg>,
    cases: RwLock<HashMap<String, CaseHandle>>,
    /// Namespaces registered actor names, so several systems (tests,
    /// restarted instances) can share one process registry.
    system_id: Uuid,
}

impl CourtSystem {
    /// Spawns the supervisor tree and returns an empty system.
    pub async fn new(config: EngineConfig, service: Arc<dyn DecisionService>) -> Result<Self> {
        let (supervisor, _join) = Actor::spawn(None, CaseSupervisor, ())
            .await
            .context("failed to spawn case supervisor")?;
        Ok(Self {
            config,
            service,
            projector: Arc::new(Projector::new()),
            supervisor,
            cases: RwLock::new(HashMap::new()),
            system_id: Uuid::new_v4(),
        })
    }

    /// Opens a new case and starts autonomous processing.
    pub async fn start(&self, case_number: &CaseNumber) -> Result<CaseView, CaseError> {
        {
            let cases = self.cases.read().await;
            if cases.contains_key(case_number.as_str()) {
                return Err(CaseError::AlreadyStarted);
            }
        }
        // A previous process may have already opened this case; the log
        // is the durable source of truth.
        let log_path = self.config.case_log_path(case_number);
        if bootstrap_view_from_events(&log_path, case_number.as_str()).is_started() {
            return Err(CaseError::AlreadyStarted);
        }

        let (actor, _view_rx) = self.spawn_case(case_number).await?;
        match execute_command(&actor, CaseCommand::Start).await {
            Ok(view) => {
                info!(case_number = %case_number, "case started");
                Ok(view)
            }
            Err(e) => {
                // Roll the registration back so a later start can retry.
                let mut cases = self.cases.write().await;
                if let Some(handle) = cases.remove(case_number.as_str()) {
                    handle.engine.abort();
                }
                actor.stop(None);
                Err(e)
            }
        }
    }

    /// Re-opens a case persisted by an earlier process and resumes
    /// autonomous progress from its last committed state.
    pub async fn attach(&self, case_number: &CaseNumber) -> Result<CaseView, CaseError> {
        {
            let cases = self.cases.read().await;
            if cases.contains_key(case_number.as_str()) {
                return Err(CaseError::AlreadyStarted);
            }
        }
        let log_path = self.config.case_log_path(case_number);
        if !bootstrap_view_from_events(&log_path, case_number.as_str()).is_started() {
            return Err(CaseError::NotStarted);
        }

        let (actor, _view_rx) = self.spawn_case(case_number).await?;
        let view = current_view(&actor).await?;
        info!(case_number = %case_number, status = ?view.status(), "case re-attached");
        Ok(view)
    }

    /// Current state of a case.
    pub async fn get(&self, case_number: &CaseNumber) -> Result<CaseView, CaseError> {
        let actor = self.resolve(case_number).await?;
        current_view(&actor).await
    }

    /// Approves the draft of a case awaiting human approval.
    pub async fn approve(&self, case_number: &CaseNumber) -> Result<CaseView, CaseError> {
        self.command(case_number, CaseCommand::Approve).await
    }

    /// Rejects the draft with a reason; the engine revises it.
    pub async fn reject(
        &self,
        case_number: &CaseNumber,
        reason: impl Into<String>,
    ) -> Result<CaseView, CaseError> {
        self.command(
            case_number,
            CaseCommand::Reject {
                reason: reason.into(),
            },
        )
        .await
    }

    /// Restarts a failed case from the beginning of the pipeline.
    pub async fn resume(&self, case_number: &CaseNumber) -> Result<CaseView, CaseError> {
        self.command(case_number, CaseCommand::Resume).await
    }

    /// Overrides a failed audit and lets drafting proceed.
    pub async fn continue_from_audit(
        &self,
        case_number: &CaseNumber,
    ) -> Result<CaseView, CaseError> {
        self.command(case_number, CaseCommand::ContinueFromAudit)
            .await
    }

    /// Aborts a case from any state.
    pub async fn fail(
        &self,
        case_number: &CaseNumber,
        reason: impl Into<String>,
    ) -> Result<CaseView, CaseError> {
        self.command(
            case_number,
            CaseCommand::Fail {
                reason: reason.into(),
            },
        )
        .await
    }

    /// Live notification stream for a case (messages published after
    /// this call).
    pub async fn updates(&self, case_number: &CaseNumber) -> Result<NotificationStream, CaseError> {
        let cases = self.cases.read().await;
        let handle = cases
            .get(case_number.as_str())
            .ok_or(CaseError::NotStarted)?;
        Ok(handle.notifier.subscribe())
    }

    /// Notification stream with replay of everything after `cursor`.
    pub async fn updates_from(
        &self,
        case_number: &CaseNumber,
        cursor: u64,
    ) -> Result<NotificationStream, CaseError> {
        let cases = self.cases.read().await;
        let handle = cases
            .get(case_number.as_str())
            .ok_or(CaseError::NotStarted)?;
        Ok(handle.notifier.subscribe_from(cursor))
    }

    /// Watch receiver of the case's view snapshots, for callers that
    /// want to await a status instead of polling `get`.
    pub async fn watch_view(
        &self,
        case_number: &CaseNumber,
    ) -> Result<watch::Receiver<CaseView>, CaseError> {
        let cases = self.cases.read().await;
        let handle = cases
            .get(case_number.as_str())
            .ok_or(CaseError::NotStarted)?;
        Ok(handle.view_rx.clone())
    }

    // --- Projection queries ---

    pub fn all_cases(&self) -> Vec<QueueRow> {
        self.projector.queue().all()
    }

    pub fn cases_by_status(&self, status: CaseStatus) -> Vec<QueueRow> {
        self.projector.queue().by_status(status.as_str())
    }

    pub fn queue_stream(&self) -> QueueStream {
        self.projector.queue().stream()
    }

    pub fn queue_stream_from(&self, cursor: u64) -> QueueStream {
        self.projector.queue().stream_from(cursor)
    }

    pub fn audit_trail(&self) -> Vec<AuditTrailRow> {
        self.projector.audit_trail().all()
    }

    pub fn audit_trail_for(&self, case_number: &CaseNumber) -> Option<AuditTrailRow> {
        self.projector.audit_trail().by_case_number(case_number.as_str())
    }

    pub fn kpi(&self) -> Vec<KpiRow> {
        self.projector.kpi().all()
    }

    pub fn kpi_incomplete_documents(&self) -> Vec<KpiRow> {
        self.projector.kpi().incomplete_documents()
    }

    pub fn kpi_failed_audits(&self) -> Vec<KpiRow> {
        self.projector.kpi().failed_audits()
    }

    pub fn projector(&self) -> &Arc<Projector> {
        &self.projector
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tears down every engine task and the supervisor tree. Cases stay
    /// on disk and can be re-opened with `attach`.
    pub async fn shutdown(&self) {
        let mut cases = self.cases.write().await;
        for (_, handle) in cases.drain() {
            handle.engine.abort();
        }
        self.supervisor.stop(None);
    }

    // --- Internals ---

    /// Spawns the actor and engine for a case and registers the handle.
    ///
    /// Holds the case map's write lock across the spawn, so of two
    /// racing starts exactly one spawns and the other sees
    /// `AlreadyStarted` instead of a duplicate-name spawn failure.
    async fn spawn_case(
        &self,
        case_number: &CaseNumber,
    ) -> Result<(ActorRef<CaseMessage>, watch::Receiver<CaseView>), CaseError> {
        let mut cases = self.cases.write().await;
        if cases.contains_key(case_number.as_str()) {
            return Err(CaseError::AlreadyStarted);
        }

        let (args, view_rx) = create_actor_args(case_number, &self.config, self.projector.clone());
        let actor_name = self.actor_name(case_number);

        let (tx, rx) = oneshot::channel();
        self.supervisor
            .send_message(SupervisorMsg::Spawn(actor_name.clone(), args, tx))
            .map_err(|e| CaseError::StorageFailure {
                message: format!("supervisor unavailable: {}", e),
            })?;
        let actor = rx
            .await
            .map_err(|_| CaseError::StorageFailure {
                message: "supervisor dropped the spawn request".to_string(),
            })?
            .map_err(|e| CaseError::StorageFailure {
                message: format!("failed to spawn case actor: {}", e),
            })?;

        let notifier = Arc::new(Notifier::new());
        let engine = CaseEngine::new(
            case_number.clone(),
            actor_name.clone(),
            view_rx.clone(),
            self.service.clone(),
            notifier.clone(),
            &self.config,
        )
        .spawn();

        cases.insert(
            case_number.as_str().to_string(),
            CaseHandle {
                actor_name,
                notifier,
                view_rx: view_rx.clone(),
                engine,
            },
        );
        Ok((actor, view_rx))
    }

    async fn command(
        &self,
        case_number: &CaseNumber,
        command: CaseCommand,
    ) -> Result<CaseView, CaseError> {
        let actor = self.resolve(case_number).await?;
        execute_command(&actor, command).await
    }

    /// Resolves the case's actor through the registry, so a respawn by
    /// the supervisor is picked up transparently.
    async fn resolve(&self, case_number: &CaseNumber) -> Result<ActorRef<CaseMessage>, CaseError> {
        let cases = self.cases.read().await;
        let handle = cases
            .get(case_number.as_str())
            .ok_or(CaseError::NotStarted)?;
        let cell =
            ractor::registry::where_is(handle.actor_name.clone()).ok_or(CaseError::StorageFailure {
                message: format!("case actor {} is not registered", handle.actor_name),
            })?;
        Ok(cell.into())
    }

    fn actor_name(&self, case_number: &CaseNumber) -> String {
        format!("case-{}-{}", self.system_id, case_number)
    }
}

/// Awaits until the watched view reaches one of the wanted statuses.
///
/// Convenience for demos and tests; returns the first matching view or
/// an error if the channel closes first.
pub async fn await_status(
    rx: &mut watch::Receiver<CaseView>,
    wanted: &[CaseStatus],
) -> Result<CaseView> {
    loop {
        {
            let view = rx.borrow_and_update();
            if let Some(status) = view.status() {
                if wanted.contains(&status) {
                    return Ok(view.clone());
                }
            }
        }
        rx.changed()
            .await
            .map_err(|_| anyhow!("case view channel closed"))?;
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
