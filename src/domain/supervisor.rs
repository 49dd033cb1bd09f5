//! Supervisor for fault-tolerant case actor management.
//!
//! The supervisor spawns each case actor under its supervision tree and
//! respawns a crashed actor with the same arguments and registered name, so
//! the gateway's name-based routing keeps working across a restart. The
//! respawned actor rehydrates from the event log, which is what makes the
//! crash invisible beyond latency.

use crate::domain::actor::{CaseActor, CaseActorArgs, CaseMessage};
use async_trait::async_trait;
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use std::collections::HashMap;
use tokio::sync::oneshot;

/// Messages for the case supervisor.
pub enum SupervisorMsg {
    /// Spawn a new case actor under the given registered name.
    Spawn(
        String,
        CaseActorArgs,
        oneshot::Sender<Result<ActorRef<CaseMessage>, String>>,
    ),
}

/// The case supervisor actor.
pub struct CaseSupervisor;

#[async_trait]
impl Actor for CaseSupervisor {
    type Msg = SupervisorMsg;
    type State = HashMap<String, CaseActorArgs>;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: (),
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(HashMap::new())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        msg: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match msg {
            SupervisorMsg::Spawn(name, args, reply) => {
                let spawned = CaseActor::spawn_linked(
                    Some(name.clone()),
                    CaseActor,
                    args.clone(),
                    myself.get_cell(),
                )
                .await;

                let result = match spawned {
                    Ok((actor, _join)) => {
                        state.insert(name, args);
                        Ok(actor)
                    }
                    Err(e) => Err(e.to_string()),
                };

                if reply.send(result).is_err() {
                    tracing::debug!("spawn reply channel closed");
                }
            }
        }
        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        evt: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match evt {
            SupervisionEvent::ActorFailed(cell, err) => {
                let Some(name) = cell.get_name() else {
                    return Ok(());
                };
                tracing::warn!("case actor {} failed: {}; respawning", name, err);
                if let Some(args) = state.get(&name).cloned() {
                    let _ = CaseActor::spawn_linked(
                        Some(name),
                        CaseActor,
                        args,
                        myself.get_cell(),
                    )
                    .await?;
                }
            }
            SupervisionEvent::ActorTerminated(cell, _, _) => {
                if let Some(name) = cell.get_name() {
                    state.remove(&name);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/supervisor_tests.rs"]
mod tests;
