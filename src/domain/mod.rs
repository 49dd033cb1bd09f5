//! Domain model for the event-sourced case state machine.
//!
//! Direct state mutation is replaced by command-driven transitions through
//! an event log:
//!
//! - **Commands** (`cqrs/commands.rs`): intent to change case state
//! - **Events** (`cqrs/events.rs`): facts that have happened
//! - **Aggregate** (`cqrs/mod.rs`): guard validation and event application
//! - **View** (`view.rs`): read-only snapshot for queries and projections
//! - **Actor** (`actor.rs`): single-writer mailbox per case number

pub mod actor;
pub mod cqrs;
pub mod errors;
pub mod services;
pub mod supervisor;
pub mod types;
pub mod view;

pub use cqrs::{failed_stage_label, CaseAggregate, CaseCommand, CaseEvent, CaseQuery, CaseState};

pub use actor::{
    bootstrap_view_from_events, create_actor_args, current_view, execute_command, CaseActor,
    CaseActorArgs, CaseMessage,
};
pub use errors::CaseError;
pub use services::{CaseClock, CaseServices};
pub use supervisor::{CaseSupervisor, SupervisorMsg};
pub use types::{
    AuditResult, CaseNumber, CaseStatus, DraftResult, ProcedureType, ScreeningResult,
    SecretariatResult, StageKind, TimestampUtc, Urgency,
};
pub use view::CaseView;
