//! groupwarden - moderation policy engine for group chat communities.
//!
//! For every inbound message and membership event the engine decides whether
//! an action (delete, mute, kick, rename, notify) must be taken, based on
//! persistent per-group policy state. The surrounding plugin host supplies
//! two seams: an action-invocation interface ([`gateway::ActionGateway`])
//! and a persistence interface ([`policy::PolicyBackend`]).
//!
//! Pipeline order: access filter → nickname guard (passive correction) →
//! target filter → keyword filter → command router. Each stage may consume
//! the event; mutating stages persist before acknowledging.

pub mod access;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod gateway;
pub mod guard;
pub mod handlers;
pub mod keyword;
pub mod normalize;
pub mod policy;
pub mod target;
pub mod telemetry;

/// Outcome of offering an event to a pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Pass the event to the next stage.
    Continue,
    /// The event was consumed; later stages must not run.
    Stop,
}

pub use engine::Engine;
pub use error::{ActionError, CommandError, StoreError};
pub use event::{MessageEvent, NoticeEvent, Role};
pub use gateway::{ActionGateway, GroupActions};
pub use policy::{
    JsonFileBackend, ListMode, MemoryBackend, NicknameLock, PolicyBackend, PolicyDocument,
    PolicyStore, Punishment, TargetRecord,
};
