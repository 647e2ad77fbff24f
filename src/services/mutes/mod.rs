//! Mute lifecycle: applying mutes, scheduling their expiry and lifting them
//! while restoring the member's previous roles.

pub mod events;
pub mod lock;
pub mod orchestrator;
pub mod reconcile;
pub mod settings;
pub mod store;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testing;

pub use events::{MuteEvent, MuteEventBus};
pub use orchestrator::{CaseDetails, MuteOrchestrator, MuteResult, SweepReport, UnmuteResult};
