//! Auto-save coordination.
//!
//! Provides:
//! - `AutoSaveCoordinator` - Serializes save requests from every bound form
//! - `AutoSavePhase` - The coordinator's `idle → queued → in-flight` state

mod coordinator;
mod tick;

pub use coordinator::{AutoSaveCoordinator, AutoSavePhase, SaveCallback};
pub(crate) use coordinator::AutoSaveBinding;
pub use tick::next_tick;
