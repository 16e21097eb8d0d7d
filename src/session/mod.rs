//! Session coordination
//!
//! This module provides the `SessionCoordinator`, the state machine that:
//! - Starts the connection manager and watches its state
//! - Turns user intents into capture episodes, canceling playback first
//! - Ships finalized audio units to the server
//! - Streams reply chunks into speech as they arrive

mod coordinator;
mod snapshot;

pub use coordinator::{SessionCoordinator, SessionState};
pub use snapshot::SessionSnapshot;
