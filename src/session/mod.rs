//! Connection and authentication lifecycle.

pub mod machine;
pub mod state;

pub use machine::{Action, SessionMachine};
pub use state::{ConnectionPhase, SessionState};
