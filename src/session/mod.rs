mod controller;
pub mod gate;

pub use controller::{PendingRequest, PendingState, SessionController};
pub use gate::{check_status, GateOutcome};

#[cfg(test)]
mod tests;
