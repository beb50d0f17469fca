pub mod challenge;
pub mod reconcile;
pub mod round;
pub mod session;
pub mod withdrawal;
