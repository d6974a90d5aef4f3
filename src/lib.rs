//! Single-process election simulator: candidate and voter registration, a
//! time-boxed voting window with at-most-once voting, and live and final
//! results.

pub mod ballot_box;
pub mod campaign;
pub mod database;
pub mod election;
pub mod error;
pub mod model;
pub mod registry;
pub mod reports;
pub mod session;

pub use error::{ElectionError, Result};
pub use session::Session;
