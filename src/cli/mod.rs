//! CLI commands for the coach binary.
//!
//! - **simulate**: run a whole session against a simulated guide
//! - **valid**: inspect the validity rules
//! - **history**: inspect participant histories

pub mod history;
pub mod simulate;
pub mod valid;

pub use history::HistoryCommand;
pub use simulate::SimulateCommand;
pub use valid::ValidCommand;
