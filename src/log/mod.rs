pub mod history;

pub use history::{ActionLog, ActionLogEntry, Outcome};
