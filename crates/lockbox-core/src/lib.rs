pub mod config;
pub mod error;
pub mod history;
pub mod ops;

pub use error::{LockboxError, LockboxResult};
pub use history::{FileHistory, HistoryEvent, HistoryStore, Operation, Outcome};
pub use ops::Engine;
