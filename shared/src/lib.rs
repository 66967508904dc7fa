//! Helix Shared Library
//!
//! Wire types, domain enums, progress math and validation shared by the
//! backend and its clients.

pub mod errors;
pub mod models;
pub mod progress;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use models::{PlanStatus, Role, StatsRange, TaskStatus, TaskType};
pub use progress::ProgressStat;
pub use types::*;
