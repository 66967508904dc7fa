//! Business logic services
//!
//! Services own authorization and workflow rules. They work against the
//! [`Storage`](crate::repositories::Storage) port and return `ApiError`.

pub mod chat;
pub mod package;
pub mod plan;
pub mod progress;
pub mod seed;
pub mod task;
pub mod user;

pub use chat::ChatService;
pub use package::PackageService;
pub use plan::PlanService;
pub use progress::ProgressService;
pub use seed::SeedService;
pub use task::TaskService;
pub use user::UserService;
