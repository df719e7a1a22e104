pub mod app_config;
pub mod observability;
pub mod scheduler;

pub use app_config::*;
pub use observability::*;
pub use scheduler::*;
