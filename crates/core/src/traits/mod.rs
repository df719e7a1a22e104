pub mod task_executor;

pub use task_executor::*;
