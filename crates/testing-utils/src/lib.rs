//! # Commander Testing Utils
//!
//! Shared testing utilities for the scheduler workspace: builders for the
//! data model and scripted task executors.
//!
//! ## Usage
//!
//! Add this crate as a dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! commander-testing-utils = { path = "../testing-utils" }
//! ```
//!
//! Then use the builders and mocks in your tests:
//!
//! ```rust
//! use commander_testing_utils::{MockExecutor, TaskDefinitionBuilder, WorkerNodeBuilder};
//!
//! let task = TaskDefinitionBuilder::new("crawl").with_max_retries(2).build();
//! let worker = WorkerNodeBuilder::new("node-1").with_capacity(4).build();
//! let executor = MockExecutor::succeeding();
//! assert_eq!(task.max_retries, 2);
//! assert_eq!(worker.max_concurrent_tasks, 4);
//! assert_eq!(executor.call_count(), 0);
//! ```

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
