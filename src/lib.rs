//! 任务调度服务：把调度引擎、配置和内置执行器组装成可运行的应用。

pub mod app;
pub mod executors;
pub mod shutdown;

pub use app::Application;
pub use shutdown::ShutdownManager;
