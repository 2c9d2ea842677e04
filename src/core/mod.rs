//! 核心：错误类型、任务管理、持久化状态

pub mod error;
pub mod state;
pub mod task_manager;

pub use error::AgentError;
pub use state::AgentData;
pub use task_manager::{Task, TaskManager};
