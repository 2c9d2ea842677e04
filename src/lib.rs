//! Mneme - 自主任务智能体
//!
//! 模块划分：
//! - **agent**: 主控循环（计划 -> 推理 -> 行动 -> 记忆）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、任务管理、持久化状态
//! - **llm**: 生成服务与嵌入服务抽象及实现（OpenAI 兼容 / DeepSeek / Mock / 本地哈希嵌入）、提示词
//! - **memory**: 程序性、情节、语义三类记忆与相似度索引
//! - **observability**: 日志
//! - **output**: 结构化输出解析与修复管线
//! - **react**: 推理一步
//! - **tools**: 工具描述符与内置工具
//! - **ui**: 人机交互边界（终端实现 / 脚本化实现）

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod output;
pub mod react;
pub mod tools;
pub mod ui;

pub use agent::Agent;
pub use crate::core::AgentError;
