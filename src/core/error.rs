//! Agent 错误类型
//!
//! 仅结构化输出修复管线内部做本地恢复；其余组件遇错即向上传播，由进程边界统一报告并终止。

use thiserror::Error;

/// Agent 运行过程中可能出现的错误（解析、校验、工具、计划生成、外部服务、持久化等）
#[derive(Error, Debug)]
pub enum AgentError {
    /// 所有修复策略用尽后仍无法解析为结构化数据
    #[error("JSON parse error: {0}")]
    Parse(String),

    /// 可解析但不符合 schema，外部修复后仍不符合
    #[error("JSON validation error: {0}")]
    Validation(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// 包装工具调用本身抛出的任何失败
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// 传入参数与工具声明的参数表不一致
    #[error("Invalid arguments for tool '{tool}': {message}")]
    InvalidToolArgs { tool: String, message: String },

    /// 工具名规范化后为空
    #[error("Invalid tool name: {0:?}")]
    InvalidToolName(String),

    /// 任务列表响应无法按分隔符解析
    #[error("Task plan generation failed: {0}")]
    PlanGeneration(String),

    #[error("Task not found: {0}")]
    TaskNotFound(u32),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for AgentError {
    fn from(e: std::io::Error) -> Self {
        AgentError::Persistence(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_execution_display() {
        let err = AgentError::ToolExecution {
            tool: "web_fetch".to_string(),
            message: "HTTP 500".to_string(),
        };
        assert_eq!(err.to_string(), "Tool 'web_fetch' failed: HTTP 500");
    }

    #[test]
    fn test_io_error_maps_to_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(matches!(AgentError::from(io), AgentError::Persistence(_)));
    }
}
