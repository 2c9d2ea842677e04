//! 工具：描述符（规范化名称、参数声明、审计日志）与内置工具

pub mod descriptor;
pub mod web_fetch;

pub use descriptor::{normalize_name, AgentTool, FnTool, ToolHandler};
pub use web_fetch::{WebFetchTool, WEB_FETCH_NAME};

use crate::config::ToolsSection;
use crate::core::AgentError;

/// 按配置构建内置工具集
pub fn builtin_tools(cfg: &ToolsSection) -> Result<Vec<AgentTool>, AgentError> {
    let mut tools = Vec::new();
    if cfg.web_fetch.enabled {
        tools.push(
            WebFetchTool::from_config(&cfg.web_fetch)?
                .into_agent_tool(cfg.web_fetch.user_permission_required)?,
        );
    }
    Ok(tools)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_tools_follow_config() {
        let mut cfg = ToolsSection::default();
        let tools = builtin_tools(&cfg).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), WEB_FETCH_NAME);
        assert!(tools[0].user_permission_required());

        cfg.web_fetch.enabled = false;
        assert!(builtin_tools(&cfg).unwrap().is_empty());
    }

    #[test]
    fn test_builtin_tools_reject_zero_timeout() {
        let mut cfg = ToolsSection::default();
        cfg.web_fetch.timeout_secs = 0;
        assert!(matches!(builtin_tools(&cfg), Err(AgentError::Config(_))));
    }
}
