//! 工具描述符
//!
//! 每个工具在注册时固定为 {规范化名称, 描述, 有序参数名, 是否需确认, 调用句柄}；
//! 调用前按声明校验参数键，调用失败统一包装为 `AgentError::ToolExecution`，并输出一条 JSON 审计日志。

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::core::AgentError;

/// 工具调用句柄：参数为 参数名 -> 值，返回文本结果
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, args: &Map<String, Value>) -> Result<String, String>;
}

/// 把同步闭包包装为 ToolHandler
pub struct FnTool<F>(pub F);

#[async_trait]
impl<F> ToolHandler for FnTool<F>
where
    F: Fn(&Map<String, Value>) -> Result<String, String> + Send + Sync,
{
    async fn invoke(&self, args: &Map<String, Value>) -> Result<String, String> {
        (self.0)(args)
    }
}

#[derive(Clone)]
pub struct AgentTool {
    name: String,
    description: String,
    args: Vec<String>,
    user_permission_required: bool,
    handler: Arc<dyn ToolHandler>,
}

impl fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("user_permission_required", &self.user_permission_required)
            .finish()
    }
}

impl AgentTool {
    /// 名称在此规范化；规范化后为空则报 `InvalidToolName`。默认执行前需要操作者确认。
    pub fn new(
        name: &str,
        description: impl Into<String>,
        args: &[&str],
        handler: impl ToolHandler + 'static,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            name: normalize_name(name)?,
            description: description.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            user_permission_required: true,
            handler: Arc::new(handler),
        })
    }

    pub fn from_fn<F>(
        name: &str,
        description: impl Into<String>,
        args: &[&str],
        f: F,
    ) -> Result<Self, AgentError>
    where
        F: Fn(&Map<String, Value>) -> Result<String, String> + Send + Sync + 'static,
    {
        Self::new(name, description, args, FnTool(f))
    }

    pub fn with_permission_required(mut self, required: bool) -> Self {
        self.user_permission_required = required;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn user_permission_required(&self) -> bool {
        self.user_permission_required
    }

    /// 提示词中的一行：`name: "description", args: a: <a>, b: <b>`
    pub fn tool_info(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|a| format!("{a}: <{a}>"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: \"{}\", args: {}", self.name, self.description, args)
    }

    /// 参数键必须与声明完全一致：不缺、不多
    pub fn validate_args(&self, args: &Map<String, Value>) -> Result<(), AgentError> {
        let missing: Vec<&str> = self
            .args
            .iter()
            .filter(|a| !args.contains_key(a.as_str()))
            .map(String::as_str)
            .collect();
        let unexpected: Vec<&str> = args
            .keys()
            .filter(|k| !self.args.iter().any(|a| a == *k))
            .map(String::as_str)
            .collect();
        if missing.is_empty() && unexpected.is_empty() {
            return Ok(());
        }
        let mut problems = Vec::new();
        if !missing.is_empty() {
            problems.push(format!("missing [{}]", missing.join(", ")));
        }
        if !unexpected.is_empty() {
            problems.push(format!("unexpected [{}]", unexpected.join(", ")));
        }
        Err(AgentError::InvalidToolArgs {
            tool: self.name.clone(),
            message: problems.join("; "),
        })
    }

    pub async fn run(&self, args: &Map<String, Value>) -> Result<String, AgentError> {
        self.validate_args(args)?;
        let start = Instant::now();
        let result = self.handler.invoke(args).await;

        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": self.name,
            "ok": result.is_ok(),
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview(args),
        });
        tracing::info!(audit = %audit, "tool");

        result.map_err(|message| AgentError::ToolExecution {
            tool: self.name.clone(),
            message,
        })
    }
}

/// 小写化，非字母数字字符折叠为单个下划线，去掉首尾下划线
pub fn normalize_name(raw: &str) -> Result<String, AgentError> {
    let lowered: String = raw
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase();
    let name = lowered.split_whitespace().collect::<Vec<_>>().join("_");
    if name.is_empty() {
        return Err(AgentError::InvalidToolName(raw.to_string()));
    }
    Ok(name)
}

fn args_preview(args: &Map<String, Value>) -> String {
    let s = Value::Object(args.clone()).to_string();
    if s.chars().count() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo() -> AgentTool {
        AgentTool::from_fn("Echo Text", "Repeat the text back", &["text"], |args| {
            args.get("text")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| "text must be a string".to_string())
        })
        .unwrap()
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Google Search!").unwrap(), "google_search");
        assert_eq!(normalize_name("  web--fetch  ").unwrap(), "web_fetch");
        assert_eq!(normalize_name("ReadFile2").unwrap(), "readfile2");
        assert!(matches!(normalize_name(""), Err(AgentError::InvalidToolName(_))));
        assert!(matches!(normalize_name(" !?- "), Err(AgentError::InvalidToolName(_))));
    }

    #[test]
    fn test_tool_info() {
        assert_eq!(echo().tool_info(), "echo_text: \"Repeat the text back\", args: text: <text>");
    }

    #[test]
    fn test_permission_defaults_to_required() {
        assert!(echo().user_permission_required());
        assert!(!echo().with_permission_required(false).user_permission_required());
    }

    #[tokio::test]
    async fn test_run_ok() {
        let out = echo().run(&args(json!({"text": "hi"}))).await.unwrap();
        assert_eq!(out, "hi");
    }

    #[tokio::test]
    async fn test_run_rejects_missing_and_unexpected_args() {
        let tool = echo();
        let r = tool.run(&args(json!({}))).await;
        assert!(matches!(r, Err(AgentError::InvalidToolArgs { ref message, .. }) if message.contains("missing")));
        let r = tool.run(&args(json!({"text": "a", "loud": true}))).await;
        assert!(matches!(r, Err(AgentError::InvalidToolArgs { ref message, .. }) if message.contains("loud")));
    }

    #[tokio::test]
    async fn test_handler_failure_is_wrapped() {
        let r = echo().run(&args(json!({"text": 42}))).await;
        match r {
            Err(AgentError::ToolExecution { tool, message }) => {
                assert_eq!(tool, "echo_text");
                assert!(message.contains("must be a string"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
