//! 结构化输出的 schema（schemars 自动生成）
//!
//! 推理决策与实体映射都以 Rust 类型声明；`schema_json::<T>()` 生成的 JSON Schema 同时拼进提示词与修复请求，
//! 反序列化成功即视为通过校验。

use std::collections::BTreeMap;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 推理一步的结构化决策
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Decision {
    /// observation of [RECENT EPISODES]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
    pub thoughts: Thoughts,
    pub action: Action,
}

/// 决策中的思考字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Thoughts {
    /// description of [YOUR TASK] assigned to you
    pub task: String,
    /// key points of helpful knowledge in [RELATED KNOWLEDGE], if any
    #[serde(default)]
    pub knowledge: String,
    /// key points of helpful events in [RELATED PAST EPISODES], if any
    #[serde(default)]
    pub past_events: String,
    /// thought to perform the task
    pub idea: String,
    /// reasoning of the thought
    pub reasoning: String,
    /// constructive self-criticism
    #[serde(default)]
    pub criticism: String,
    /// thoughts summary to say to user
    pub summary: String,
}

impl Thoughts {
    /// 按固定顺序给出 (标题, 内容)，供通知操作者
    pub fn fields(&self) -> [(&'static str, &str); 7] {
        [
            ("TASK", self.task.as_str()),
            ("KNOWLEDGE", self.knowledge.as_str()),
            ("PAST EVENTS", self.past_events.as_str()),
            ("IDEA", self.idea.as_str()),
            ("REASONING", self.reasoning.as_str()),
            ("CRITICISM", self.criticism.as_str()),
            ("THOUGHT", self.summary.as_str()),
        ]
    }
}

/// 下一步动作：工具名 + 参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Action {
    /// One of the tool names included in [TOOLS]
    pub tool_name: String,
    /// argument name -> value
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl Action {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args: Map::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }

    /// 取字符串参数；非字符串值按 JSON 文本返回
    pub fn arg_text(&self, name: &str) -> Option<String> {
        self.args.get(name).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// 实体名 -> 描述
pub type EntityMap = BTreeMap<String, String>;

/// 返回类型 T 的 JSON Schema 字符串，可拼入提示词
pub fn schema_json<T: JsonSchema>() -> String {
    let schema = schema_for!(T);
    serde_json::to_string_pretty(&schema).unwrap_or_else(|_| String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decision_schema_lists_required_fields() {
        let schema = schema_json::<Decision>();
        assert!(schema.contains("tool_name"));
        assert!(schema.contains("thoughts"));
        assert!(schema.contains("reasoning"));
    }

    #[test]
    fn test_decision_optional_fields_default() {
        let d: Decision = serde_json::from_value(json!({
            "thoughts": {"task": "t", "idea": "i", "reasoning": "r", "summary": "s"},
            "action": {"tool_name": "task_complete"}
        }))
        .unwrap();
        assert!(d.observation.is_none());
        assert!(d.thoughts.criticism.is_empty());
        assert!(d.action.args.is_empty());
    }

    #[test]
    fn test_decision_missing_action_fails() {
        let r: Result<Decision, _> = serde_json::from_value(json!({
            "thoughts": {"task": "t", "idea": "i", "reasoning": "r", "summary": "s"}
        }));
        assert!(r.is_err());
    }

    #[test]
    fn test_action_arg_text() {
        let a = Action::new("task_complete")
            .with_arg("result", "Paris")
            .with_arg("count", 3);
        assert_eq!(a.arg_text("result").as_deref(), Some("Paris"));
        assert_eq!(a.arg_text("count").as_deref(), Some("3"));
        assert!(a.arg_text("missing").is_none());
    }

    #[test]
    fn test_entity_map_rejects_nested_values() {
        let r: Result<EntityMap, _> = serde_json::from_value(json!({"Paris": {"kind": "city"}}));
        assert!(r.is_err());
    }
}
