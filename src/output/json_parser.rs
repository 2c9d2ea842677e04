//! 结构化输出解析与校验管线
//!
//! 解析：按顺序尝试本地修复策略（去 Tab -> 语法修正 -> 截取对象），首个成功者胜出；
//! 全部失败后交给外部修复能力，修复结果仍无法解析则报 `AgentError::Parse`。
//! 校验：反序列化为目标类型即通过；否则把已解析的值交给外部修复一次，仍失败报 `AgentError::Validation`。
//! 管线本身从不编造字段内容，只做语法层面的修正。

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::core::AgentError;
use crate::output::fixer::JsonFixer;
use crate::output::repair::{default_strategies, RepairStrategy};
use crate::output::schema::schema_json;

pub struct JsonOutputParser {
    strategies: Vec<Box<dyn RepairStrategy>>,
    fixer: Arc<dyn JsonFixer>,
}

impl JsonOutputParser {
    pub fn new(fixer: Arc<dyn JsonFixer>) -> Self {
        Self {
            strategies: default_strategies(),
            fixer,
        }
    }

    /// 替换本地策略列表（顺序即尝试顺序）
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn RepairStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// 解析并校验为类型 T；schema 由 T 的 JsonSchema 生成
    pub async fn parse_and_validate<T>(&self, raw: &str) -> Result<T, AgentError>
    where
        T: DeserializeOwned + JsonSchema,
    {
        let schema = schema_json::<T>();
        let value = self.parse(raw, &schema).await?;
        self.validate(value, &schema).await
    }

    /// 只跑本地策略；不调用外部修复
    pub fn repair_locally(&self, raw: &str) -> Option<Value> {
        let mut text = raw.to_string();
        for strategy in &self.strategies {
            let attempt = strategy.attempt(&text);
            if let Some(value) = attempt.value {
                tracing::debug!(strategy = strategy.name(), "structured output parsed");
                return Some(value);
            }
            tracing::debug!(strategy = strategy.name(), "repair strategy failed");
            text = attempt.text;
        }
        None
    }

    /// 解析阶段：本地策略 -> 外部修复
    pub async fn parse(&self, raw: &str, schema: &str) -> Result<Value, AgentError> {
        if let Some(value) = self.repair_locally(raw) {
            return Ok(value);
        }
        tracing::warn!(chars = raw.len(), "local repair exhausted, delegating to external fixer");
        self.fix_and_parse(raw, schema)
            .await
            .map_err(|e| AgentError::Parse(format!("Could not parse JSON: {e}")))
    }

    /// 校验阶段：反序列化失败时交给外部修复一次
    pub async fn validate<T>(&self, value: Value, schema: &str) -> Result<T, AgentError>
    where
        T: DeserializeOwned,
    {
        let first_err = match serde_json::from_value::<T>(value.clone()) {
            Ok(v) => return Ok(v),
            Err(e) => e,
        };
        tracing::warn!(error = %first_err, "structured output does not match schema, delegating to external fixer");

        let fixed = self
            .fix_and_parse(&value.to_string(), schema)
            .await
            .map_err(|e| AgentError::Validation(format!("Could not validate JSON: {first_err}; {e}")))?;
        serde_json::from_value::<T>(fixed)
            .map_err(|e| AgentError::Validation(format!("Could not validate JSON: {e}")))
    }

    async fn fix_and_parse(&self, text: &str, schema: &str) -> Result<Value, String> {
        let fixed = self.fixer.fix(text, schema).await?;
        serde_json::from_str(&fixed).map_err(|e| format!("fixer output is not valid JSON ({e}): {fixed}"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::output::schema::{Decision, EntityMap};

    /// 记录调用次数、按脚本返回的修复器
    #[derive(Default)]
    struct ScriptedFixer {
        calls: AtomicUsize,
        outputs: Mutex<VecDeque<String>>,
    }

    impl ScriptedFixer {
        fn with_outputs(outputs: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outputs: Mutex::new(outputs.iter().map(|s| s.to_string()).collect()),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl JsonFixer for ScriptedFixer {
        async fn fix(&self, _text: &str, _schema: &str) -> Result<String, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outputs
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| "no fix available".to_string())
        }
    }

    const VALID_DECISION: &str = r#"{
        "thoughts": {"task": "t", "idea": "i", "reasoning": "r", "summary": "s"},
        "action": {"tool_name": "task_complete", "args": {"result": "Paris"}}
    }"#;

    #[tokio::test]
    async fn test_valid_input_takes_cheap_path() {
        let fixer = ScriptedFixer::with_outputs(&[]);
        let parser = JsonOutputParser::new(fixer.clone());
        let raw = r#"{"a": [1, 2, {"b": "c"}], "d": null}"#;
        let v: Value = parser.parse_and_validate(raw).await.unwrap();
        assert_eq!(v, serde_json::from_str::<Value>(raw).unwrap());
        assert_eq!(fixer.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_escape_matches_escape_free_version() {
        let parser = JsonOutputParser::new(ScriptedFixer::with_outputs(&[]));
        let broken: Value = parser
            .parse_and_validate(r#"{"note": "see C:\windows"}"#)
            .await
            .unwrap();
        let clean: Value = parser
            .parse_and_validate(r#"{"note": "see C:windows"}"#)
            .await
            .unwrap();
        assert_eq!(broken, clean);
    }

    #[tokio::test]
    async fn test_extra_and_missing_braces() {
        let parser = JsonOutputParser::new(ScriptedFixer::with_outputs(&[]));
        let v: Value = parser.parse_and_validate(r#"{"a": {"b": 1}}}}"#).await.unwrap();
        assert_eq!(v, json!({"a": {"b": 1}}));
        let v: Value = parser.parse_and_validate(r#"{"a": {"b": {"c": 1"#).await.unwrap();
        assert_eq!(v, json!({"a": {"b": {"c": 1}}}));
    }

    #[tokio::test]
    async fn test_decision_wrapped_in_prose() {
        let parser = JsonOutputParser::new(ScriptedFixer::with_outputs(&[]));
        let raw = format!("Here is my decision:\n```json\n{VALID_DECISION}\n```");
        let d: Decision = parser.parse_and_validate(&raw).await.unwrap();
        assert_eq!(d.action.tool_name, "task_complete");
        assert_eq!(d.action.arg_text("result").as_deref(), Some("Paris"));
    }

    #[tokio::test]
    async fn test_unparseable_goes_to_fixer() {
        let fixer = ScriptedFixer::with_outputs(&[r#"{"Paris": "capital of France"}"#]);
        let parser = JsonOutputParser::new(fixer.clone());
        let m: EntityMap = parser.parse_and_validate("Paris is the capital").await.unwrap();
        assert_eq!(m.get("Paris").map(String::as_str), Some("capital of France"));
        assert_eq!(fixer.calls(), 1);
    }

    #[tokio::test]
    async fn test_fixer_garbage_is_parse_error() {
        let fixer = ScriptedFixer::with_outputs(&["still not json"]);
        let parser = JsonOutputParser::new(fixer);
        let r: Result<Value, _> = parser.parse_and_validate("nothing here").await;
        assert!(matches!(r, Err(AgentError::Parse(_))));
    }

    #[tokio::test]
    async fn test_schema_mismatch_gets_one_fix_attempt() {
        let fixer = ScriptedFixer::with_outputs(&[VALID_DECISION]);
        let parser = JsonOutputParser::new(fixer.clone());
        // 需要配平花括号，且缺少 action
        let raw = r#"{"thoughts": {"task": "t", "idea": "i", "reasoning": "r", "summary": "s""#;
        let d: Decision = parser.parse_and_validate(raw).await.unwrap();
        assert_eq!(d.action.tool_name, "task_complete");
        assert_eq!(fixer.calls(), 1);
    }

    #[tokio::test]
    async fn test_schema_mismatch_after_fix_is_validation_error() {
        let fixer = ScriptedFixer::with_outputs(&[r#"{"still": "wrong"}"#]);
        let parser = JsonOutputParser::new(fixer.clone());
        let r: Result<Decision, _> = parser.parse_and_validate(r#"{"foo": 1}"#).await;
        assert!(matches!(r, Err(AgentError::Validation(_))));
        assert_eq!(fixer.calls(), 1);
    }

    #[test]
    fn test_repair_locally_rejects_non_json() {
        let parser = JsonOutputParser::new(ScriptedFixer::with_outputs(&[]));
        assert!(parser.repair_locally("{unbalanced: [").is_none());
    }
}
