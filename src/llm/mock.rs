//! Mock LLM 客户端（用于测试，无需 API）
//!
//! 按顺序返回预置的回复；脚本耗尽后返回 fallback。记录每次收到的消息，便于断言提示词内容。

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, Message};

/// 脚本化 Mock：依次弹出回复，`Err` 项模拟生成服务失败
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    fallback: Option<String>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以一组成功回复创建
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mock = Self::new();
        for r in responses {
            mock.push_response(r);
        }
        mock
    }

    /// 脚本耗尽后固定返回的内容
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn push_response(&self, response: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Ok(response.into()));
        }
    }

    pub fn push_error(&self, error: impl Into<String>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(error.into()));
        }
    }

    /// 已发生的调用次数
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 所有调用收到的消息（按调用顺序）
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// 剩余未消费的脚本条数
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(messages.to_vec());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(r) => r,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| "mock script exhausted".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_replays_script_in_order() {
        let mock = MockLlmClient::with_responses(["first", "second"]);
        assert_eq!(mock.complete(&[Message::user("a")]).await.unwrap(), "first");
        assert_eq!(mock.complete(&[Message::user("b")]).await.unwrap(), "second");
        assert!(mock.complete(&[]).await.is_err());
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.calls()[1][0].content, "b");
    }

    #[tokio::test]
    async fn test_mock_error_and_fallback() {
        let mock = MockLlmClient::new().with_fallback("done");
        mock.push_error("boom");
        assert_eq!(mock.complete(&[]).await.unwrap_err(), "boom");
        assert_eq!(mock.complete(&[]).await.unwrap(), "done");
        assert_eq!(mock.remaining(), 0);
    }
}
