//! 生成服务抽象
//!
//! 所有后端（OpenAI 兼容 / DeepSeek / Mock）实现 LlmClient。返回的是自由文本，
//! 调用方在信任其结构之前必须经过 `output::JsonOutputParser`。

use async_trait::async_trait;

use crate::llm::Message;

/// LLM 客户端 trait：一次阻塞式（从循环视角）完成调用
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, messages: &[Message]) -> Result<String, String>;

    /// 获取累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    /// 默认返回 (0, 0, 0)，具体实现可覆盖
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}
