//! 外部修复能力：让生成服务按 schema 修正畸形或不合规的 JSON
//!
//! 尽力而为：返回的文本仍可能不合规，由调用方的管线步骤判定失败。

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::{prompts, LlmClient};

/// 修复能力 trait：(畸形文本, schema 文本) -> 修正后的文本
#[async_trait]
pub trait JsonFixer: Send + Sync {
    async fn fix(&self, text: &str, schema: &str) -> Result<String, String>;
}

/// 通过 LlmClient 实现的修复器
pub struct LlmJsonFixer {
    llm: Arc<dyn LlmClient>,
}

impl LlmJsonFixer {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl JsonFixer for LlmJsonFixer {
    async fn fix(&self, text: &str, schema: &str) -> Result<String, String> {
        let messages = prompts::fix_json_messages(text, schema);
        let fixed = self.llm.complete(&messages).await?;
        Ok(fixed.trim().to_string())
    }
}
