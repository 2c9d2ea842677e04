//! 语义记忆：实体 -> 描述 的知识
//!
//! 动作结果经实体抽取提示词发给生成服务，输出走 JSON 修复管线校验为 `EntityMap`；
//! 每条 (实体, 描述) 以描述文本嵌入索引。同名实体不去重。

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{prompts, EmbeddingProvider, LlmClient};
use crate::memory::vector_index::VectorIndex;
use crate::output::{schema_json, EntityMap, JsonOutputParser};

/// 一条知识
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub entity: String,
    pub description: String,
}

pub struct SemanticMemory {
    index: VectorIndex<Fact>,
    llm: Arc<dyn LlmClient>,
    parser: Arc<JsonOutputParser>,
}

impl SemanticMemory {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        parser: Arc<JsonOutputParser>,
    ) -> Self {
        Self {
            index: VectorIndex::new(embedder),
            llm,
            parser,
        }
    }

    /// 已记录的知识条数（含同名实体）
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.index.payloads()
    }

    /// 从文本抽取实体并记录；返回抽取结果
    pub async fn extract_and_record(&mut self, text: &str) -> Result<EntityMap, AgentError> {
        let messages = prompts::extract_entity_messages(text, &schema_json::<EntityMap>());
        let raw = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| AgentError::Llm(format!("extract entities: {e}")))?;
        let entities: EntityMap = self.parser.parse_and_validate(&raw).await?;
        self.record(&entities).await?;
        Ok(entities)
    }

    /// 直接记录一组实体
    pub async fn record(&mut self, entities: &EntityMap) -> Result<(), AgentError> {
        for (entity, description) in entities {
            self.index
                .insert(
                    description,
                    Fact {
                        entity: entity.clone(),
                        description: description.clone(),
                    },
                )
                .await?;
        }
        tracing::debug!(count = entities.len(), total = self.index.len(), "knowledge recorded");
        Ok(())
    }

    /// 最相近的 k 条知识；同名实体保留最相近的描述
    pub async fn related(&self, query: &str, k: usize) -> Result<EntityMap, AgentError> {
        let hits = self.index.nearest(query, k).await?;
        let mut map = EntityMap::new();
        for (_, fact) in hits {
            map.entry(fact.entity).or_insert(fact.description);
        }
        tracing::debug!(k, found = map.len(), "related knowledge retrieved");
        Ok(map)
    }

    pub fn save(&self, dir: &Path) -> Result<(), AgentError> {
        self.index.save(dir)
    }

    pub async fn load(&mut self, dir: &Path) -> Result<(), AgentError> {
        self.index.load(dir).await
    }
}
