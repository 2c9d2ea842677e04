//! 情节记忆：按顺序记录每轮 (思考, 动作, 结果, 摘要)
//!
//! 顺序存储以 1 起始的序号为键；摘要文本嵌入相似度索引，载荷为完整情节。
//! 持久化只写索引，`load` 时从载荷重建顺序存储。

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{prompts, EmbeddingProvider, LlmClient};
use crate::memory::vector_index::VectorIndex;
use crate::output::{Action, Thoughts};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub thoughts: Thoughts,
    pub action: Action,
    pub result: String,
    #[serde(default)]
    pub summary: String,
}

impl Episode {
    pub fn new(thoughts: Thoughts, action: Action, result: impl Into<String>) -> Self {
        Self {
            thoughts,
            action,
            result: result.into(),
            summary: String::new(),
        }
    }

    /// 单行 JSON，用于拼入提示词
    pub fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.summary.clone())
    }
}

/// 索引载荷：序号 + 情节
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEpisode {
    key: usize,
    episode: Episode,
}

pub struct EpisodicMemory {
    episodes: Vec<Episode>,
    index: VectorIndex<StoredEpisode>,
    llm: Arc<dyn LlmClient>,
}

impl EpisodicMemory {
    pub fn new(llm: Arc<dyn LlmClient>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            episodes: Vec::new(),
            index: VectorIndex::new(embedder),
            llm,
        }
    }

    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    /// 追加到顺序存储，并以摘要为文本写入索引
    pub async fn record(&mut self, episode: Episode) -> Result<(), AgentError> {
        let key = self.episodes.len() + 1;
        self.index
            .insert(
                &episode.summary,
                StoredEpisode {
                    key,
                    episode: episode.clone(),
                },
            )
            .await?;
        self.episodes.push(episode);
        tracing::debug!(key, "episode recorded");
        Ok(())
    }

    /// 请求生成服务摘要，写回 `summary` 后记录；返回记录下的情节
    pub async fn summarize_and_record(&mut self, mut episode: Episode) -> Result<Episode, AgentError> {
        let thoughts = serde_json::to_string(&episode.thoughts).unwrap_or_default();
        let action = serde_json::to_string(&episode.action).unwrap_or_default();
        let messages = prompts::summarize_messages(&thoughts, &action, &episode.result);
        let summary = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| AgentError::Llm(format!("summarize episode: {e}")))?;
        episode.summary = summary.trim().to_string();
        self.record(episode.clone()).await?;
        Ok(episode)
    }

    /// 最近 min(n, 总数) 条，按记录顺序
    pub fn recent(&self, n: usize) -> Vec<Episode> {
        let start = self.episodes.len().saturating_sub(n);
        self.episodes[start..].to_vec()
    }

    /// 与 query 最相近的至多 k 条；从未记录过时为空
    pub async fn related(&self, query: &str, k: usize) -> Result<Vec<Episode>, AgentError> {
        let hits = self.index.nearest(query, k).await?;
        tracing::debug!(k, found = hits.len(), "related episodes retrieved");
        Ok(hits.into_iter().map(|(_, s)| s.episode).collect())
    }

    pub fn save(&self, dir: &Path) -> Result<(), AgentError> {
        self.index.save(dir)
    }

    /// 加载索引并按序号重建顺序存储
    pub async fn load(&mut self, dir: &Path) -> Result<(), AgentError> {
        self.index.load(dir).await?;
        let mut stored: Vec<&StoredEpisode> = self.index.payloads().collect();
        stored.sort_by_key(|s| s.key);
        self.episodes = stored.into_iter().map(|s| s.episode.clone()).collect();
        Ok(())
    }
}
