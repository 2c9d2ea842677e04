//! 程序性记忆：工具目录
//!
//! 按名查找（大小写不敏感）、列出全部、按描述与查询的语义相近度排序。
//! 每次注册都重建整个描述索引，载荷为工具在目录中的位置；新目录与新索引全部嵌入成功后才替换旧的，
//! 中途失败时目录与索引保持注册前的状态。

use std::sync::Arc;

use crate::core::AgentError;
use crate::llm::EmbeddingProvider;
use crate::memory::vector_index::VectorIndex;
use crate::tools::AgentTool;

pub struct ProceduralMemory {
    embedder: Arc<dyn EmbeddingProvider>,
    tools: Vec<AgentTool>,
    index: VectorIndex<usize>,
}

impl ProceduralMemory {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            index: VectorIndex::new(embedder.clone()),
            embedder,
            tools: Vec::new(),
        }
    }

    /// 注册工具；同名工具被替换
    pub async fn register(&mut self, tools: Vec<AgentTool>) -> Result<(), AgentError> {
        let mut catalog = self.tools.clone();
        for tool in tools {
            match catalog.iter_mut().find(|t| t.name() == tool.name()) {
                Some(existing) => {
                    tracing::warn!(tool = tool.name(), "tool registered twice, replacing");
                    *existing = tool;
                }
                None => catalog.push(tool),
            }
        }

        let mut index = VectorIndex::new(self.embedder.clone());
        for (position, tool) in catalog.iter().enumerate() {
            index.insert(tool.description(), position).await?;
        }
        self.tools = catalog;
        self.index = index;
        tracing::info!(count = self.tools.len(), "tools registered");
        Ok(())
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<&AgentTool, AgentError> {
        let wanted = name.trim().to_lowercase();
        self.tools
            .iter()
            .find(|t| t.name().to_lowercase() == wanted)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    pub fn list_all(&self) -> &[AgentTool] {
        &self.tools
    }

    /// 描述与 query 最相近的至多 k 个工具，按相似度降序
    pub async fn rank_relevant(&self, query: &str, k: usize) -> Result<Vec<&AgentTool>, AgentError> {
        let hits = self.index.nearest(query, k).await?;
        Ok(hits
            .into_iter()
            .filter_map(|(_, position)| self.tools.get(position))
            .collect())
    }

    /// 全部工具的提示词行，每行以换行结尾
    pub fn tool_info(&self) -> String {
        self.tools.iter().map(|t| t.tool_info() + "\n").collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashingEmbedder;

    fn tool(name: &str, description: &str) -> AgentTool {
        let reply = name.to_string();
        AgentTool::from_fn(name, description, &[], move |_| Ok(reply.clone())).unwrap()
    }

    async fn memory() -> ProceduralMemory {
        let mut mem = ProceduralMemory::new(Arc::new(HashingEmbedder::default()));
        mem.register(vec![
            tool("Web Search", "search the web for pages about a topic"),
            tool("calculator", "evaluate arithmetic expressions and numbers"),
        ])
        .await
        .unwrap();
        mem
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let mem = memory().await;
        assert_eq!(mem.lookup_by_name("WEB_SEARCH").unwrap().name(), "web_search");
        assert!(matches!(mem.lookup_by_name("missing"), Err(AgentError::ToolNotFound(n)) if n == "missing"));
    }

    #[tokio::test]
    async fn test_rank_relevant() {
        let mem = memory().await;
        let ranked = mem.rank_relevant("arithmetic numbers", 2).await.unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].name(), "calculator");
    }

    #[tokio::test]
    async fn test_register_twice_rebuilds_index() {
        let mut mem = memory().await;
        mem.register(vec![tool("notes", "write a note to disk")]).await.unwrap();
        assert_eq!(mem.list_all().len(), 3);
        assert_eq!(mem.rank_relevant("anything", 10).await.unwrap().len(), 3);

        mem.register(vec![tool("Notes", "append a note")]).await.unwrap();
        assert_eq!(mem.list_all().len(), 3);
        assert_eq!(mem.lookup_by_name("notes").unwrap().description(), "append a note");
    }

    #[tokio::test]
    async fn test_empty_registry() {
        let mem = ProceduralMemory::new(Arc::new(HashingEmbedder::default()));
        assert!(mem.list_all().is_empty());
        assert!(mem.rank_relevant("x", 3).await.unwrap().is_empty());
        assert_eq!(mem.tool_info(), "");
    }

    #[tokio::test]
    async fn test_tool_info_lines() {
        let mem = memory().await;
        let info = mem.tool_info();
        assert_eq!(info.lines().count(), 2);
        assert!(info.starts_with("web_search: \"search the web"));
    }

    /// 描述含 "unreachable" 时嵌入失败
    struct FlakyEmbedder(HashingEmbedder);

    #[async_trait::async_trait]
    impl EmbeddingProvider for FlakyEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, String> {
            if text.contains("unreachable") {
                return Err("embedding service unreachable".to_string());
            }
            self.0.embed(text).await
        }
    }

    #[tokio::test]
    async fn test_failed_register_keeps_previous_catalog() {
        let mut mem = ProceduralMemory::new(Arc::new(FlakyEmbedder(HashingEmbedder::default())));
        mem.register(vec![
            tool("Web Search", "search the web for pages about a topic"),
            tool("calculator", "evaluate arithmetic expressions and numbers"),
        ])
        .await
        .unwrap();

        let r = mem
            .register(vec![
                tool("notes", "write a note to disk"),
                tool("calculator", "unreachable calculator"),
            ])
            .await;
        assert!(matches!(r, Err(AgentError::Embedding(_))));
        assert_eq!(mem.list_all().len(), 2);
        assert!(mem.lookup_by_name("notes").is_err());
        assert_eq!(
            mem.lookup_by_name("calculator").unwrap().description(),
            "evaluate arithmetic expressions and numbers"
        );
        assert_eq!(mem.rank_relevant("arithmetic", 10).await.unwrap().len(), 2);
    }
}
