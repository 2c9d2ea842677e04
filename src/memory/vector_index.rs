//! 相似度索引：嵌入向量 -> 载荷
//!
//! 三类记忆各自独占一个索引实例。支持增量插入、k 近邻检索（余弦相似度）与整目录持久化；
//! 空索引检索直接返回空结果，不调用嵌入服务。
//!
//! 索引维度由第一条记录（或载入的文件）确定，之后所有向量都必须同维；
//! 载入时用当前嵌入服务试嵌一次，维度不符说明嵌入模型已更换，直接报错而不是静默检索出无意义结果。

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::EmbeddingProvider;

/// 索引目录中的数据文件名
pub const INDEX_FILE: &str = "index.json";

const DIMENSION_PROBE: &str = "dimension check";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry<P> {
    pub vector: Vec<f32>,
    pub payload: P,
}

#[derive(Serialize, Deserialize)]
struct IndexFile<P> {
    dimension: usize,
    entries: Vec<IndexEntry<P>>,
}

pub struct VectorIndex<P> {
    embedder: Arc<dyn EmbeddingProvider>,
    dimension: Option<usize>,
    entries: Vec<IndexEntry<P>>,
}

impl<P> VectorIndex<P>
where
    P: Clone + Serialize + DeserializeOwned,
{
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            dimension: None,
            entries: Vec::new(),
        }
    }

    /// 已确定的向量维度；尚无记录时为 None
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, AgentError> {
        let vector = self.embedder.embed(text).await.map_err(AgentError::Embedding)?;
        if vector.is_empty() {
            return Err(AgentError::Embedding(format!(
                "empty embedding for text: {:?}",
                truncate(text, 60)
            )));
        }
        Ok(vector)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), AgentError> {
        match self.dimension {
            Some(dim) if dim != vector.len() => Err(AgentError::Embedding(format!(
                "embedding has {} dimensions but the index holds {dim}-dimensional vectors; \
                 the embedding model changed since the index was built",
                vector.len()
            ))),
            _ => Ok(()),
        }
    }

    /// 嵌入 text 并追加一条记录；向量维度与索引不符时拒绝
    pub async fn insert(&mut self, text: &str, payload: P) -> Result<(), AgentError> {
        let vector = self.embed(text).await?;
        self.check_dimension(&vector)?;
        self.dimension = Some(vector.len());
        self.entries.push(IndexEntry { vector, payload });
        Ok(())
    }

    /// 返回与 query 最相近的至多 k 条 (分数, 载荷)，分数降序；同分保持插入顺序
    pub async fn nearest(&self, query: &str, k: usize) -> Result<Vec<(f32, P)>, AgentError> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query = self.embed(query).await?;
        self.check_dimension(&query)?;

        let mut scored: Vec<(f32, &P)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(&query, &e.vector), &e.payload))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, payload)| (score, payload.clone()))
            .collect())
    }

    pub fn payloads(&self) -> impl Iterator<Item = &P> {
        self.entries.iter().map(|e| &e.payload)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.dimension = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 写入 `<dir>/index.json`；目录不存在时自动创建
    pub fn save(&self, dir: &Path) -> Result<(), AgentError> {
        std::fs::create_dir_all(dir)?;
        let file = IndexFile {
            dimension: self.dimension.unwrap_or(0),
            entries: self.entries.clone(),
        };
        let json = serde_json::to_string(&file)
            .map_err(|e| AgentError::Persistence(format!("serialize index: {e}")))?;
        std::fs::write(dir.join(INDEX_FILE), json)?;
        tracing::debug!(dir = %dir.display(), entries = self.entries.len(), "similarity index saved");
        Ok(())
    }

    /// 从 `<dir>/index.json` 恢复，替换当前全部记录
    ///
    /// 文件损坏报 `Persistence`；当前嵌入服务的维度与文件不符报 `Embedding`
    pub async fn load(&mut self, dir: &Path) -> Result<(), AgentError> {
        let path = dir.join(INDEX_FILE);
        let data = std::fs::read_to_string(&path).map_err(|e| {
            AgentError::Persistence(format!("read {}: {e}", path.display()))
        })?;
        let file: IndexFile<P> = serde_json::from_str(&data).map_err(|e| {
            AgentError::Persistence(format!("corrupted index {}: {e}", path.display()))
        })?;
        if let Some(bad) = file.entries.iter().find(|e| e.vector.len() != file.dimension) {
            return Err(AgentError::Persistence(format!(
                "corrupted index {}: vector of length {} in a {}-dimensional index",
                path.display(),
                bad.vector.len(),
                file.dimension
            )));
        }
        let dimension = (!file.entries.is_empty() || file.dimension > 0).then_some(file.dimension);
        if let Some(dim) = dimension {
            let probe = self.embed(DIMENSION_PROBE).await?;
            if probe.len() != dim {
                return Err(AgentError::Embedding(format!(
                    "index {} holds {dim}-dimensional vectors but the configured embedder produces {}",
                    path.display(),
                    probe.len()
                )));
            }
        }
        self.dimension = dimension;
        self.entries = file.entries;
        tracing::debug!(dir = %dir.display(), entries = self.entries.len(), "similarity index loaded");
        Ok(())
    }
}

/// 余弦相似度；维度不一致或零向量时为 0
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashingEmbedder;

    fn index() -> VectorIndex<String> {
        VectorIndex::new(Arc::new(HashingEmbedder::default()))
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let idx = index();
        assert!(idx.nearest("anything", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_nearest_orders_by_similarity() {
        let mut idx = index();
        idx.insert("rust borrow checker ownership", "rust".into()).await.unwrap();
        idx.insert("paris capital of france", "paris".into()).await.unwrap();
        idx.insert("bread flour yeast baking", "bread".into()).await.unwrap();

        let hits = idx.nearest("what is the capital of france", 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].1, "paris");
        assert!(hits[0].0 >= hits[1].0);
    }

    #[tokio::test]
    async fn test_k_larger_than_index() {
        let mut idx = index();
        idx.insert("one", "1".into()).await.unwrap();
        assert_eq!(idx.nearest("one", 10).await.unwrap().len(), 1);
        assert!(idx.nearest("one", 0).await.unwrap().is_empty());
    }

    struct NoVectors;

    #[async_trait::async_trait]
    impl EmbeddingProvider for NoVectors {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, String> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_empty_embedding_rejected() {
        let mut idx: VectorIndex<String> = VectorIndex::new(Arc::new(NoVectors));
        let r = idx.insert("text", "x".into()).await;
        assert!(matches!(r, Err(AgentError::Embedding(_))));
        assert!(idx.is_empty());
    }

    #[tokio::test]
    async fn test_blank_text_is_indexed_as_zero_vector() {
        let mut idx = index();
        idx.insert("   ", "blank".into()).await.unwrap();
        let hits = idx.nearest("anything", 1).await.unwrap();
        assert_eq!(hits, vec![(0.0, "blank".to_string())]);
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodic_memory");
        let mut idx = index();
        idx.insert("paris capital of france", "paris".into()).await.unwrap();
        idx.save(&path).unwrap();

        let mut restored = index();
        restored.load(&path).await.unwrap();
        assert_eq!(restored.len(), 1);
        let hits = restored.nearest("france", 1).await.unwrap();
        assert_eq!(hits[0].1, "paris");
    }

    #[tokio::test]
    async fn test_load_missing_or_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let mut idx = index();
        assert!(matches!(idx.load(dir.path()).await, Err(AgentError::Persistence(_))));
        std::fs::write(dir.path().join(INDEX_FILE), "{not json").unwrap();
        assert!(matches!(idx.load(dir.path()).await, Err(AgentError::Persistence(_))));
    }

    #[tokio::test]
    async fn test_insert_rejects_other_dimension() {
        let mut idx = index();
        idx.insert("paris capital of france", "paris".into()).await.unwrap();
        assert_eq!(idx.dimension(), Some(256));

        idx.embedder = Arc::new(HashingEmbedder::new(128));
        let r = idx.insert("bread flour yeast", "bread".into()).await;
        assert!(matches!(r, Err(AgentError::Embedding(_))));
        assert_eq!(idx.len(), 1);
        assert!(matches!(idx.nearest("france", 1).await, Err(AgentError::Embedding(_))));
    }

    #[tokio::test]
    async fn test_load_with_changed_embedder_fails_and_file_stays_loadable() {
        let dir = tempfile::tempdir().unwrap();
        let mut idx: VectorIndex<String> = VectorIndex::new(Arc::new(HashingEmbedder::new(64)));
        idx.insert("paris capital of france", "p".into()).await.unwrap();
        idx.save(dir.path()).unwrap();

        let mut wider: VectorIndex<String> = VectorIndex::new(Arc::new(HashingEmbedder::new(128)));
        let r = wider.load(dir.path()).await;
        assert!(matches!(r, Err(AgentError::Embedding(_))));
        assert!(wider.is_empty());

        let mut same: VectorIndex<String> = VectorIndex::new(Arc::new(HashingEmbedder::new(64)));
        same.load(dir.path()).await.unwrap();
        assert_eq!(same.dimension(), Some(64));
        same.insert("bread flour", "b".into()).await.unwrap();
        same.save(dir.path()).unwrap();
        same.load(dir.path()).await.unwrap();
        assert_eq!(same.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_resets_dimension() {
        let mut idx = index();
        idx.insert("one", "1".into()).await.unwrap();
        idx.clear();
        assert_eq!(idx.dimension(), None);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }
}
