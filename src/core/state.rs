//! 持久化的 Agent 状态：`<dir>/agent_data.json`
//!
//! 只记录名字、角色与两个记忆索引目录；任务计划不持久化，恢复运行时重新生成。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

pub const AGENT_DATA_FILE: &str = "agent_data.json";
pub const EPISODIC_MEMORY_DIR: &str = "episodic_memory";
pub const SEMANTIC_MEMORY_DIR: &str = "semantic_memory";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentData {
    pub name: String,
    pub role: String,
    pub episodic_memory: PathBuf,
    pub semantic_memory: PathBuf,
}

impl AgentData {
    /// 以数据目录下的默认子目录构造
    pub fn new(dir: &Path, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            episodic_memory: dir.join(EPISODIC_MEMORY_DIR),
            semantic_memory: dir.join(SEMANTIC_MEMORY_DIR),
        }
    }

    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(AGENT_DATA_FILE)
    }

    pub fn exists(dir: &Path) -> bool {
        Self::file_path(dir).is_file()
    }

    pub fn save(&self, dir: &Path) -> Result<(), AgentError> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| AgentError::Persistence(format!("serialize agent data: {e}")))?;
        std::fs::write(Self::file_path(dir), json)?;
        Ok(())
    }

    pub fn load(dir: &Path) -> Result<Self, AgentError> {
        let path = Self::file_path(dir);
        let data = std::fs::read_to_string(&path)
            .map_err(|e| AgentError::Persistence(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&data)
            .map_err(|e| AgentError::Persistence(format!("corrupted {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!AgentData::exists(dir.path()));
        let data = AgentData::new(dir.path(), "Scout", "researcher");
        data.save(dir.path()).unwrap();
        assert!(AgentData::exists(dir.path()));
        assert_eq!(AgentData::load(dir.path()).unwrap(), data);
        assert!(data.episodic_memory.ends_with(EPISODIC_MEMORY_DIR));
    }

    #[test]
    fn test_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        AgentData::new(dir.path(), "AI", "role").save(dir.path()).unwrap();
        let raw = std::fs::read_to_string(AgentData::file_path(dir.path())).unwrap();
        let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in ["name", "role", "episodic_memory", "semantic_memory"] {
            assert!(v.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn test_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(AgentData::file_path(dir.path()), "{\"name\": 1").unwrap();
        assert!(matches!(AgentData::load(dir.path()), Err(AgentError::Persistence(_))));
    }
}
