//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `MNEME__*` 覆盖（双下划线表示嵌套，如 `MNEME__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub agent: AgentSection,
    pub llm: LlmSection,
    pub embedding: EmbeddingSection,
    pub memory: MemorySection,
    pub tools: ToolsSection,
}

/// [agent] 段：名字、角色、目标与数据目录
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub name: String,
    pub role: String,
    pub goal: String,
    /// 记忆索引与 agent_data.json 的存放目录
    pub dir: PathBuf,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            name: "AI".to_string(),
            role: "Autonomous AI agent that uses both inference and tools to answer many things"
                .to_string(),
            goal: "Ending world hunger".to_string(),
            dir: PathBuf::from("./agent_data"),
        }
    }
}

/// [llm] 段：后端选择与确定性控制
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / deepseek
    pub provider: String,
    /// 未设置时按后端取默认模型
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            base_url: None,
            temperature: 0.0,
        }
    }
}

/// [embedding] 段：openai 走远端 /embeddings，hashing 为本地特征哈希
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSection {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    /// 仅本地哈希嵌入使用
    pub dimensions: usize,
}

impl Default for EmbeddingSection {
    fn default() -> Self {
        Self {
            provider: "hashing".to_string(),
            model: "text-embedding-3-small".to_string(),
            base_url: None,
            dimensions: 256,
        }
    }
}

/// [memory] 段：每轮推理检索的条数
///
/// relevant_tools 为 0 时提示词带全部工具；否则工具数超过该值时只带最相关的前 N 个
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub related_episodes: usize,
    pub related_knowledge: usize,
    pub recent_episodes: usize,
    pub relevant_tools: usize,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            related_episodes: 2,
            related_knowledge: 5,
            recent_episodes: 2,
            relevant_tools: 0,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ToolsSection {
    pub web_fetch: WebFetchSection,
}

/// [tools.web_fetch] 段：抓取 URL 的超时、最大字符数、允许的域名白名单
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebFetchSection {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub max_result_chars: usize,
    pub allowed_domains: Vec<String>,
    /// 执行前是否需要操作者确认
    pub user_permission_required: bool,
}

impl Default for WebFetchSection {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 15,
            max_result_chars: 8000,
            allowed_domains: default_allowed_domains(),
            user_permission_required: true,
        }
    }
}

fn default_allowed_domains() -> Vec<String> {
    vec![
        "en.wikipedia.org".into(),
        "simple.wikipedia.org".into(),
        "github.com".into(),
        "raw.githubusercontent.com".into(),
        "stackoverflow.com".into(),
        "docs.rs".into(),
        "crates.io".into(),
        "doc.rust-lang.org".into(),
        "developer.mozilla.org".into(), // MDN
        "arxiv.org".into(),
        "news.ycombinator.com".into(),
        "www.wolframalpha.com".into(),
    ]
}

/// 从 config 目录加载配置，环境变量 MNEME__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 MNEME__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        } else {
            tracing::warn!(path = %path.display(), "config file not found, ignored");
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("MNEME")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.agent.name, "AI");
        assert_eq!(cfg.memory.related_episodes, 2);
        assert_eq!(cfg.memory.related_knowledge, 5);
        assert_eq!(cfg.memory.recent_episodes, 2);
        assert_eq!(cfg.memory.relevant_tools, 0);
        assert_eq!(cfg.llm.temperature, 0.0);
        assert!(cfg.tools.web_fetch.user_permission_required);
    }

    #[test]
    fn test_load_explicit_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("agent.toml");
        std::fs::write(
            &path,
            "[agent]\nname = \"Scout\"\ngoal = \"Map the docs\"\n\n[memory]\nrelated_knowledge = 3\n",
        )
        .unwrap();
        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.agent.name, "Scout");
        assert_eq!(cfg.agent.goal, "Map the docs");
        assert_eq!(cfg.memory.related_knowledge, 3);
        assert_eq!(cfg.memory.related_episodes, 2);
    }
}
