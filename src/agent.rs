//! Agent 主控循环
//!
//! 生成计划后逐轮：取当前任务 -> 检索相关情节/知识 -> 推理得到决策 -> 完成任务或调用工具
//! -> 摘要并记录情节 -> 从结果抽取知识。计划耗尽是唯一的正常退出；其余错误原样向上传播。
//! 每次完成任务后持久化两类记忆索引与 agent_data.json。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{AgentSection, AppConfig, MemorySection};
use crate::core::{AgentData, AgentError, Task, TaskManager};
use crate::llm::{create_embedder_from_config, create_llm_from_config, EmbeddingProvider, LlmClient};
use crate::memory::{Episode, EpisodicMemory, ProceduralMemory, SemanticMemory};
use crate::output::{Action, Decision, EntityMap, JsonOutputParser, LlmJsonFixer};
use crate::react::{Planner, ReasonContext};
use crate::tools::{builtin_tools, AgentTool};
use crate::ui::{HumanInterface, Severity};

/// 完成当前任务的伪工具名
pub const TASK_COMPLETE: &str = "task_complete";
/// 操作者拒绝执行工具时的动作结果
pub const USER_DENIED: &str = "User Denied to run Action";

pub struct Agent {
    name: String,
    role: String,
    goal: String,
    dir: PathBuf,
    retrieval: MemorySection,
    llm: Arc<dyn LlmClient>,
    ui: Arc<dyn HumanInterface>,
    planner: Planner,
    task_manager: TaskManager,
    procedural: ProceduralMemory,
    episodic: EpisodicMemory,
    semantic: SemanticMemory,
}

impl Agent {
    pub fn new(
        settings: &AgentSection,
        retrieval: MemorySection,
        llm: Arc<dyn LlmClient>,
        embedder: Arc<dyn EmbeddingProvider>,
        ui: Arc<dyn HumanInterface>,
    ) -> Self {
        let parser = Arc::new(JsonOutputParser::new(Arc::new(LlmJsonFixer::new(llm.clone()))));
        Self {
            name: settings.name.clone(),
            role: settings.role.clone(),
            goal: settings.goal.clone(),
            dir: settings.dir.clone(),
            retrieval,
            planner: Planner::new(llm.clone(), parser.clone()),
            task_manager: TaskManager::new(),
            procedural: ProceduralMemory::new(embedder.clone()),
            episodic: EpisodicMemory::new(llm.clone(), embedder.clone()),
            semantic: SemanticMemory::new(llm.clone(), embedder, parser),
            llm,
            ui,
        }
    }

    /// 按配置选择生成服务与嵌入服务，并注册内置工具
    pub async fn from_config(cfg: &AppConfig, ui: Arc<dyn HumanInterface>) -> Result<Self, AgentError> {
        let llm = create_llm_from_config(cfg);
        let embedder = create_embedder_from_config(
            &cfg.embedding.provider,
            cfg.embedding.base_url.as_deref(),
            &cfg.embedding.model,
            cfg.embedding.dimensions,
        );
        let mut agent = Self::new(&cfg.agent, cfg.memory.clone(), llm, embedder, ui);
        agent.register_tools(builtin_tools(&cfg.tools)?).await?;
        Ok(agent)
    }

    pub async fn register_tools(&mut self, tools: Vec<AgentTool>) -> Result<(), AgentError> {
        self.procedural.register(tools).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn task_manager(&self) -> &TaskManager {
        &self.task_manager
    }

    pub fn procedural_memory(&self) -> &ProceduralMemory {
        &self.procedural
    }

    pub fn episodic_memory(&self) -> &EpisodicMemory {
        &self.episodic
    }

    pub fn semantic_memory(&self) -> &SemanticMemory {
        &self.semantic
    }

    pub fn has_saved_state(&self) -> bool {
        AgentData::exists(&self.dir)
    }

    /// 启动准备：已有保存的数据时询问是否加载（fresh 时跳过），然后问候
    ///
    /// 数据目录被规范化为绝对路径，agent_data.json 里记录的索引目录因此不依赖启动时的工作目录
    pub async fn prepare(&mut self, fresh: bool) -> Result<(), AgentError> {
        std::fs::create_dir_all(&self.dir)?;
        self.dir = std::fs::canonicalize(&self.dir)?;
        if !fresh && self.has_saved_state() {
            let load = self
                .ui
                .ask_yes_no(
                    "Agent data already exists. Do you want to load the data?\n\
                     If you choose 'Yes', the data will be loaded.\n\
                     If you choose 'No', the data will be overwritten.",
                )
                .await;
            if load {
                self.load().await?;
            } else {
                self.ui.notify("INFO", "Agent data will be overwritten.", Severity::Info);
            }
        }
        self.ui.notify(
            "START",
            &format!("Hello, I am {}. {}. My goal is {}.", self.name, self.role, self.goal),
            Severity::Info,
        );
        Ok(())
    }

    pub async fn run(&mut self) -> Result<(), AgentError> {
        {
            let _progress = self.ui.progress("Generate Task Plan...");
            self.task_manager
                .generate_plan(self.llm.as_ref(), &self.name, &self.role, &self.goal)
                .await?;
        }
        self.ui.notify(
            "ALL TASKS",
            &self.task_manager.incomplete_tasks_string(),
            Severity::Highlight,
        );

        loop {
            let Some(task) = self.task_manager.current().cloned() else {
                self.ui.notify(
                    "FINISH",
                    &format!("All tasks are completed. {} will end the operation.", self.name),
                    Severity::Error,
                );
                let (prompt_tokens, completion_tokens, total_tokens) = self.llm.token_usage();
                tracing::info!(prompt_tokens, completion_tokens, total_tokens, "all tasks completed");
                return Ok(());
            };
            self.ui.notify("CURRENT TASK", &task.to_string(), Severity::Highlight);

            let decision = self.reason(&task).await?;
            self.notify_decision(&decision);

            let Decision { thoughts, action, .. } = decision;
            let result = self.act(&task, &action).await?;

            let episode = {
                let _progress = self.ui.progress("Memorize episode...");
                self.episodic
                    .summarize_and_record(Episode::new(thoughts, action, result.clone()))
                    .await?
            };
            self.ui.notify("MEMORIZE NEW EPISODE", &episode.summary, Severity::Highlight);

            let entities = {
                let _progress = self.ui.progress("Extract knowledge...");
                self.semantic.extract_and_record(&result).await?
            };
            self.ui.notify("MEMORIZE NEW KNOWLEDGE", &render_entities(&entities), Severity::Highlight);
        }
    }

    async fn reason(&self, task: &Task) -> Result<Decision, AgentError> {
        let query = task.to_string();
        let (related_episodes, related_knowledge) = {
            let _progress = self.ui.progress("Retrieve memory...");
            let episodes = self.episodic.related(&query, self.retrieval.related_episodes).await?;
            let knowledge = self.semantic.related(&query, self.retrieval.related_knowledge).await?;
            (episodes, knowledge)
        };
        if !related_episodes.is_empty() {
            let summaries: Vec<&str> = related_episodes.iter().map(|e| e.summary.as_str()).collect();
            self.ui.notify("TASK RELATED EPISODE", &summaries.join("\n"), Severity::Info);
        }
        if !related_knowledge.is_empty() {
            self.ui.notify("TASK RELATED KNOWLEDGE", &render_entities(&related_knowledge), Severity::Info);
        }

        let tool_info = self.tool_info_for(&query).await?;
        let recent_episodes = self.episodic.recent(self.retrieval.recent_episodes);

        let _progress = self.ui.progress("Thinking...");
        self.planner
            .reason(&ReasonContext {
                name: &self.name,
                role: &self.role,
                goal: &self.goal,
                task,
                related_episodes: &related_episodes,
                related_knowledge: &related_knowledge,
                tool_info: &tool_info,
                recent_episodes: &recent_episodes,
            })
            .await
    }

    /// 工具目录过大时只带最相关的前 N 个
    async fn tool_info_for(&self, query: &str) -> Result<String, AgentError> {
        let limit = self.retrieval.relevant_tools;
        if limit == 0 || self.procedural.list_all().len() <= limit {
            return Ok(self.procedural.tool_info());
        }
        let ranked = self.procedural.rank_relevant(query, limit).await?;
        Ok(ranked.iter().map(|t| t.tool_info() + "\n").collect())
    }

    fn notify_decision(&self, decision: &Decision) {
        if let Some(observation) = decision.observation.as_deref().filter(|o| !o.is_empty()) {
            self.ui.notify("OBSERVATION", observation, Severity::Info);
        }
        for (title, content) in decision.thoughts.fields() {
            if !content.is_empty() {
                self.ui.notify(title, content, Severity::Info);
            }
        }
        let action = serde_json::to_string(&decision.action).unwrap_or_default();
        self.ui.notify("NEXT ACTION", &action, Severity::Info);
    }

    /// 执行动作，返回动作结果文本
    async fn act(&mut self, task: &Task, action: &Action) -> Result<String, AgentError> {
        if action.tool_name == TASK_COMPLETE {
            let result = action.arg_text("result").unwrap_or_else(|| {
                tracing::warn!(task = task.id, "task_complete without a result argument");
                String::new()
            });
            self.ui.notify(
                "COMPLETE TASK",
                &format!("TASK:{task}\nRESULT:{result}"),
                Severity::Highlight,
            );
            self.task_manager.complete(task.id, result.clone())?;
            {
                let _progress = self.ui.progress("Save agent data...");
                self.save()?;
            }
            return Ok(result);
        }

        let tool = self.procedural.lookup_by_name(&action.tool_name)?.clone();
        if tool.user_permission_required() {
            let args = serde_json::to_string(&action.args).unwrap_or_default();
            let approved = self
                .ui
                .ask_yes_no(&format!("Run tool '{}' with args {}? Do you want to continue?", tool.name(), args))
                .await;
            if !approved {
                tracing::info!(tool = tool.name(), "operator denied tool run");
                self.ui.notify("USER INPUT", USER_DENIED, Severity::Info);
                return Ok(USER_DENIED.to_string());
            }
        }

        let result = {
            let _progress = self.ui.progress(&format!("Running {}...", tool.name()));
            tool.run(&action.args).await?
        };
        self.ui.notify("ACTION RESULT", &result, Severity::Info);
        Ok(result)
    }

    /// 写两类记忆索引与 agent_data.json
    pub fn save(&self) -> Result<(), AgentError> {
        let data = AgentData::new(&self.dir, &self.name, &self.role);
        self.episodic.save(&data.episodic_memory)?;
        self.semantic.save(&data.semantic_memory)?;
        data.save(&self.dir)?;
        tracing::info!(dir = %self.dir.display(), "agent data saved");
        Ok(())
    }

    /// 恢复名字、角色与两类记忆；任一记忆损坏或与当前嵌入模型不符即报错
    pub async fn load(&mut self) -> Result<(), AgentError> {
        let data = match AgentData::load(&self.dir) {
            Ok(data) => data,
            Err(e) => {
                self.ui.notify("ERROR", "Agent data does not exist or is corrupted.", Severity::Error);
                return Err(e);
            }
        };
        self.name = data.name;
        self.role = data.role;

        if let Err(e) = self.semantic.load(&data.semantic_memory).await {
            self.ui.notify("ERROR", &load_failure("Semantic", &e), Severity::Error);
            return Err(e);
        }
        self.ui.notify("INFO", "Semantic memory data is loaded.", Severity::Success);

        if let Err(e) = self.episodic.load(&data.episodic_memory).await {
            self.ui.notify("ERROR", &load_failure("Episodic", &e), Severity::Error);
            return Err(e);
        }
        self.ui.notify("INFO", "Episodic memory data is loaded.", Severity::Success);
        tracing::info!(
            episodes = self.episodic.len(),
            facts = self.semantic.len(),
            "agent data loaded"
        );
        Ok(())
    }
}

fn load_failure(kind: &str, err: &AgentError) -> String {
    match err {
        AgentError::Embedding(_) => {
            format!("{kind} memory was built with a different embedding model: {err}")
        }
        _ => format!("{kind} memory data is corrupted."),
    }
}

fn render_entities(entities: &EntityMap) -> String {
    serde_json::to_string(entities).unwrap_or_default()
}
