//! 推理一步：渲染上下文 -> 生成服务 -> 修复管线 -> `Decision`
//!
//! 生成调用失败或输出修复后仍不可用都直接返回错误，本层不重试。

use std::sync::Arc;

use crate::core::{AgentError, Task};
use crate::llm::prompts::{self, ReasonPrompt};
use crate::llm::LlmClient;
use crate::memory::Episode;
use crate::output::{schema_json, Decision, EntityMap, JsonOutputParser};

/// 一次推理所需的已检索上下文
pub struct ReasonContext<'a> {
    pub name: &'a str,
    pub role: &'a str,
    pub goal: &'a str,
    pub task: &'a Task,
    pub related_episodes: &'a [Episode],
    pub related_knowledge: &'a EntityMap,
    /// 工具目录的提示词行
    pub tool_info: &'a str,
    pub recent_episodes: &'a [Episode],
}

pub struct Planner {
    llm: Arc<dyn LlmClient>,
    parser: Arc<JsonOutputParser>,
    decision_schema: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, parser: Arc<JsonOutputParser>) -> Self {
        Self {
            llm,
            parser,
            decision_schema: schema_json::<Decision>(),
        }
    }

    pub fn decision_schema(&self) -> &str {
        &self.decision_schema
    }

    pub async fn reason(&self, ctx: &ReasonContext<'_>) -> Result<Decision, AgentError> {
        let task = ctx.task.to_string();
        let knowledge = render_knowledge(ctx.related_knowledge);
        let past = render_episodes(ctx.related_episodes);
        let recent = render_episodes(ctx.recent_episodes);
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

        let messages = prompts::reason_messages(&ReasonPrompt {
            name: ctx.name,
            role: ctx.role,
            goal: ctx.goal,
            task: &task,
            related_knowledge: &knowledge,
            related_past_episodes: &past,
            tool_info: ctx.tool_info,
            recent_episodes: &recent,
            now: &now,
            schema: &self.decision_schema,
        });

        let raw = self
            .llm
            .complete(&messages)
            .await
            .map_err(|e| AgentError::Llm(format!("reason: {e}")))?;
        let decision: Decision = self.parser.parse_and_validate(&raw).await?;
        tracing::debug!(task = %task, tool = %decision.action.tool_name, "decision parsed");
        Ok(decision)
    }
}

/// `entity: description`，每行一条
pub fn render_knowledge(knowledge: &EntityMap) -> String {
    knowledge
        .iter()
        .map(|(entity, description)| format!("{entity}: {description}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 每行一个情节的 JSON
pub fn render_episodes(episodes: &[Episode]) -> String {
    episodes
        .iter()
        .map(Episode::render)
        .collect::<Vec<_>>()
        .join("\n")
}
