//! 任务管理：有序任务列表 + 单一当前任务游标
//!
//! 计划每次运行生成一次、不重排；任务完成单向（pending -> done），游标只增不减。
//! 游标越过最后一个任务后 `current()` 返回 None，即计划耗尽。

use serde::{Deserialize, Serialize};

use crate::core::AgentError;
use crate::llm::{prompts, LlmClient};
use crate::output::{parse_list, TASK_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u32,
    pub description: String,
    pub is_done: bool,
    pub result: String,
}

impl Task {
    pub fn new(id: u32, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
            is_done: false,
            result: String::new(),
        }
    }
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.id, self.description)
    }
}

#[derive(Debug, Clone)]
pub struct TaskManager {
    tasks: Vec<Task>,
    current_task_id: u32,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            current_task_id: 1,
        }
    }

    /// 以给定描述依次追加任务，id 从当前最大 id + 1 起连续分配
    pub fn add_tasks<I, S>(&mut self, descriptions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut next_id = self.tasks.last().map(|t| t.id + 1).unwrap_or(1);
        for description in descriptions {
            self.tasks.push(Task::new(next_id, description));
            next_id += 1;
        }
    }

    /// 一次生成服务调用得到 Tab 分隔的任务列表
    pub async fn generate_plan(
        &mut self,
        llm: &dyn LlmClient,
        name: &str,
        role: &str,
        goal: &str,
    ) -> Result<(), AgentError> {
        let raw = llm
            .complete(&prompts::plan_messages(name, role, goal))
            .await
            .map_err(|e| AgentError::Llm(format!("generate task plan: {e}")))?;
        let descriptions = parse_list(&raw, TASK_SEPARATOR)?;
        self.add_tasks(descriptions);
        tracing::info!(tasks = self.tasks.len(), "task plan generated");
        Ok(())
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn current_task_id(&self) -> u32 {
        self.current_task_id
    }

    pub fn get(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// 游标指向且未完成的任务；None 表示计划耗尽
    pub fn current(&self) -> Option<&Task> {
        self.get(self.current_task_id).filter(|t| !t.is_done)
    }

    /// 标记完成并把游标推进到 id + 1（不检查其存在性）
    pub fn complete(&mut self, id: u32, result: impl Into<String>) -> Result<(), AgentError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(AgentError::TaskNotFound(id))?;
        if task.is_done {
            tracing::warn!(id, "task already completed, keeping the first result");
        } else {
            task.is_done = true;
            task.result = result.into();
            tracing::info!(id, "task completed");
        }
        self.current_task_id = self.current_task_id.max(id + 1);
        Ok(())
    }

    pub fn incomplete_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.is_done).collect()
    }

    /// 每行一个 `id: description`
    pub fn incomplete_tasks_string(&self) -> String {
        self.incomplete_tasks()
            .iter()
            .map(|t| format!("{t}\n"))
            .collect()
    }
}
