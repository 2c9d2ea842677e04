//! 脚本化交互（用于测试）：按队列回答确认，记录全部通知

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ui::{HumanInterface, Severity};

#[derive(Debug)]
pub struct ScriptedInterface {
    answers: Mutex<VecDeque<bool>>,
    default_answer: bool,
    prompts: Mutex<Vec<String>>,
    notifications: Mutex<Vec<(String, String, Severity)>>,
}

impl ScriptedInterface {
    /// 队列耗尽后一律回答 default_answer
    pub fn new(default_answer: bool) -> Self {
        Self {
            answers: Mutex::new(VecDeque::new()),
            default_answer,
            prompts: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        }
    }

    pub fn with_answers(self, answers: impl IntoIterator<Item = bool>) -> Self {
        if let Ok(mut queue) = self.answers.lock() {
            queue.extend(answers);
        }
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn notifications(&self) -> Vec<(String, String, Severity)> {
        self.notifications.lock().map(|n| n.clone()).unwrap_or_default()
    }

    /// 指定标题的通知内容（按发生顺序）
    pub fn messages_titled(&self, title: &str) -> Vec<String> {
        self.notifications()
            .into_iter()
            .filter(|(t, _, _)| t == title)
            .map(|(_, m, _)| m)
            .collect()
    }
}

#[async_trait]
impl HumanInterface for ScriptedInterface {
    async fn ask_yes_no(&self, prompt: &str) -> bool {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(self.default_answer)
    }

    fn notify(&self, title: &str, message: &str, severity: Severity) {
        if let Ok(mut n) = self.notifications.lock() {
            n.push((title.to_string(), message.to_string(), severity));
        }
    }
}
