//! 人机交互边界：确认、通知、进度提示
//!
//! 编排器只依赖 `HumanInterface`；`ConsoleInterface` 为终端实现，`ScriptedInterface` 供测试脚本化应答。

pub mod console;
pub mod scripted;

use async_trait::async_trait;
use tokio_util::sync::DropGuard;

pub use console::ConsoleInterface;
pub use scripted::ScriptedInterface;

/// 通知级别（决定标题颜色）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Highlight,
    Success,
    Error,
}

#[async_trait]
pub trait HumanInterface: Send + Sync {
    /// 是/否确认；无法读取输入时视为否
    async fn ask_yes_no(&self, prompt: &str) -> bool;

    fn notify(&self, title: &str, message: &str, severity: Severity);

    /// 阻塞调用期间的装饰性进度提示；返回值被 drop 时停止
    fn progress(&self, _message: &str) -> ProgressGuard {
        ProgressGuard::noop()
    }
}

/// 进度提示的作用域守卫
#[must_use = "the progress indicator stops when the guard is dropped"]
pub struct ProgressGuard {
    _guard: Option<DropGuard>,
}

impl ProgressGuard {
    pub fn new(guard: DropGuard) -> Self {
        Self {
            _guard: Some(guard),
        }
    }

    pub fn noop() -> Self {
        Self { _guard: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_progress_guard_cancels_on_drop() {
        let token = CancellationToken::new();
        let guard = ProgressGuard::new(token.clone().drop_guard());
        assert!(!token.is_cancelled());
        drop(guard);
        assert!(token.is_cancelled());
    }
}
