//! 终端交互：crossterm 着色输出、stdin 确认、旋转进度提示

use std::io::{self, Write};
use std::time::Duration;

use async_trait::async_trait;
use crossterm::style::{Color, Stylize};
use tokio_util::sync::CancellationToken;

use crate::ui::{HumanInterface, ProgressGuard, Severity};

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

#[derive(Debug, Clone, Default)]
pub struct ConsoleInterface {
    auto_approve: bool,
}

impl ConsoleInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有确认自动通过（--yes）
    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }
}

fn color_of(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Yellow,
        Severity::Highlight => Color::Blue,
        Severity::Success => Color::Green,
        Severity::Error => Color::Red,
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

#[async_trait]
impl HumanInterface for ConsoleInterface {
    async fn ask_yes_no(&self, prompt: &str) -> bool {
        if self.auto_approve {
            println!("{} {} {}", prompt, "(y/n)".bold(), "y (auto)".dark_grey());
            return true;
        }
        loop {
            print!("{} {} ", prompt, "(y/n)".bold());
            let _ = io::stdout().flush();
            let line = tokio::task::spawn_blocking(|| {
                let mut line = String::new();
                io::stdin().read_line(&mut line).map(|n| (n, line))
            })
            .await;
            match line {
                Ok(Ok((0, _))) | Ok(Err(_)) | Err(_) => {
                    tracing::warn!("no operator input available, treating as 'no'");
                    return false;
                }
                Ok(Ok((_, line))) => match parse_answer(&line) {
                    Some(answer) => return answer,
                    None => println!("{}", "Please answer y or n.".dark_grey()),
                },
            }
        }
    }

    fn notify(&self, title: &str, message: &str, severity: Severity) {
        println!("{}: {}", title.bold().with(color_of(severity)), message);
    }

    fn progress(&self, message: &str) -> ProgressGuard {
        if tokio::runtime::Handle::try_current().is_err() {
            return ProgressGuard::noop();
        }
        let token = CancellationToken::new();
        let stop = token.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(100));
            let mut frame = 0usize;
            loop {
                tokio::select! {
                    _ = stop.cancelled() => break,
                    _ = interval.tick() => {
                        eprint!("\r{} {}", SPINNER[frame % SPINNER.len()].cyan(), message);
                        let _ = io::stderr().flush();
                        frame += 1;
                    }
                }
            }
            eprint!("\r{}\r", " ".repeat(message.chars().count() + 2));
            let _ = io::stderr().flush();
        });
        ProgressGuard::new(token.drop_guard())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("Y\n"), Some(true));
        assert_eq!(parse_answer(" no "), Some(false));
        assert_eq!(parse_answer("maybe"), None);
    }

    #[tokio::test]
    async fn test_auto_approve() {
        let ui = ConsoleInterface::new().with_auto_approve(true);
        assert!(ui.ask_yes_no("Run tool?").await);
    }

    #[tokio::test]
    async fn test_progress_inside_runtime() {
        let ui = ConsoleInterface::new();
        let guard = ui.progress("Thinking...");
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
    }

    #[test]
    fn test_progress_without_runtime_is_noop() {
        let _guard = ConsoleInterface::new().progress("no runtime");
    }
}
