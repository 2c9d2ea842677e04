//! Mneme - 自主任务智能体
//!
//! 入口：解析命令行、加载配置、初始化日志，构建 Agent 并运行到计划耗尽；任何错误打印后以非零码退出。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mneme::agent::Agent;
use mneme::config::load_config;
use mneme::observability;
use mneme::ui::ConsoleInterface;

#[derive(Parser, Debug)]
#[command(name = "mneme", version, about = "Autonomous task agent with episodic, semantic and procedural memory")]
struct Cli {
    /// 额外的 TOML 配置文件（覆盖 config/default.toml）
    #[arg(long, env = "MNEME_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    role: Option<String>,
    #[arg(long)]
    goal: Option<String>,
    /// 记忆与 agent_data.json 的存放目录
    #[arg(long)]
    dir: Option<PathBuf>,
    /// 忽略已保存的数据，不询问
    #[arg(long)]
    fresh: bool,
    /// 自动同意所有工具执行确认
    #[arg(long, short = 'y')]
    yes: bool,
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::init(if cli.verbose { "debug" } else { "warn" });

    let mut cfg = load_config(cli.config.clone()).context("Failed to load configuration")?;
    if let Some(name) = cli.name {
        cfg.agent.name = name;
    }
    if let Some(role) = cli.role {
        cfg.agent.role = role;
    }
    if let Some(goal) = cli.goal {
        cfg.agent.goal = goal;
    }
    if let Some(dir) = cli.dir {
        cfg.agent.dir = dir;
    }

    let ui = Arc::new(ConsoleInterface::new().with_auto_approve(cli.yes));
    let mut agent = Agent::from_config(&cfg, ui)
        .await
        .context("Failed to create agent")?;
    agent
        .prepare(cli.fresh)
        .await
        .context("Failed to restore agent data")?;
    agent.run().await.context("Agent run failed")?;
    Ok(())
}
