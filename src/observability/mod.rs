//! 日志初始化：tracing-subscriber（EnvFilter + fmt），输出到 stderr，避免与交互输出混在一起

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// 默认级别为 default_level，可由 RUST_LOG 覆盖；重复初始化时忽略
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}
