//! web_fetch 工具：抓取白名单域名下的 URL，返回可读文本
//!
//! GET 请求带超时与 User-Agent；HTML 响应经 html2text 提取正文；超过 max_result_chars 截断并追加 `...[truncated]`。

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use serde_json::{Map, Value};

use crate::config::WebFetchSection;
use crate::core::AgentError;
use crate::tools::descriptor::{AgentTool, ToolHandler};

pub const WEB_FETCH_NAME: &str = "web_fetch";

const DESCRIPTION: &str = "Fetch the readable text of a web page. Only URLs on the allowlisted domains \
(Wikipedia, GitHub, StackOverflow, docs.rs, MDN, arxiv, ...) can be fetched.";

const USER_AGENT: &str = concat!("mneme/", env!("CARGO_PKG_VERSION"));

pub struct WebFetchTool {
    client: Client,
    allowed_domains: HashSet<String>,
    max_result_chars: usize,
}

impl WebFetchTool {
    /// 构建 HTTP 客户端；超时为 0 或客户端构建失败时报 `Config`
    pub fn new(
        allowed_domains: Vec<String>,
        timeout_secs: u64,
        max_result_chars: usize,
    ) -> Result<Self, AgentError> {
        if timeout_secs == 0 {
            return Err(AgentError::Config(
                "tools.web_fetch.timeout_secs must be greater than 0".to_string(),
            ));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,text/plain;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en;q=0.9,*;q=0.5"));
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| AgentError::Config(format!("web_fetch HTTP client: {e}")))?;
        Ok(Self {
            client,
            allowed_domains: allowed_domains.into_iter().map(|d| d.to_lowercase()).collect(),
            max_result_chars,
        })
    }

    pub fn from_config(cfg: &WebFetchSection) -> Result<Self, AgentError> {
        Self::new(cfg.allowed_domains.clone(), cfg.timeout_secs, cfg.max_result_chars)
    }

    /// 包装为可注册的 AgentTool，确认策略取自配置
    pub fn into_agent_tool(self, user_permission_required: bool) -> Result<AgentTool, AgentError> {
        Ok(AgentTool::new(WEB_FETCH_NAME, DESCRIPTION, &["url"], self)?
            .with_permission_required(user_permission_required))
    }

    fn check_allowed(&self, url: &str) -> Result<(), String> {
        let domain = extract_domain(url).ok_or_else(|| format!("Invalid or missing URL: {url:?}"))?;
        if self.allowed_domains.contains(&domain) {
            Ok(())
        } else {
            Err(format!("Domain not in allowlist: {domain}"))
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, String> {
        self.check_allowed(url)?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {e}"))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body = resp.text().await.map_err(|e| format!("Read body: {e}"))?;
        let body = body.trim_start_matches('\u{FEFF}');

        let text = if looks_like_html(body) {
            html_to_text(body)
        } else {
            body.to_string()
        };
        Ok(truncate(&text, self.max_result_chars))
    }
}

#[async_trait]
impl ToolHandler for WebFetchTool {
    async fn invoke(&self, args: &Map<String, Value>) -> Result<String, String> {
        let url = args.get("url").and_then(Value::as_str).unwrap_or("").trim();
        if url.is_empty() {
            return Err("Missing url".to_string());
        }
        tracing::info!(url = %url, "web_fetch");
        self.fetch(url).await
    }
}

/// 取 URL 的 host（小写，去掉端口）；仅接受 http/https
fn extract_domain(url: &str) -> Option<String> {
    let url = url.trim();
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))?;
    let host = rest.split(|c: char| matches!(c, '/' | '?' | '#')).next()?;
    let host = host.rsplit('@').next()?.split(':').next()?;
    (!host.is_empty()).then(|| host.to_lowercase())
}

fn looks_like_html(s: &str) -> bool {
    let s = s.trim_start();
    let head: String = s.chars().take(512).collect::<String>().to_lowercase();
    head.starts_with("<!doctype") || head.starts_with("<html") || head.contains("<head") || head.contains("<body")
}

fn html_to_text(html: &str) -> String {
    match html2text::from_read(html.as_bytes(), 120) {
        Ok(text) if !text.trim().is_empty() => text,
        _ => strip_tags(html),
    }
}

/// html2text 失败时的回退：去标签、压缩空白
fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        text.chars().take(max_chars).collect::<String>() + "\n...[truncated]"
    } else {
        text.to_string()
    }
}
