//! 本地结构修复策略
//!
//! 每个策略接收当前文本，返回 `Attempt`：解析成功则带回值，否则带回（可能已部分修正的）文本交给下一策略。
//! 任何修正都必须经过一次真实的 serde_json 解析才算成功。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// 单个策略的结果
#[derive(Debug, Clone)]
pub struct Attempt {
    /// 传给下一个策略的文本
    pub text: String,
    pub value: Option<Value>,
}

impl Attempt {
    fn parsed(text: String, value: Value) -> Self {
        Self {
            text,
            value: Some(value),
        }
    }

    fn failed(text: String) -> Self {
        Self { text, value: None }
    }
}

/// 修复策略 trait：按顺序组合，可单独测试
pub trait RepairStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn attempt(&self, text: &str) -> Attempt;
}

fn try_parse(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(text)
}

/// 1. 去掉字面 Tab 后直接解析
pub struct StripTabs;

impl RepairStrategy for StripTabs {
    fn name(&self) -> &'static str {
        "strip_tabs"
    }

    fn attempt(&self, text: &str) -> Attempt {
        let text = text.replace('\t', "");
        match try_parse(&text) {
            Ok(v) => Attempt::parsed(text, v),
            Err(_) => Attempt::failed(text),
        }
    }
}

/// 2. 轻量语法修正：非法转义 -> 属性名补引号 -> 花括号配平，每步后都重新解析
pub struct CorrectSyntax;

impl RepairStrategy for CorrectSyntax {
    fn name(&self) -> &'static str {
        "correct_syntax"
    }

    fn attempt(&self, text: &str) -> Attempt {
        let mut text = text.to_string();
        let mut err = match try_parse(&text) {
            Ok(v) => return Attempt::parsed(text, v),
            Err(e) => e,
        };

        if is_invalid_escape(&err) {
            match fix_invalid_escapes(&text, err) {
                Ok((fixed, v)) => return Attempt::parsed(fixed, v),
                Err((fixed, e)) => {
                    text = fixed;
                    err = e;
                }
            }
        }

        if is_unquoted_key(&err) {
            let quoted = quote_property_names(&text);
            match try_parse(&quoted) {
                Ok(v) => return Attempt::parsed(quoted, v),
                Err(e) => {
                    tracing::debug!(error = %e, "quoting property names did not help");
                    text = quoted;
                }
            }
        }

        let balanced = balance_braces(&text);
        match try_parse(&balanced) {
            Ok(v) => Attempt::parsed(balanced, v),
            Err(_) => Attempt::failed(text),
        }
    }
}

/// 3. 去掉外层方括号，截取第一个 `{` 到最后一个 `}` 之间的内容
pub struct ExtractObject;

impl RepairStrategy for ExtractObject {
    fn name(&self) -> &'static str {
        "extract_object"
    }

    fn attempt(&self, text: &str) -> Attempt {
        let stripped = strip_wrapping_brackets(text);
        let Some(slice) = outermost_object(&stripped) else {
            return Attempt::failed(stripped);
        };
        let slice = slice.to_string();
        match try_parse(&slice) {
            Ok(v) => Attempt::parsed(slice, v),
            Err(_) => Attempt::failed(stripped),
        }
    }
}

/// 默认策略顺序
pub fn default_strategies() -> Vec<Box<dyn RepairStrategy>> {
    vec![
        Box::new(StripTabs),
        Box::new(CorrectSyntax),
        Box::new(ExtractObject),
    ]
}

fn is_invalid_escape(err: &serde_json::Error) -> bool {
    err.to_string().starts_with("invalid escape")
}

fn is_unquoted_key(err: &serde_json::Error) -> bool {
    err.to_string().starts_with("key must be a string")
}

/// 将 serde_json 报告的 (line, column) 换算成字节偏移
fn error_offset(text: &str, err: &serde_json::Error) -> usize {
    let line = err.line().max(1);
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + err.column()).min(text.len())
}

/// 删除报错位置之前最近的反斜杠，只要错误类别仍是非法转义就继续
///
/// 成功返回 (修正文本, 值)；失败返回 (已修正到的文本, 最后的错误)
pub fn fix_invalid_escapes(
    text: &str,
    mut err: serde_json::Error,
) -> Result<(String, Value), (String, serde_json::Error)> {
    let mut text = text.to_string();
    while is_invalid_escape(&err) {
        let offset = error_offset(&text, &err);
        let Some(pos) = text[..floor_char_boundary(&text, offset)].rfind('\\') else {
            break;
        };
        text.remove(pos);
        match try_parse(&text) {
            Ok(v) => return Ok((text, v)),
            Err(e) => err = e,
        }
    }
    Err((text, err))
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn property_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([\{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("static property-name regex")
    })
}

/// 将裸的 `identifier:` 用双引号包起来
pub fn quote_property_names(text: &str) -> String {
    property_name_regex()
        .replace_all(text, "$1\"$2\":")
        .into_owned()
}

/// 花括号配平：缺则在末尾补 `}`，多则逐个去掉末尾多余的 `}`（不会去到少于配平）
pub fn balance_braces(text: &str) -> String {
    let opens = text.matches('{').count();
    let mut closes = text.matches('}').count();
    let mut out = text.to_string();

    if opens > closes {
        out.push_str(&"}".repeat(opens - closes));
        return out;
    }

    while closes > opens {
        let trimmed_len = out.trim_end().len();
        if !out[..trimmed_len].ends_with('}') {
            break;
        }
        out.truncate(trimmed_len - 1);
        closes -= 1;
    }
    out
}

/// 去掉首尾包裹的 `[` `]`
pub fn strip_wrapping_brackets(text: &str) -> String {
    text.trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .to_string()
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
