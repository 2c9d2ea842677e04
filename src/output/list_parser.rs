//! 分隔符列表解析（任务规划输出）
//!
//! 形如 `["Task 1"\t"Task 2"]`：去掉外层方括号后按分隔符切分，去除每项两侧的空白、引号与逗号。

use crate::core::AgentError;

/// 任务规划使用的分隔符
pub const TASK_SEPARATOR: char = '\t';

/// 按分隔符切分；没有任何非空项时报 `AgentError::PlanGeneration`
pub fn parse_list(text: &str, separator: char) -> Result<Vec<String>, AgentError> {
    let inner = text
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']');

    let items: Vec<String> = inner
        .split(separator)
        .map(clean_item)
        .filter(|s| !s.is_empty())
        .collect();

    if items.is_empty() {
        return Err(AgentError::PlanGeneration(format!(
            "the response is not {:?}-separated: {:?}",
            separator, text
        )));
    }
    Ok(items)
}

fn clean_item(item: &str) -> String {
    item.trim()
        .trim_matches(',')
        .trim()
        .trim_matches('"')
        .trim()
        .to_string()
}
