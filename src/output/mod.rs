//! 结构化输出：JSON 解析修复管线、分隔符列表解析、决策与实体 schema

pub mod fixer;
pub mod json_parser;
pub mod list_parser;
pub mod repair;
pub mod schema;

pub use fixer::{JsonFixer, LlmJsonFixer};
pub use json_parser::JsonOutputParser;
pub use list_parser::{parse_list, TASK_SEPARATOR};
pub use repair::{Attempt, CorrectSyntax, ExtractObject, RepairStrategy, StripTabs};
pub use schema::{schema_json, Action, Decision, EntityMap, Thoughts};
