//! 提示词渲染
//!
//! 每类调用（任务规划、推理决策、情节摘要、实体抽取、JSON 修复）一个渲染函数，输出发往 LlmClient 的消息列表。

use crate::llm::Message;

const RESPONSE_RULE: &str = "[RULE]\n\
Respond with a single JSON value that follows the JSON RESPONSE FORMAT below.\n\
Do not add explanations, apologies or markdown outside the JSON.\n\
The response must be parseable by a strict JSON parser.";

/// 任务规划：要求以 Tab 分隔的任务列表返回
pub fn plan_messages(name: &str, role: &str, goal: &str) -> Vec<Message> {
    let system = format!(
        "You are {name}, {role}\n\
         Break the GOAL below into tasks for an autonomous execution agent.\n\n\
         [GOAL]\n{goal}\n\n\
         [YOUR MISSION]\n\
         - Work backward from the GOAL and order the tasks so each builds on the previous ones.\n\
         - Create as many tasks as needed, without overlap.\n\n\
         [RESPONSE FORMAT]\n\
         Return the tasks as one list.\n\
         - Enclose each task in double quotation marks.\n\
         - Separate tasks with a TAB character.\n\
         - Use [] only at the beginning and end.\n\n\
         [\"Task 1\"\t\"Task 2\"\t...]\n\n\
         [RESPONSE]"
    );
    vec![Message::system(system)]
}

/// 推理决策所需的上下文，均已渲染为文本
#[derive(Debug, Clone, Default)]
pub struct ReasonPrompt<'a> {
    pub name: &'a str,
    pub role: &'a str,
    pub goal: &'a str,
    pub task: &'a str,
    pub related_knowledge: &'a str,
    pub related_past_episodes: &'a str,
    pub tool_info: &'a str,
    /// 最近情节（为空时不附加该段）
    pub recent_episodes: &'a str,
    pub now: &'a str,
    pub schema: &'a str,
}

pub fn reason_messages(p: &ReasonPrompt<'_>) -> Vec<Message> {
    let base = format!(
        "You are {name}, {role}\n\
         Make every decision on your own without asking the user for help.\n\
         Prefer simple strategies with no legal complications.\n\n\
         [GOAL]\n{goal}\n\n\
         [PERFORMANCE EVALUATION]\n\
         1. Review your actions and keep improving them.\n\
         2. Criticize your big-picture behavior constructively.\n\
         3. Reflect on past decisions to refine your approach.\n\n\
         [RELATED KNOWLEDGE]\nThis reminds you of related knowledge:\n{knowledge}\n\n\
         [RELATED PAST EPISODES]\nThis reminds you of related past events:\n{episodes}\n\n\
         [YOUR TASK]\nYou are given the following task:\n{task}\n\n\
         [TOOLS]\n\
         You can use ONLY ONE TOOL at a time.\n\
         tool name: \"tool description\", arg1: <arg1>, arg2: <arg2>\n\
         {tools}\
         task_complete: \"Use this when the task is done; put your answer to the task in args.\", result: <Answer to the assigned task>",
        name = p.name,
        role = p.role,
        goal = p.goal,
        knowledge = p.related_knowledge,
        episodes = p.related_past_episodes,
        task = p.task,
        tools = p.tool_info,
    );

    let mut messages = vec![Message::system(base)];
    if !p.recent_episodes.is_empty() {
        messages.push(Message::system(format!(
            "[RECENT EPISODES]\nThis reminds you of recent events:\nThe current time and date is {}\n{}",
            p.now, p.recent_episodes
        )));
    }
    messages.push(Message::system(format!(
        "{RESPONSE_RULE}\n\n[JSON RESPONSE FORMAT]\n{}\n\n\
         Determine which next command to use, and respond using the format specified above:",
        p.schema
    )));
    messages
}

/// 情节摘要
pub fn summarize_messages(thoughts: &str, action: &str, result: &str) -> Vec<Message> {
    vec![Message::system(format!(
        "[THOUGHTS]\n{thoughts}\n\n\
         [ACTION]\n{action}\n\n\
         [RESULT OF ACTION]\n{result}\n\n\
         [INSTRUCTION]\n\
         Using the THOUGHTS, ACTION and RESULT OF ACTION above, summarize the event in a few sentences.\n\n\
         [SUMMARY]"
    ))]
}

/// 实体抽取：只抽取专有名词，返回 实体名 -> 描述 的 JSON 对象
pub fn extract_entity_messages(text: &str, schema: &str) -> Vec<Message> {
    vec![
        Message::system(format!(
            "You read an input text and extract entities from it.\n\
             Extract ONLY proper nouns (names of people, places, organizations, products) and return them as a JSON object \
             mapping each entity to a one-sentence description grounded in the text.\n\n\
             [EXAMPLE]\n\
             INPUT TEXT:\n Rust was started by Graydon Hoare at Mozilla.\n\
             RESPONSE:\n {{\"Rust\": \"a programming language started by Graydon Hoare at Mozilla\", \
             \"Graydon Hoare\": \"the engineer who started Rust\", \
             \"Mozilla\": \"the organization where Rust was started\"}}\n\n\
             [INPUT TEXT] (for reference only):\n{text}"
        )),
        Message::system(format!(
            "{RESPONSE_RULE}\n\n[JSON RESPONSE FORMAT]\n{schema}\n\n[RESPONSE]"
        )),
    ]
}

/// JSON 修复：让生成服务按 schema 修正文本
pub fn fix_json_messages(text: &str, schema: &str) -> Vec<Message> {
    vec![
        Message::system(
            "You fix malformed JSON. Return only the corrected JSON so that it parses and fully complies with the schema. \
             Omit objects or fields that the schema defines but the input does not contain; never invent content."
                .to_string(),
        ),
        Message::user(format!("[SCHEMA]\n{schema}\n\n[JSON]\n{text}")),
    ]
}
