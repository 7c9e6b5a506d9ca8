//! Prompt templates for summary generation.

/// System prompt for all summary requests.
pub const SYSTEM_PROMPT: &str = "你是一个专业的量化研究助手。";

/// Title for the shared conversation session.
pub const SESSION_TITLE: &str = "帖子摘要生成";

/// Prompt for a full structured summary of one post.
pub fn full_summary_prompt(title: &str, content: &str) -> String {
    let body = if content.is_empty() { "(无内容)" } else { content };

    format!(
        r#"请分析以下量化研究帖子，生成结构化摘要。

**帖子标题**：{title}

**帖子内容**：
{body}

请以JSON格式返回摘要，包含以下字段：
- main_topic: 主要主题（1句话，不超过50字）
- main_logic: 主要逻辑（2-3句话，不超过150字）
- factors: 因子列表（数组，每个因子包含name和description）
- key_concepts: 关键概念（数组，包括术语、方法、数据等）
- summary: 完整摘要（3-5句话，不超过300字）

**要求**：
1. 准确理解帖子的核心内容
2. 提取所有因子名称和描述
3. 识别关键概念（即使是非标准术语也要提取）
4. 用简洁的中文表达

**重要：**
- 必须**只**返回JSON格式，不要有任何其他说明文字
- 即使内容为空或无法分析，也必须返回有效的JSON结构（字段值可以为空字符串或空数组）
- 不要返回"抱歉"之类的说明，直接返回JSON

格式示例：
```json
{{"main_topic":"...","main_logic":"...","factors":[...],"key_concepts":[...],"summary":"..."}}
```"#
    )
}

/// Prompt for an incremental supplement covering only new content.
pub fn supplement_prompt(title: &str, diff: &str) -> String {
    format!(
        r#"以下是帖子「{title}」的**新增内容**（相对上次摘要时的版本）。请只针对新增内容生成补充摘要，不要重复旧内容。

**新增内容**：
{diff}

请以JSON格式返回补充，包含以下字段：
- factors: 新增内容中出现的因子（数组，每个因子包含name和description，没有则为空数组）
- key_concepts: 新增内容中的关键概念（数组，没有则为空数组）
- summary: 对新增内容的补充说明（1-3句话，没有实质内容则为空字符串）

**重要：**
- 必须**只**返回JSON格式，不要有任何其他说明文字
- 即使无法分析，也必须返回有效的JSON结构

格式示例：
```json
{{"factors":[...],"key_concepts":[...],"summary":"..."}}
```"#
    )
}
