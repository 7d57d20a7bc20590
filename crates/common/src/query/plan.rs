//! Question classification
//!
//! The LLM is asked for a small JSON object. Its answer is untrusted input:
//! fences are stripped, the payload is checked against [`RawPlan`], and
//! anything that does not fit yields [`RetrievalPlan::default`].

use crate::models::Category;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Recency requested by the question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeScope {
    Today,
    #[default]
    Any,
}

impl TimeScope {
    pub fn parse(label: &str) -> Option<TimeScope> {
        match label.trim().to_lowercase().as_str() {
            "today" => Some(TimeScope::Today),
            "any" => Some(TimeScope::Any),
            _ => None,
        }
    }
}

/// Classification result for one question.
///
/// `time_scope` and `use_fallback` are recorded but not acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RetrievalPlan {
    pub category: Category,
    pub time_scope: TimeScope,
    pub use_fallback: bool,
}

/// Wire shape requested from the model. Keys outside it are ignored.
#[derive(Debug, Deserialize)]
struct RawPlan {
    category: String,
    #[serde(default)]
    time: Option<String>,
    #[serde(default)]
    use_web_fallback: Option<bool>,
}

pub fn classification_prompt(question: &str, today: &str) -> String {
    format!(
        "Classify the news question below.\n\
        Respond with a single JSON object and nothing else, in exactly this shape:\n\
        {{\"category\": \"<category>\", \"time\": \"today\" or \"any\", \"use_web_fallback\": true or false}}\n\n\
        Allowed categories: {categories}.\n\
        Use \"general\" when no other category fits.\n\
        Use \"today\" only when the question is about today's news.\n\
        Set \"use_web_fallback\" to true only when stored news articles are unlikely to answer it.\n\n\
        Today's date: {today}\n\
        Question: {question}",
        categories = Category::prompt_list(),
        today = today,
        question = question,
    )
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)```(?:json)?").expect("fence pattern is valid"))
}

/// Remove markdown code fence markers, keeping the content between them
pub fn strip_code_fences(raw: &str) -> String {
    fence_pattern().replace_all(raw, "").trim().to_string()
}

/// Parse and validate a model answer. `None` when a known key is missing,
/// mistyped, or outside its allowed values.
pub fn parse_plan(raw: &str) -> Option<RetrievalPlan> {
    let cleaned = strip_code_fences(raw);
    let parsed: RawPlan = serde_json::from_str(&cleaned).ok()?;

    let category = Category::parse(&parsed.category)?;
    let time_scope = match parsed.time {
        Some(label) => TimeScope::parse(&label)?,
        None => TimeScope::Any,
    };

    Some(RetrievalPlan {
        category,
        time_scope,
        use_fallback: parsed.use_web_fallback.unwrap_or(false),
    })
}
