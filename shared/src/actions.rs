//! Action blocks embedded in assistant replies
//!
//! The assistant marks structured operations inline:
//!
//! ```text
//! Here is your plan!
//! [ACTION:CREATE_WORKOUT_PLAN]{"name": "Fuerza 3 días", "sessions": []}[/ACTION]
//! ```
//!
//! Each block is parsed on its own, so one malformed payload never hides
//! its siblings.

use crate::errors::ActionError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

static ACTION_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\[ACTION:([A-Za-z_]+)\](.*?)\[/ACTION\]").expect("valid regex")
});

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*```[A-Za-z]*\s*(.*?)\s*```\s*$").expect("valid regex"));

/// Domain operation requested by the assistant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ActionTag {
    CreateWorkoutPlan,
    UpdateWorkoutPlan,
    CreateNutritionPlan,
    UpdateNutritionPlan,
    LogProgress,
    CompleteSession,
    CompleteMeal,
    Unknown(String),
}

impl ActionTag {
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "CREATE_WORKOUT_PLAN" => ActionTag::CreateWorkoutPlan,
            "UPDATE_WORKOUT_PLAN" => ActionTag::UpdateWorkoutPlan,
            "CREATE_NUTRITION_PLAN" => ActionTag::CreateNutritionPlan,
            "UPDATE_NUTRITION_PLAN" => ActionTag::UpdateNutritionPlan,
            "LOG_PROGRESS" => ActionTag::LogProgress,
            "COMPLETE_SESSION" => ActionTag::CompleteSession,
            "COMPLETE_MEAL" => ActionTag::CompleteMeal,
            _ => ActionTag::Unknown(tag.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionTag::CreateWorkoutPlan => "CREATE_WORKOUT_PLAN",
            ActionTag::UpdateWorkoutPlan => "UPDATE_WORKOUT_PLAN",
            ActionTag::CreateNutritionPlan => "CREATE_NUTRITION_PLAN",
            ActionTag::UpdateNutritionPlan => "UPDATE_NUTRITION_PLAN",
            ActionTag::LogProgress => "LOG_PROGRESS",
            ActionTag::CompleteSession => "COMPLETE_SESSION",
            ActionTag::CompleteMeal => "COMPLETE_MEAL",
            ActionTag::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for ActionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed action with its JSON payload
#[derive(Debug, Clone, PartialEq)]
pub struct ActionBlock {
    pub tag: ActionTag,
    pub payload: Value,
}

/// Remove a surrounding Markdown code fence, if any
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text) {
        Some(caps) => caps.get(1).map_or(text, |m| m.as_str()),
        None => text.trim(),
    }
}

/// Extract every action block from `text`, in order of appearance
pub fn extract_action_blocks(text: &str) -> Vec<Result<ActionBlock, ActionError>> {
    ACTION_BLOCK
        .captures_iter(text)
        .map(|caps| {
            let tag = ActionTag::parse(&caps[1]);
            let body = strip_code_fence(&caps[2]);
            serde_json::from_str::<Value>(body)
                .map(|payload| ActionBlock {
                    tag: tag.clone(),
                    payload,
                })
                .map_err(|source| ActionError::MalformedPayload {
                    tag: tag.to_string(),
                    source,
                })
        })
        .collect()
}

/// The reply text with every action block removed
pub fn strip_action_blocks(text: &str) -> String {
    ACTION_BLOCK.replace_all(text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_two_good_blocks_and_one_malformed() {
        let reply = r#"Listo.
[ACTION:CREATE_WORKOUT_PLAN]{"name": "Fuerza"}[/ACTION]
[ACTION:LOG_PROGRESS]{"date": "2025-04-01", "weight": 75,}[/ACTION]
[ACTION:CREATE_NUTRITION_PLAN]
```json
{"name": "Definición", "daily_calories": 2000}
```
[/ACTION]"#;

        let results = extract_action_blocks(reply);
        assert_eq!(results.len(), 3);

        let good: Vec<&ActionBlock> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        assert_eq!(good.len(), 2);
        assert_eq!(good[0].tag, ActionTag::CreateWorkoutPlan);
        assert_eq!(good[0].payload, json!({ "name": "Fuerza" }));
        assert_eq!(good[1].tag, ActionTag::CreateNutritionPlan);

        match &results[1] {
            Err(ActionError::MalformedPayload { tag, .. }) => assert_eq!(tag, "LOG_PROGRESS"),
            other => panic!("expected malformed payload, got {:?}", other),
        }
    }

    #[test]
    fn test_strip_action_blocks() {
        let reply = "Aquí tienes tu plan.\n[ACTION:CREATE_WORKOUT_PLAN]{}[/ACTION]";
        assert_eq!(strip_action_blocks(reply), "Aquí tienes tu plan.");
    }

    #[test]
    fn test_no_blocks() {
        assert!(extract_action_blocks("Solo texto").is_empty());
    }

    #[rstest]
    #[case("CREATE_WORKOUT_PLAN", ActionTag::CreateWorkoutPlan)]
    #[case("log_progress", ActionTag::LogProgress)]
    #[case("COMPLETE_MEAL", ActionTag::CompleteMeal)]
    #[case("DELETE_EVERYTHING", ActionTag::Unknown("DELETE_EVERYTHING".to_string()))]
    fn test_tag_parsing(#[case] raw: &str, #[case] expected: ActionTag) {
        assert_eq!(ActionTag::parse(raw), expected);
    }

    #[rstest]
    #[case("```json\n{\"a\":1}\n```", "{\"a\":1}")]
    #[case("```\n{\"a\":1}```", "{\"a\":1}")]
    #[case("  {\"a\":1}  ", "{\"a\":1}")]
    fn test_strip_code_fence(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(strip_code_fence(raw), expected);
    }
}
