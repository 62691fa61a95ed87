//! AI insight adapter: prompt construction, defensive parsing of the
//! provider's free-form reply, and a static fallback that guarantees the
//! caller always gets usable content.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::CycleEntry;

pub mod openai;

pub use openai::{GenError, OpenAiText, TextGenerator};

const MAX_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub suggestions: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InsightInput {
    pub user_name: String,
    pub age: i32,
    pub avg_cycle_length: i32,
    pub symptoms: Vec<String>,
    pub cycles: Vec<CycleEntry>,
}

/// Symptoms ranked by how often they appear across the given entries,
/// most frequent first (ties broken alphabetically so output is stable).
pub fn top_symptoms(entries: &[CycleEntry], limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for entry in entries {
        for symptom in &entry.symptoms {
            *counts.entry(symptom.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|(symptom, _)| symptom.to_string())
        .collect()
}

pub fn build_prompt(input: &InsightInput) -> String {
    let mut cycle_lines = String::new();
    for cycle in &input.cycles {
        let symptoms = if cycle.symptoms.is_empty() {
            "None recorded".to_string()
        } else {
            cycle.symptoms.join(", ")
        };
        cycle_lines.push_str(&format!(
            "- Period from {} to {}\n  Symptoms: {}\n",
            cycle.start_date, cycle.end_date, symptoms
        ));
    }

    format!(
        "You are an expert of menstrual health and are really kind and sweet. \
Please analyze the following user data and provide personalized insights \
and self-care recommendations.\n\n\
USER INFORMATION:\n\
Name: {name}\n\
Age: {age}\n\
Average Cycle Length: {cycle_len} days\n\n\
RECENT SYMPTOMS:\n{symptoms}\n\n\
RECENT CYCLE HISTORY:\n{cycles}\n\
Based on this information, please provide a brief analysis of the user's \
symptom patterns and 5 specific self-care recommendations.\n\n\
Please format your response as JSON with the following structure:\n\
{{\n  \"suggestions\": \"Your supportive analysis here\",\n  \
\"recommendations\": [\"recommendation1\", \"recommendation2\"]\n}}",
        name = input.user_name,
        age = input.age,
        cycle_len = input.avg_cycle_length,
        symptoms = input.symptoms.join(", "),
        cycles = cycle_lines,
    )
}

/// Extract a structured [`Insight`] from the provider's free text.
///
/// The JSON object is often wrapped in explanatory prose, so the substring
/// between the first `{` and the last `}` is parsed strictly first; only
/// when that fails does the heuristic "recommendations:" split apply.
/// Returns `None` when neither yields anything usable.
pub fn parse_response(raw: &str) -> Option<Insight> {
    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
        if start < end {
            if let Ok(insight) = serde_json::from_str::<Insight>(&raw[start..=end]) {
                if !insight.recommendations.is_empty() {
                    return Some(insight);
                }
            }
        }
    }

    let (before, after) = raw.split_once("recommendations:")?;
    let recommendations = split_numbered(after);
    if recommendations.is_empty() {
        return None;
    }
    let suggestions = before.trim();
    Some(Insight {
        suggestions: if suggestions.is_empty() {
            "Based on your symptoms, consider gentle self-care practices.".to_string()
        } else {
            suggestions.to_string()
        },
        recommendations,
    })
}

/// Split free text on numbered-list markers ("1.", "2." ...).
fn split_numbered(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c.is_ascii_digit() && matches!(chars.peek(), Some('.')) {
            chars.next();
            if !current.trim().is_empty() {
                items.push(current.trim().to_string());
            }
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        items.push(current.trim().to_string());
    }
    items
}

/// Symptom-keyword recommendations used when the provider fails or its
/// reply cannot be parsed. Never returns an empty list.
pub fn fallback(symptoms: &[String]) -> Insight {
    let mut recommendations: Vec<String> = Vec::new();

    let has = |needle: &str| symptoms.iter().any(|s| s.eq_ignore_ascii_case(needle));

    if has("cramps") || has("pain") {
        recommendations.push("Use a heating pad on your lower abdomen to help with cramps".into());
        recommendations.push("Try gentle yoga or stretching to relieve tension".into());
    }
    if has("headache") || has("migraine") {
        recommendations.push("Rest in a dark, quiet room when experiencing headaches".into());
        recommendations
            .push("Stay hydrated throughout your cycle, especially before your period".into());
    }
    if has("mood swings") || has("anxiety") || has("irritability") {
        recommendations
            .push("Practice mindfulness meditation to help manage emotional symptoms".into());
        recommendations
            .push("Consider keeping a mood journal to identify patterns and triggers".into());
    }
    if has("fatigue") || has("tiredness") {
        recommendations
            .push("Prioritize sleep during your period and aim for 7-8 hours each night".into());
        recommendations
            .push("Consider iron-rich foods as fatigue can be related to blood loss".into());
    }
    if has("bloating") {
        recommendations.push("Reduce salt intake in the days leading up to your period".into());
        recommendations
            .push("Try herbal teas like peppermint or ginger to reduce bloating".into());
    }

    for default in [
        "Stay hydrated by drinking plenty of water throughout your cycle",
        "Incorporate regular, moderate exercise like walking or swimming",
        "Practice stress management techniques such as deep breathing or meditation",
        "Maintain a balanced diet rich in fruits, vegetables, and whole grains",
        "Ensure you get adequate rest, especially during your period",
    ] {
        if recommendations.len() >= MAX_RECOMMENDATIONS {
            break;
        }
        recommendations.push(default.to_string());
    }
    recommendations.truncate(MAX_RECOMMENDATIONS);

    Insight {
        suggestions: "Based on your tracked symptoms, here are some general self-care \
                      recommendations that might help."
            .to_string(),
        recommendations,
    }
}

/// Full pipeline: prompt, provider call, defensive parse, fallback.
/// Provider errors are logged and swallowed; the result is always a
/// non-empty insight, so the HTTP layer can return 200 unconditionally.
pub async fn get_insights(llm: &dyn TextGenerator, input: &InsightInput) -> Insight {
    let prompt = build_prompt(input);
    match llm.generate(&prompt).await {
        Ok(raw) => parse_response(&raw).unwrap_or_else(|| {
            tracing::warn!("insight response unparseable, using fallback");
            fallback(&input.symptoms)
        }),
        Err(e) => {
            tracing::error!("insight provider failed: {e}");
            fallback(&input.symptoms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn entry(symptoms: &[&str]) -> CycleEntry {
        CycleEntry {
            id: Uuid::new_v4(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    struct FailingGen;

    #[async_trait]
    impl TextGenerator for FailingGen {
        async fn generate(&self, _prompt: &str) -> Result<String, GenError> {
            Err(GenError::Provider("simulated outage".into()))
        }
    }

    #[test]
    fn extracts_json_embedded_in_prose() {
        let raw = r#"Here is my analysis {"suggestions":"x","recommendations":["a","b"]} — hope that helps"#;
        let insight = parse_response(raw).unwrap();
        assert_eq!(insight.suggestions, "x");
        assert_eq!(insight.recommendations, vec!["a", "b"]);
    }

    #[test]
    fn falls_back_to_numbered_list_split() {
        let raw = "Your pattern looks steady.\nrecommendations:\n1. drink water 2. sleep more";
        let insight = parse_response(raw).unwrap();
        assert_eq!(insight.suggestions, "Your pattern looks steady.");
        assert_eq!(insight.recommendations, vec!["drink water", "sleep more"]);
    }

    #[test]
    fn garbage_yields_none() {
        assert!(parse_response("no structure here at all").is_none());
        assert!(parse_response("{not json} recommendations: ").is_none());
    }

    #[test]
    fn malformed_json_with_list_uses_heuristic() {
        let raw = r#"{"broken": } recommendations: 1. rest well"#;
        let insight = parse_response(raw).unwrap();
        assert_eq!(insight.recommendations, vec!["rest well"]);
    }

    #[test]
    fn top_symptoms_ranks_by_frequency() {
        let entries = vec![
            entry(&["cramps", "headache"]),
            entry(&["cramps", "bloating"]),
            entry(&["cramps", "headache", "fatigue"]),
        ];
        let top = top_symptoms(&entries, 3);
        assert_eq!(top, vec!["cramps", "headache", "bloating"]);
    }

    #[test]
    fn fallback_covers_cramps_with_heat_therapy() {
        let insight = fallback(&["cramps".to_string()]);
        assert!(!insight.recommendations.is_empty());
        assert!(insight
            .recommendations
            .iter()
            .any(|r| r.contains("heating pad")));
        assert!(insight.recommendations.len() <= MAX_RECOMMENDATIONS);
    }

    #[tokio::test]
    async fn provider_failure_always_yields_content() {
        let input = InsightInput {
            user_name: "Maya".into(),
            age: 28,
            avg_cycle_length: 28,
            symptoms: vec!["cramps".into()],
            cycles: vec![entry(&["cramps"])],
        };
        let insight = get_insights(&FailingGen, &input).await;
        assert!(!insight.suggestions.is_empty());
        assert!(insight
            .recommendations
            .iter()
            .any(|r| r.contains("heating pad")));
    }

    #[test]
    fn prompt_carries_user_data() {
        let input = InsightInput {
            user_name: "Maya".into(),
            age: 28,
            avg_cycle_length: 30,
            symptoms: vec!["cramps".into(), "fatigue".into()],
            cycles: vec![entry(&["cramps"])],
        };
        let prompt = build_prompt(&input);
        assert!(prompt.contains("Name: Maya"));
        assert!(prompt.contains("Average Cycle Length: 30 days"));
        assert!(prompt.contains("cramps, fatigue"));
        assert!(prompt.contains("2024-01-01"));
    }
}
