use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::categorization::OptionItem;
use crate::comprehension::ComprehensionQuestion;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizationPayload {
    pub categories: Vec<CategoryRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRecord {
    pub name: String,
    pub options: Vec<OptionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClozePayload {
    pub question: String,
    pub blanks: Vec<usize>,
    pub options: BTreeMap<usize, Vec<String>>,
    pub answers: BTreeMap<usize, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComprehensionPayload {
    pub passage: String,
    pub questions: Vec<ComprehensionQuestion>,
    pub user_answers: BTreeMap<usize, String>,
}

/// A comprehension record as returned by the fetch endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedComprehension {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub passage: String,
    #[serde(default)]
    pub questions: Vec<SavedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedQuestion {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::categorization::OptionId;

    #[test]
    fn categorization_wire_shape() {
        let payload = CategorizationPayload {
            categories: vec![CategoryRecord {
                name: "Animals".into(),
                options: vec![OptionItem {
                    id: OptionId::new(1),
                    name: "Cat".into(),
                }],
            }],
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"categories": [{"name": "Animals", "options": [{"id": 1, "name": "Cat"}]}]})
        );
    }

    #[test]
    fn cloze_maps_use_string_keys() {
        let payload = ClozePayload {
            question: "the cat sat".into(),
            blanks: vec![1],
            options: BTreeMap::from([(1, vec!["cat".to_string(), "dog".to_string()])]),
            answers: BTreeMap::from([(1, "cat".to_string())]),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "question": "the cat sat",
                "blanks": [1],
                "options": {"1": ["cat", "dog"]},
                "answers": {"1": "cat"}
            })
        );
    }

    #[test]
    fn comprehension_uses_camel_case_names() {
        let payload = ComprehensionPayload {
            passage: "p".into(),
            questions: vec![ComprehensionQuestion {
                question: "q".into(),
                options: vec!["a".into()],
                correct_answer: "a".into(),
            }],
            user_answers: BTreeMap::from([(0, "a".to_string())]),
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "passage": "p",
                "questions": [{"question": "q", "options": ["a"], "correctAnswer": "a"}],
                "userAnswers": {"0": "a"}
            })
        );
    }

    #[test]
    fn saved_records_tolerate_extra_and_missing_fields() {
        let records: Vec<SavedComprehension> = serde_json::from_value(json!([
            {
                "_id": "abc",
                "passage": "Once upon a time",
                "questions": [{"question": "Who?", "options": ["me"], "correctAnswer": "me"}],
                "userAnswers": {"0": "me"},
                "__v": 0
            },
            {"passage": "bare"}
        ]))
        .unwrap();

        assert_eq!(records[0].id.as_deref(), Some("abc"));
        assert_eq!(records[0].questions[0].options, vec!["me".to_string()]);
        assert!(records[1].questions.is_empty());
        assert!(records[1].id.is_none());
    }
}
