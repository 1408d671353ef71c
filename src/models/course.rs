//! Learning domain objects recovered from model replies.
//!
//! The generator agents are prompted to answer with a single JSON object;
//! these structs mirror that shape. Every field the model may omit carries
//! a default so a partially-filled reply still deserializes.

use serde::{Deserialize, Serialize};

/// Exercise difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Label used when interpolating the difficulty into a prompt.
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// A generated practice exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Exercise {
    /// Generated client-side (`gen_<millis>`), not part of the model reply
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub subject_id: String,
    pub title: String,
    pub difficulty: Difficulty,
    /// Editor language tag (bash, go, python, sql...)
    pub language: String,
    /// Short one-line description
    pub desc: String,
    /// Full exercise statement, markdown
    pub detail: String,
    pub hints: Vec<String>,
    pub initial_code: String,
    pub expected_output: Option<String>,
}

/// Verdict produced by the code-judge agent for a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Judgment {
    pub passed: bool,
    /// Score out of 100
    pub score: u32,
    pub simulated_output: Option<String>,
    pub feedback: Option<String>,
    pub suggestions: Vec<String>,
}

/// One section inside a lesson chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub desc: Option<String>,
}

/// One chapter of a lesson outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub sections: Vec<Section>,
}

/// A full lesson outline for a subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Outline {
    pub chapters: Vec<Chapter>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_serialization() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Medium).expect("Failed to serialize"),
            "\"medium\""
        );
        let parsed: Difficulty = serde_json::from_str("\"hard\"").expect("Failed to parse");
        assert_eq!(parsed, Difficulty::Hard);
    }

    #[test]
    fn test_exercise_from_camel_case_reply() {
        let json = r###"{
            "title": "Count word frequency",
            "difficulty": "medium",
            "language": "python",
            "desc": "Count words in a file",
            "detail": "## Task\nRead input and count...",
            "hints": ["use a dict", "split on whitespace"],
            "initialCode": "def count(text):\n    pass\n",
            "expectedOutput": "the: 3"
        }"###;
        let exercise: Exercise = serde_json::from_str(json).expect("Failed to parse");
        assert_eq!(exercise.title, "Count word frequency");
        assert_eq!(exercise.difficulty, Difficulty::Medium);
        assert_eq!(exercise.hints.len(), 2);
        assert_eq!(exercise.initial_code, "def count(text):\n    pass\n");
        assert_eq!(exercise.expected_output.as_deref(), Some("the: 3"));
        // Client-side fields default to empty until filled in
        assert_eq!(exercise.id, "");
        assert_eq!(exercise.subject_id, "");
    }

    #[test]
    fn test_exercise_tolerates_missing_fields() {
        let exercise: Exercise =
            serde_json::from_str(r#"{"title":"X"}"#).expect("Failed to parse");
        assert_eq!(exercise.title, "X");
        assert_eq!(exercise.difficulty, Difficulty::Easy);
        assert!(exercise.hints.is_empty());
        assert!(exercise.expected_output.is_none());
    }

    #[test]
    fn test_judgment_from_reply() {
        let json = r#"{
            "passed": true,
            "score": 92,
            "simulatedOutput": "hello\n",
            "feedback": "Clean solution",
            "suggestions": ["handle empty input"]
        }"#;
        let judgment: Judgment = serde_json::from_str(json).expect("Failed to parse");
        assert!(judgment.passed);
        assert_eq!(judgment.score, 92);
        assert_eq!(judgment.simulated_output.as_deref(), Some("hello\n"));
        assert_eq!(judgment.suggestions.len(), 1);
    }

    #[test]
    fn test_judgment_defaults() {
        let judgment: Judgment = serde_json::from_str("{}").expect("Failed to parse");
        assert!(!judgment.passed);
        assert_eq!(judgment.score, 0);
        assert!(judgment.feedback.is_none());
    }

    #[test]
    fn test_outline_nested_structure() {
        let json = r#"{
            "chapters": [
                {"id": "c1", "title": "Basics", "sections": [
                    {"id": "s1", "title": "Variables"},
                    {"id": "s2", "title": "Loops", "desc": "for and while"}
                ]}
            ]
        }"#;
        let outline: Outline = serde_json::from_str(json).expect("Failed to parse");
        assert_eq!(outline.chapters.len(), 1);
        assert_eq!(outline.chapters[0].sections.len(), 2);
        assert_eq!(
            outline.chapters[0].sections[1].desc.as_deref(),
            Some("for and while")
        );
    }
}
