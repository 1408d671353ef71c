//! High-level learning flows.
//!
//! Each flow follows the same shape: build a prompt, open a stream against
//! the role's agent, collect the full reply, then recover structure from
//! the accumulated text. Structure recovery failures degrade rather than
//! crash: judging falls back to the raw reply text, exercise and outline
//! generation surface a typed error that still carries the raw text.
//!
//! Superseded streams are not auto-cancelled; a caller re-generating while
//! a previous stream is open closes the old handle first.

use chrono::Utc;

use crate::agent::{collect_reply, new_session_id, AgentClient, AssistantReply, StreamHandle};
use crate::config::{editor_language, subject_description, AgentEndpoint, AgentRoster};
use crate::error::AgentError;
use crate::markdown::repair_collapsed_tables;
use crate::models::{AgentRunRequest, Difficulty, Exercise, Judgment, Outline, Section};
use crate::recovery::extract_structured_object;

/// Outcome of a judgment request.
///
/// A reply the recovery layer cannot turn into a [`Judgment`] is still
/// worth showing, so it degrades to the raw text instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum JudgeOutcome {
    Report(Judgment),
    Raw(String),
}

/// Facade over the five role agents.
pub struct Tutor {
    client: AgentClient,
    roster: AgentRoster,
}

impl Tutor {
    pub fn new(client: AgentClient, roster: AgentRoster) -> Self {
        Self { client, roster }
    }

    /// Open a stream for one role agent under a fresh session id.
    fn open_stream(
        &self,
        endpoint: &AgentEndpoint,
        namespace: &str,
        content: String,
    ) -> StreamHandle {
        let session_id = new_session_id(namespace);
        tracing::debug!(agent = %endpoint.name, session_id = %session_id, "opening agent stream");
        self.client.run_agent_stream(AgentRunRequest::new(
            endpoint.agent_id,
            endpoint.api_key.clone(),
            session_id,
            content,
        ))
    }

    async fn run_to_completion(
        &self,
        endpoint: &AgentEndpoint,
        namespace: &str,
        prompt: String,
        on_progress: impl FnMut(&str),
    ) -> Result<AssistantReply, AgentError> {
        let handle = self.open_stream(endpoint, namespace, prompt);
        collect_reply(&handle, on_progress).await
    }

    /// Generate one practice exercise.
    ///
    /// `on_progress` receives the accumulated reply text as it streams in,
    /// for a live preview.
    pub async fn generate_exercise(
        &self,
        subject_id: &str,
        difficulty: Difficulty,
        topic: Option<&str>,
        on_progress: impl FnMut(&str),
    ) -> Result<Exercise, AgentError> {
        let prompt = exercise_prompt(subject_id, difficulty, topic);
        let reply = self
            .run_to_completion(&self.roster.exercise_generator, "ailearn", prompt, on_progress)
            .await?;
        exercise_from_reply(subject_id, difficulty, &reply.content)
    }

    /// Judge a code submission against an exercise.
    pub async fn judge_submission(
        &self,
        exercise: &Exercise,
        code: &str,
    ) -> Result<JudgeOutcome, AgentError> {
        let prompt = judge_prompt(exercise, code);
        let reply = self
            .run_to_completion(&self.roster.code_judge, "ailearn", prompt, |_| {})
            .await?;
        Ok(judgment_from_reply(&reply.content))
    }

    /// Generate the lesson outline for a subject.
    pub async fn generate_outline(
        &self,
        subject_id: &str,
        on_progress: impl FnMut(&str),
    ) -> Result<Outline, AgentError> {
        let prompt = outline_prompt(subject_id);
        let reply = self
            .run_to_completion(
                &self.roster.outline_generator,
                "ailearn_teach",
                prompt,
                on_progress,
            )
            .await?;
        outline_from_reply(&reply.content)
    }

    /// Generate the teaching content of one section.
    ///
    /// Returns the accumulated markdown with collapsed tables repaired.
    /// Caching per `(chapter, section)` is the caller's concern; every call
    /// opens a fresh stream.
    pub async fn section_content(
        &self,
        subject_id: &str,
        chapter_title: &str,
        section: &Section,
        on_progress: impl FnMut(&str),
    ) -> Result<String, AgentError> {
        let prompt = section_prompt(subject_id, chapter_title, section);
        let reply = self
            .run_to_completion(
                &self.roster.content_generator,
                "ailearn_teach",
                prompt,
                on_progress,
            )
            .await?;
        Ok(repair_collapsed_tables(&reply.content))
    }

    /// Ask the teaching assistant. The caller composes the message with
    /// [`chat_prompt_with_exercise`] or [`chat_prompt_with_section`] when
    /// context should ride along.
    pub async fn chat(
        &self,
        subject_id: &str,
        content: String,
        on_progress: impl FnMut(&str),
    ) -> Result<AssistantReply, AgentError> {
        let namespace = format!("ailearn_chat_{}", subject_id);
        self.run_to_completion(&self.roster.teaching_assistant, &namespace, content, on_progress)
            .await
    }
}

/// Prompt for the exercise generator.
pub fn exercise_prompt(subject_id: &str, difficulty: Difficulty, topic: Option<&str>) -> String {
    let description = subject_description(subject_id).unwrap_or(subject_id);
    match topic {
        Some(topic) => format!(
            "Generate one {} practice exercise for {}. Topic requirement: {}",
            difficulty.as_str(),
            description,
            topic
        ),
        None => format!(
            "Generate one random {} practice exercise for {}",
            difficulty.as_str(),
            description
        ),
    }
}

/// Prompt for the code judge.
pub fn judge_prompt(exercise: &Exercise, code: &str) -> String {
    format!(
        "Exercise description:\n{}\n\nExpected output:\n{}\n\nLanguage: {}\n\nSubmitted code:\n```{}\n{}\n```",
        exercise.detail,
        exercise.expected_output.as_deref().unwrap_or("none"),
        exercise.language,
        exercise.language,
        code
    )
}

/// Prompt for the outline generator.
pub fn outline_prompt(subject_id: &str) -> String {
    let description = subject_description(subject_id).unwrap_or(subject_id);
    format!(
        "Generate a lesson outline for \"{}\". Subject description: {}",
        subject_id, description
    )
}

/// Prompt for the section content generator.
pub fn section_prompt(subject_id: &str, chapter_title: &str, section: &Section) -> String {
    let mut prompt = format!(
        "Generate detailed teaching content for \"{} - {}\" in the \"{}\" course.",
        chapter_title, section.title, subject_id
    );
    if let Some(desc) = section.desc.as_deref() {
        prompt.push_str(&format!(" Content description: {}", desc));
    }
    prompt
}

/// Chat message carrying the current exercise and code as context.
pub fn chat_prompt_with_exercise(exercise: &Exercise, code: &str, question: &str) -> String {
    format!(
        "[Current exercise: {}]\n[Description]:\n{}\n\n[My code]:\n```{}\n{}\n```\n\n[My question]: {}",
        exercise.title, exercise.detail, exercise.language, code, question
    )
}

/// Maximum number of characters of section content forwarded as context.
const SECTION_CONTEXT_LIMIT: usize = 3000;

/// Chat message carrying the current section content as context.
pub fn chat_prompt_with_section(
    subject_id: &str,
    section_title: &str,
    section_content: &str,
    question: &str,
) -> String {
    let summary: String = section_content.chars().take(SECTION_CONTEXT_LIMIT).collect();
    format!(
        "[Current subject: {}]\n[Current section: {}]\n[Content summary]:\n{}\n\n[My question]: {}",
        subject_id, section_title, summary, question
    )
}

/// Turn an accumulated reply into a typed exercise.
fn exercise_from_reply(
    subject_id: &str,
    requested: Difficulty,
    content: &str,
) -> Result<Exercise, AgentError> {
    let value = extract_structured_object(content).ok_or_else(|| AgentError::NoStructuredOutput {
        raw: content.to_string(),
    })?;
    let difficulty_given = value.get("difficulty").is_some();
    let mut exercise: Exercise = serde_json::from_value(value)?;

    exercise.id = format!("gen_{}", Utc::now().timestamp_millis());
    exercise.subject_id = subject_id.to_string();
    if !difficulty_given {
        exercise.difficulty = requested;
    }
    if exercise.title.is_empty() {
        exercise.title = "Untitled exercise".to_string();
    }
    if exercise.language.is_empty() {
        exercise.language = editor_language(subject_id).to_string();
    }
    Ok(exercise)
}

/// Turn an accumulated reply into a judgment, degrading to the raw text.
fn judgment_from_reply(content: &str) -> JudgeOutcome {
    let recovered = extract_structured_object(content)
        .and_then(|value| serde_json::from_value::<Judgment>(value).ok());
    match recovered {
        Some(judgment) => JudgeOutcome::Report(judgment),
        None => {
            tracing::debug!("judge reply had no structured verdict, falling back to raw text");
            JudgeOutcome::Raw(content.to_string())
        }
    }
}

/// Turn an accumulated reply into a lesson outline.
fn outline_from_reply(content: &str) -> Result<Outline, AgentError> {
    let value = extract_structured_object(content).ok_or_else(|| AgentError::NoStructuredOutput {
        raw: content.to_string(),
    })?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_exercise() -> Exercise {
        Exercise {
            id: "gen_1".to_string(),
            subject_id: "python".to_string(),
            title: "Word count".to_string(),
            difficulty: Difficulty::Easy,
            language: "python".to_string(),
            desc: "Count words".to_string(),
            detail: "Count the words in a string.".to_string(),
            hints: vec![],
            initial_code: "def count(s):\n    pass\n".to_string(),
            expected_output: Some("3".to_string()),
        }
    }

    // Prompt builders

    #[test]
    fn test_exercise_prompt_with_topic() {
        let prompt = exercise_prompt("rust", Difficulty::Medium, Some("lifetimes"));
        assert!(prompt.contains("medium"));
        assert!(prompt.contains("ownership"));
        assert!(prompt.contains("Topic requirement: lifetimes"));
    }

    #[test]
    fn test_exercise_prompt_without_topic() {
        let prompt = exercise_prompt("rust", Difficulty::Hard, None);
        assert!(prompt.contains("random"));
        assert!(prompt.contains("hard"));
    }

    #[test]
    fn test_exercise_prompt_unknown_subject_uses_id() {
        let prompt = exercise_prompt("cobol", Difficulty::Easy, None);
        assert!(prompt.contains("cobol"));
    }

    #[test]
    fn test_judge_prompt_includes_code_fence() {
        let prompt = judge_prompt(&sample_exercise(), "print(3)");
        assert!(prompt.contains("Count the words in a string."));
        assert!(prompt.contains("```python\nprint(3)\n```"));
        assert!(prompt.contains("Expected output:\n3"));
    }

    #[test]
    fn test_judge_prompt_without_expected_output() {
        let mut exercise = sample_exercise();
        exercise.expected_output = None;
        let prompt = judge_prompt(&exercise, "x");
        assert!(prompt.contains("Expected output:\nnone"));
    }

    #[test]
    fn test_section_prompt_with_and_without_desc() {
        let mut section = Section {
            id: "s1".to_string(),
            title: "Variables".to_string(),
            desc: None,
        };
        let prompt = section_prompt("go", "Basics", &section);
        assert!(prompt.contains("Basics - Variables"));
        assert!(!prompt.contains("Content description"));

        section.desc = Some("declaration and zero values".to_string());
        let prompt = section_prompt("go", "Basics", &section);
        assert!(prompt.contains("Content description: declaration and zero values"));
    }

    #[test]
    fn test_chat_prompt_with_exercise() {
        let prompt = chat_prompt_with_exercise(&sample_exercise(), "my code", "why?");
        assert!(prompt.starts_with("[Current exercise: Word count]"));
        assert!(prompt.contains("```python\nmy code\n```"));
        assert!(prompt.ends_with("[My question]: why?"));
    }

    #[test]
    fn test_chat_prompt_with_section_truncates_context() {
        let long_content = "宽".repeat(SECTION_CONTEXT_LIMIT + 500);
        let prompt = chat_prompt_with_section("go", "Loops", &long_content, "q");
        let summary_len = prompt.chars().filter(|&c| c == '宽').count();
        assert_eq!(summary_len, SECTION_CONTEXT_LIMIT);
    }

    // Reply recovery

    #[test]
    fn test_exercise_from_clean_reply() {
        let reply = r#"{"title":"FizzBuzz","difficulty":"medium","language":"go","desc":"d","detail":"dd","hints":["h"],"initialCode":"code","expectedOutput":"out"}"#;
        let exercise = exercise_from_reply("go", Difficulty::Easy, reply).expect("parse failed");
        assert_eq!(exercise.title, "FizzBuzz");
        assert_eq!(exercise.difficulty, Difficulty::Medium);
        assert_eq!(exercise.subject_id, "go");
        assert!(exercise.id.starts_with("gen_"));
    }

    #[test]
    fn test_exercise_from_fenced_reply_fills_defaults() {
        let reply = "Here is your exercise:\n```json\n{\"detail\": \"Do the thing.\"}\n```";
        let exercise = exercise_from_reply("rust", Difficulty::Hard, reply).expect("parse failed");
        assert_eq!(exercise.title, "Untitled exercise");
        // Difficulty was not in the reply: the requested one wins
        assert_eq!(exercise.difficulty, Difficulty::Hard);
        assert_eq!(exercise.language, "rust");
    }

    #[test]
    fn test_exercise_from_reply_without_json_keeps_raw() {
        let result = exercise_from_reply("go", Difficulty::Easy, "I cannot help with that.");
        match result {
            Err(AgentError::NoStructuredOutput { raw }) => {
                assert_eq!(raw, "I cannot help with that.")
            }
            other => panic!("Expected NoStructuredOutput, got {:?}", other),
        }
    }

    #[test]
    fn test_judgment_from_reply_structured() {
        let reply = r#"Result: {"passed": true, "score": 88, "suggestions": ["tidy up"]}"#;
        match judgment_from_reply(reply) {
            JudgeOutcome::Report(judgment) => {
                assert!(judgment.passed);
                assert_eq!(judgment.score, 88);
            }
            JudgeOutcome::Raw(_) => panic!("Expected structured judgment"),
        }
    }

    #[test]
    fn test_judgment_from_reply_falls_back_to_raw() {
        let reply = "Your code looks mostly fine but I could not score it.";
        match judgment_from_reply(reply) {
            JudgeOutcome::Raw(raw) => assert_eq!(raw, reply),
            JudgeOutcome::Report(_) => panic!("Expected raw fallback"),
        }
    }

    #[test]
    fn test_outline_from_reply() {
        let reply = "```json\n{\"chapters\":[{\"id\":\"c1\",\"title\":\"Intro\",\"sections\":[{\"id\":\"s1\",\"title\":\"Setup\"}]}]}\n```";
        let outline = outline_from_reply(reply).expect("parse failed");
        assert_eq!(outline.chapters.len(), 1);
        assert_eq!(outline.chapters[0].sections[0].title, "Setup");
    }

    #[test]
    fn test_outline_from_reply_without_json() {
        assert!(matches!(
            outline_from_reply("no outline today"),
            Err(AgentError::NoStructuredOutput { .. })
        ));
    }
}
