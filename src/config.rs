//! Agent roster and subject configuration.
//!
//! Each learning flow talks to a dedicated backend agent, addressed by an
//! `(agent_id, api_key)` pair. The roster collects the five roles and loads
//! them from the environment, so keys never live in the source tree.
//!
//! The subject tables map a subject id to the editor language tag used for
//! generated exercises and to the one-line description interpolated into
//! prompts.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidVar { name: String, value: String },
}

/// Address of one backend agent.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentEndpoint {
    pub agent_id: i64,
    pub api_key: String,
    /// Human-readable role name, used in log output only
    pub name: String,
}

impl AgentEndpoint {
    /// Create an endpoint directly (tests, embedders with their own config).
    pub fn new(agent_id: i64, api_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            agent_id,
            api_key: api_key.into(),
            name: name.into(),
        }
    }

    /// Load `AILEARN_<PREFIX>_AGENT_ID` / `AILEARN_<PREFIX>_API_KEY`.
    fn from_env(prefix: &str, name: &str) -> Result<Self, ConfigError> {
        let id_var = format!("AILEARN_{}_AGENT_ID", prefix);
        let key_var = format!("AILEARN_{}_API_KEY", prefix);

        let raw_id =
            std::env::var(&id_var).map_err(|_| ConfigError::MissingVar(id_var.clone()))?;
        let agent_id = raw_id.parse().map_err(|_| ConfigError::InvalidVar {
            name: id_var,
            value: raw_id,
        })?;
        let api_key = std::env::var(&key_var).map_err(|_| ConfigError::MissingVar(key_var))?;

        Ok(Self {
            agent_id,
            api_key,
            name: name.to_string(),
        })
    }
}

/// The five agent roles the learning flows use.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRoster {
    /// Generates practice exercises as structured JSON
    pub exercise_generator: AgentEndpoint,
    /// Judges submitted code against an exercise
    pub code_judge: AgentEndpoint,
    /// Conversational assistant for questions about the current work
    pub teaching_assistant: AgentEndpoint,
    /// Generates a lesson outline (chapters and sections)
    pub outline_generator: AgentEndpoint,
    /// Generates the teaching content of one section
    pub content_generator: AgentEndpoint,
}

impl AgentRoster {
    /// Load the full roster from the environment.
    ///
    /// Expects, per role, `AILEARN_<ROLE>_AGENT_ID` and
    /// `AILEARN_<ROLE>_API_KEY` with role prefixes `EXERCISE`, `JUDGE`,
    /// `ASSISTANT`, `OUTLINE` and `CONTENT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            exercise_generator: AgentEndpoint::from_env("EXERCISE", "exercise-generator")?,
            code_judge: AgentEndpoint::from_env("JUDGE", "code-judge")?,
            teaching_assistant: AgentEndpoint::from_env("ASSISTANT", "teaching-assistant")?,
            outline_generator: AgentEndpoint::from_env("OUTLINE", "outline-generator")?,
            content_generator: AgentEndpoint::from_env("CONTENT", "content-generator")?,
        })
    }
}

/// Subject id -> editor language tag.
static SUBJECT_LANGUAGES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("shell", "bash"),
        ("go", "go"),
        ("python", "python"),
        ("mysql", "sql"),
        ("java", "java"),
        ("cpp", "cpp"),
        ("rust", "rust"),
        ("typescript", "typescript"),
        ("javascript", "javascript"),
        ("kotlin", "kotlin"),
        ("postgresql", "sql"),
        ("redis", "bash"),
        ("linux", "bash"),
        ("git", "bash"),
        ("docker", "dockerfile"),
        ("nginx", "nginx"),
        ("regex", "javascript"),
        ("htmlcss", "html"),
        ("network", "bash"),
        ("algorithm", "python"),
    ])
});

/// Subject id -> description used when building prompts.
static SUBJECT_DESCRIPTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("shell", "Shell/Bash command line, covering grep/awk/sed/find/xargs, pipes and scripting"),
        ("go", "the Go language, covering slices, maps, goroutines, channels, interfaces, error handling and the standard library"),
        ("python", "Python programming, covering comprehensions, dicts, file handling, decorators, classes and the standard library"),
        ("mysql", "MySQL/SQL, covering SELECT, JOIN, GROUP BY, subqueries, indexes and transactions"),
        ("java", "Java programming, covering collections, multithreading, IO, lambdas and the Stream API"),
        ("cpp", "C++ programming, covering pointers, references, the STL, templates, memory management and smart pointers"),
        ("rust", "Rust programming, covering ownership, borrowing, lifetimes, traits, enums, pattern matching, error handling and concurrency"),
        ("typescript", "TypeScript programming, covering the type system, generics, interfaces, union types, decorators and Node.js backends"),
        ("javascript", "JavaScript programming, covering closures, prototypes, Promises, async/await, ES6+, DOM manipulation and the event loop"),
        ("kotlin", "Kotlin programming, covering null safety, data classes, sealed classes, coroutines, extension functions and functional style"),
        ("postgresql", "PostgreSQL, covering window functions, CTEs, JSONB, array types, full-text search, index tuning and transaction isolation"),
        ("redis", "Redis, covering the String/Hash/List/Set/ZSet structures, expiry, persistence, pub/sub, distributed locks and Lua scripting"),
        ("linux", "Linux administration, covering permissions, users, processes, systemd, networking, disks and log analysis"),
        ("git", "Git version control, covering branching, merge strategies, rebase, cherry-pick, conflict resolution, hooks and workflows"),
        ("docker", "Docker, covering Dockerfiles, multi-stage builds, docker-compose, networking, volumes and image optimization"),
        ("nginx", "Nginx configuration, covering server blocks, location matching, reverse proxying, load balancing, HTTPS, caching and rate limiting"),
        ("regex", "regular expressions, covering character classes, quantifiers, groups, lookarounds, greedy vs lazy matching and common patterns"),
        ("htmlcss", "HTML/CSS fundamentals, covering semantic markup, Flexbox, Grid, responsive design, CSS variables and animation"),
        ("network", "HTTP and networking, covering methods, status codes, headers, cookies, sessions, HTTPS, the TCP handshake, DNS and WebSockets"),
        ("algorithm", "data structures and algorithms, covering arrays, linked lists, stacks, queues, trees, graphs, sorting, binary search, DP and backtracking"),
    ])
});

/// Editor language tag for a subject, defaulting to `bash`.
pub fn editor_language(subject_id: &str) -> &'static str {
    SUBJECT_LANGUAGES.get(subject_id).copied().unwrap_or("bash")
}

/// Prompt description for a subject, if it is a known one.
pub fn subject_description(subject_id: &str) -> Option<&'static str> {
    SUBJECT_DESCRIPTIONS.get(subject_id).copied()
}
