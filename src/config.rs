//! Runtime configuration: server/auth/provider settings from the environment
//! (optionally seeded from `.env`) and prompt templates, overridable from TOML.
//!
//! See `Settings` and `Prompts` for the expected variables and schema.

use std::{fmt, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{error, info, warn};

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_DATABASE_PATH: &str = "data/dsa_companion.db";
const DEV_JWT_SECRET: &str = "your-secret-key";
const DEFAULT_BCRYPT_COST: u32 = 12;
const TOKEN_TTL_DAYS: i64 = 7;
pub const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Clone, Debug)]
pub struct Settings {
  pub port: u16,
  pub database_path: PathBuf,
  pub auth: AuthSettings,
  /// None when OPENAI_API_KEY is not set.
  pub openai: Option<OpenAiSettings>,
  pub prompts: Prompts,
}

#[derive(Clone)]
pub struct AuthSettings {
  pub jwt_secret: String,
  pub token_ttl: chrono::Duration,
  pub bcrypt_cost: u32,
}

impl fmt::Debug for AuthSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("AuthSettings")
      .field("jwt_secret", &"<redacted>")
      .field("token_ttl", &self.token_ttl)
      .field("bcrypt_cost", &self.bcrypt_cost)
      .finish()
  }
}

#[derive(Clone)]
pub struct OpenAiSettings {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub timeout: Duration,
}

impl fmt::Debug for OpenAiSettings {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OpenAiSettings")
      .field("base_url", &self.base_url)
      .field("model", &self.model)
      .field("timeout", &self.timeout)
      .finish_non_exhaustive()
  }
}

impl Settings {
  /// Read every setting from the process environment.
  ///
  ///   SERVER_PORT / PORT  : u16 (default 5001)
  ///   DATABASE_PATH       : SQLite file (default "data/dsa_companion.db")
  ///   JWT_SECRET          : HS256 signing key (insecure dev default, warned)
  ///   BCRYPT_COST         : bcrypt work factor (default 12)
  ///   OPENAI_API_KEY      : enables the model provider
  ///   OPENAI_BASE_URL     : default "https://api.openai.com/v1"
  ///   OPENAI_MODEL        : default "gpt-4"
  ///   OPENAI_TIMEOUT_SECS : default 60
  ///   PROMPTS_CONFIG_PATH : optional TOML with a [prompts] table
  pub fn from_env() -> Self {
    let port = env_parse("SERVER_PORT")
      .or_else(|| env_parse("PORT"))
      .unwrap_or(DEFAULT_PORT);

    let database_path = std::env::var("DATABASE_PATH")
      .map(PathBuf::from)
      .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATABASE_PATH));

    let jwt_secret = match std::env::var("JWT_SECRET") {
      Ok(s) if !s.is_empty() => s,
      _ => {
        warn!(target: "dsa_companion", "JWT_SECRET not set; using the insecure development key");
        DEV_JWT_SECRET.to_string()
      }
    };

    let auth = AuthSettings {
      jwt_secret,
      token_ttl: chrono::Duration::days(TOKEN_TTL_DAYS),
      bcrypt_cost: env_parse("BCRYPT_COST").unwrap_or(DEFAULT_BCRYPT_COST),
    };

    let openai = std::env::var("OPENAI_API_KEY")
      .ok()
      .filter(|k| !k.is_empty())
      .map(|api_key| OpenAiSettings {
        api_key,
        base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into()),
        model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into()),
        timeout: Duration::from_secs(env_parse("OPENAI_TIMEOUT_SECS").unwrap_or(60)),
      });

    let prompts = load_prompt_config_from_env()
      .map(|c| c.prompts)
      .unwrap_or_default();

    Self { port, database_path, auth, openai, prompts }
  }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
  let raw = std::env::var(key).ok()?;
  match raw.trim().parse::<T>() {
    Ok(v) => Some(v),
    Err(_) => {
      warn!(target: "dsa_companion", %key, value = %raw, "Ignoring unparseable environment variable");
      None
    }
  }
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptConfig {
  #[serde(default)]
  pub prompts: Prompts,
}

/// Prompt templates sent to the model provider, one per AI operation.
/// Placeholders are `{name}`; every template ends with the JSON shape the
/// response must follow. Any subset can be overridden from TOML.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// {difficulty}, {topic}, {category}
  pub generate_problem: String,
  /// {language}, {description}, {solution_code}, {test_cases}
  pub validate_solution: String,
  /// {attempt}, {description}, {difficulty}, {category}
  pub hint: String,
  /// {description}, {solution_section}
  pub explanation: String,
  /// {topic}
  pub quiz: String,
  /// {topic}, {difficulty}
  pub supplementary: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generate_problem: r#"Generate a {difficulty} difficulty Data Structures and Algorithms problem about {topic}.
The response should be in JSON format with the following structure:
{
  "title": "Problem Title",
  "description": "Detailed problem description with examples",
  "difficulty": "{difficulty}",
  "category": "{category}",
  "testCases": [
    {
      "input": "input description",
      "output": "expected output",
      "explanation": "brief explanation"
    }
  ],
  "solutionTemplate": "function solution(input) { // TODO: implement solution }",
  "hints": ["hint 1", "hint 2"],
  "timeComplexity": "O(n)",
  "spaceComplexity": "O(1)"
}"#.into(),
      validate_solution: r#"Validate this {language} solution for the following problem:

Problem: {description}

Solution Code:
{solution_code}

Test Cases:
{test_cases}

Please analyze the solution and provide a JSON response with:
{
  "isCorrect": true/false,
  "passedTests": number,
  "totalTests": number,
  "errors": ["error1", "error2"],
  "suggestions": ["suggestion1", "suggestion2"],
  "timeComplexity": "O(n)",
  "spaceComplexity": "O(1)",
  "canBeOptimized": true/false,
  "optimizationHints": ["hint1", "hint2"]
}"#.into(),
      hint: r#"Provide a helpful hint for this problem. This is attempt number {attempt}, so adjust the hint accordingly:

Problem: {description}
Difficulty: {difficulty}
Category: {category}

Provide a JSON response with:
{
  "hint": "specific hint text",
  "hintLevel": "subtle|moderate|detailed",
  "nextStep": "what the user should try next"
}"#.into(),
      explanation: r#"Provide a detailed explanation for this problem:

Problem: {description}
{solution_section}

Provide a JSON response with:
{
  "explanation": "detailed step-by-step explanation",
  "keyConcepts": ["concept1", "concept2"],
  "algorithm": "algorithm description",
  "timeComplexity": "O(n) explanation",
  "spaceComplexity": "O(1) explanation",
  "examples": ["example1", "example2"]
}"#.into(),
      quiz: r#"Generate a quiz about {topic} with 5 multiple choice questions.
The response should be in JSON format:
{
  "questions": [
    {
      "question": "Question text",
      "options": ["A", "B", "C", "D"],
      "correctAnswer": 0,
      "explanation": "Why this is correct"
    }
  ]
}"#.into(),
      supplementary: r#"Provide supplementary learning materials for {topic} at {difficulty} level.
The response should be in JSON format:
{
  "resources": [
    {
      "type": "article|video|book|practice",
      "title": "Resource title",
      "description": "Brief description",
      "url": "resource URL if applicable",
      "difficulty": "beginner|intermediate|advanced"
    }
  ],
  "keyTakeaways": ["takeaway1", "takeaway2"],
  "nextTopics": ["topic1", "topic2"]
}"#.into(),
    }
  }
}

/// Attempt to load `PromptConfig` from PROMPTS_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_prompt_config_from_env() -> Option<PromptConfig> {
  let path = std::env::var("PROMPTS_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_prompt_config(&s) {
      Ok(cfg) => {
        info!(target: "dsa_companion", %path, "Loaded prompt config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "dsa_companion", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "dsa_companion", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_prompt_config(s: &str) -> Result<PromptConfig, toml::de::Error> {
  toml::from_str::<PromptConfig>(s)
}
