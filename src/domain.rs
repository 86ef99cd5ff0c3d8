//! Domain models used by the backend: users, problems, and the transient
//! shapes the AI gateway parses out of model output.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Problem difficulty. Stored lowercase in the `problems.difficulty` column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
  Easy,
  Medium,
  Hard,
}

impl Difficulty {
  pub fn as_str(&self) -> &'static str {
    match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Difficulty {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "easy" => Ok(Difficulty::Easy),
      "medium" => Ok(Difficulty::Medium),
      "hard" => Ok(Difficulty::Hard),
      other => Err(format!("Invalid difficulty '{other}': expected easy, medium or hard")),
    }
  }
}

/// One example input/output pair attached to a problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
  #[serde(deserialize_with = "lenient_string")]
  pub input: String,
  #[serde(deserialize_with = "lenient_string")]
  pub output: String,
  #[serde(default, deserialize_with = "lenient_string")]
  pub explanation: String,
}

/// A persisted practice problem.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
  pub id: String,
  pub title: String,
  pub description: String,
  pub difficulty: Difficulty,
  pub category: String,
  pub test_cases: Vec<TestCase>,
  pub solution_template: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Fields needed to insert a new problem.
#[derive(Clone, Debug)]
pub struct NewProblem {
  pub title: String,
  pub description: String,
  pub difficulty: Difficulty,
  pub category: String,
  pub test_cases: Vec<TestCase>,
  pub solution_template: Option<String>,
}

/// Partial update. `None` leaves a column untouched; `solution_template: Some(None)` clears it.
#[derive(Clone, Debug, Default)]
pub struct ProblemPatch {
  pub title: Option<String>,
  pub description: Option<String>,
  pub difficulty: Option<Difficulty>,
  pub category: Option<String>,
  pub test_cases: Option<Vec<TestCase>>,
  pub solution_template: Option<Option<String>>,
}

impl ProblemPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.difficulty.is_none()
      && self.category.is_none()
      && self.test_cases.is_none()
      && self.solution_template.is_none()
  }
}

/// Equality filters and pagination for problem listing.
#[derive(Clone, Debug)]
pub struct ProblemFilter {
  pub difficulty: Option<Difficulty>,
  pub category: Option<String>,
  pub limit: i64,
  pub offset: i64,
}

/// Account row. The hash never leaves the server; see `UserProfile`.
#[derive(Clone, Debug)]
pub struct User {
  pub id: String,
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
}

#[derive(Clone, Debug, Default)]
pub struct ProfilePatch {
  pub username: Option<String>,
  pub email: Option<String>,
}

impl ProfilePatch {
  pub fn is_empty(&self) -> bool {
    self.username.is_none() && self.email.is_none()
  }
}

/// Public projection of a user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
  pub id: String,
  pub username: String,
  pub email: String,
  pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
  fn from(u: &User) -> Self {
    Self {
      id: u.id.clone(),
      username: u.username.clone(),
      email: u.email.clone(),
      created_at: u.created_at,
    }
  }
}

//
// Shapes parsed from model output
//

/// What the model returns for a generation request, before it is persisted.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDraft {
  pub title: String,
  pub description: String,
  #[serde(default)] pub category: Option<String>,
  pub test_cases: Vec<TestCase>,
  #[serde(default)] pub solution_template: Option<String>,
  #[serde(default)] pub hints: Vec<String>,
  #[serde(default)] pub time_complexity: Option<String>,
  #[serde(default)] pub space_complexity: Option<String>,
}

/// A freshly generated problem: the stored row plus the model's extras.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProblem {
  #[serde(flatten)]
  pub problem: Problem,
  pub hints: Vec<String>,
  pub time_complexity: Option<String>,
  pub space_complexity: Option<String>,
}

/// Model verdict on a submitted solution. Nothing here is checked locally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
  pub is_correct: bool,
  #[serde(default)] pub passed_tests: u32,
  #[serde(default)] pub total_tests: u32,
  #[serde(default)] pub errors: Vec<String>,
  #[serde(default)] pub suggestions: Vec<String>,
  #[serde(default)] pub time_complexity: String,
  #[serde(default)] pub space_complexity: String,
  #[serde(default)] pub can_be_optimized: bool,
  #[serde(default)] pub optimization_hints: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
  pub hint: String,
  #[serde(default)] pub hint_level: String,
  #[serde(default)] pub next_step: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Explanation {
  pub explanation: String,
  #[serde(default)] pub key_concepts: Vec<String>,
  #[serde(default)] pub algorithm: String,
  #[serde(default)] pub time_complexity: String,
  #[serde(default)] pub space_complexity: String,
  #[serde(default, deserialize_with = "lenient_strings")]
  pub examples: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
  pub questions: Vec<QuizQuestion>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub question: String,
  pub options: Vec<String>,
  pub correct_answer: u32,
  #[serde(default)] pub explanation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementaryMaterials {
  #[serde(default)] pub resources: Vec<Resource>,
  #[serde(default)] pub key_takeaways: Vec<String>,
  #[serde(default)] pub next_topics: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
  #[serde(rename = "type", default)]
  pub kind: String,
  pub title: String,
  #[serde(default)] pub description: String,
  #[serde(default)] pub url: Option<String>,
  #[serde(default)] pub difficulty: String,
}

/// Models sometimes emit numbers or arrays where we expect text
/// (e.g. `"input": [1, 2]`). Keep the JSON rendering instead of failing.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  Ok(value_to_text(serde_json::Value::deserialize(d)?))
}

fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
  let items = Vec::<serde_json::Value>::deserialize(d)?;
  Ok(items.into_iter().map(value_to_text).collect())
}

fn value_to_text(v: serde_json::Value) -> String {
  match v {
    serde_json::Value::String(s) => s,
    serde_json::Value::Null => String::new(),
    other => other.to_string(),
  }
}
