//! Verdicts on submitted solutions.
//!
//! Nothing is compiled or executed here: the default judge hands the problem,
//! its test cases and the submitted code to the model and trusts its answer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use crate::config::Prompts;
use crate::domain::{Problem, ValidationResult};
use crate::error::AppError;
use crate::gateway::ask_json;
use crate::openai::ChatModel;
use crate::util::fill_template;

const VALIDATE_TEMPERATURE: f32 = 0.3;

#[async_trait]
pub trait SolutionJudge: Send + Sync {
  async fn judge(&self, problem: &Problem, code: &str, language: &str) -> Result<ValidationResult, AppError>;
}

pub struct ModelJudge {
  pub model: Arc<dyn ChatModel>,
  pub model_name: String,
  pub prompts: Arc<Prompts>,
}

#[async_trait]
impl SolutionJudge for ModelJudge {
  #[instrument(level = "info", skip(self, problem, code), fields(problem_id = %problem.id, code_len = code.len(), %language))]
  async fn judge(&self, problem: &Problem, code: &str, language: &str) -> Result<ValidationResult, AppError> {
    let test_cases = serde_json::to_string_pretty(&problem.test_cases)
      .map_err(|e| AppError::Internal(format!("serialize test cases: {e}")))?;

    let prompt = fill_template(&self.prompts.validate_solution, &[
      ("language", language),
      ("description", problem.description.as_str()),
      ("solution_code", code),
      ("test_cases", test_cases.as_str()),
    ]);

    ask_json(self.model.as_ref(), &self.model_name, "validation", &prompt, VALIDATE_TEMPERATURE).await
  }
}
