//! AI-backed operations: problem generation, solution review, hints,
//! explanations, quizzes and study material.
//!
//! Every operation renders one prompt template, makes one completion call and
//! parses the reply as JSON into a typed shape. Generated problems are stored
//! before they are returned; nothing is stored when the reply does not parse.

use std::{sync::Arc, time::Instant};

use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::config::Prompts;
use crate::db::ProblemRepository;
use crate::domain::{
  Difficulty, Explanation, GeneratedProblem, Hint, NewProblem, Problem, ProblemDraft, Quiz,
  SupplementaryMaterials, ValidationResult,
};
use crate::error::AppError;
use crate::judge::SolutionJudge;
use crate::openai::{ChatModel, Completion};
use crate::protocol::{ExplanationIn, GenerateProblemIn, HintIn, QuizIn, SupplementaryIn, ValidateSolutionIn};
use crate::util::{fill_template, non_blank, strip_code_fence, trunc_for_log};

const GENERATE_TEMPERATURE: f32 = 0.7;
const HINT_TEMPERATURE: f32 = 0.5;
const EXPLANATION_TEMPERATURE: f32 = 0.3;
const QUIZ_TEMPERATURE: f32 = 0.7;
const SUPPLEMENTARY_TEMPERATURE: f32 = 0.5;

const DEFAULT_LANGUAGE: &str = "javascript";
const DEFAULT_QUIZ_TOPIC: &str = "Data Structures and Algorithms";
const DEFAULT_CATEGORY: &str = "General";

pub struct AiGateway {
  pub model: Arc<dyn ChatModel>,
  pub model_name: String,
  pub prompts: Arc<Prompts>,
  pub problems: Arc<dyn ProblemRepository>,
  pub judge: Arc<dyn SolutionJudge>,
}

impl AiGateway {
  #[instrument(level = "info", skip(self, req), fields(topic = ?req.topic, difficulty = ?req.difficulty))]
  pub async fn generate_problem(&self, req: GenerateProblemIn) -> Result<GeneratedProblem, AppError> {
    let (Some(topic), Some(difficulty)) = (non_blank(req.topic.as_deref()), non_blank(req.difficulty.as_deref())) else {
      return Err(missing_fields());
    };
    let difficulty: Difficulty = difficulty.parse().map_err(AppError::Validation)?;
    let requested_category = non_blank(req.category.as_deref());

    let prompt = fill_template(&self.prompts.generate_problem, &[
      ("difficulty", difficulty.as_str()),
      ("topic", topic.as_str()),
      ("category", requested_category.as_deref().unwrap_or(DEFAULT_CATEGORY)),
    ]);
    let draft: ProblemDraft = self.ask("problem", &prompt, GENERATE_TEMPERATURE).await?;

    let category = non_blank(draft.category.as_deref())
      .or(requested_category)
      .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

    let problem = self.problems.create(NewProblem {
      title: draft.title,
      description: draft.description,
      difficulty,
      category,
      test_cases: draft.test_cases,
      solution_template: draft.solution_template,
    }).await?;

    info!(id = %problem.id, "Generated problem stored");
    Ok(GeneratedProblem {
      problem,
      hints: draft.hints,
      time_complexity: draft.time_complexity,
      space_complexity: draft.space_complexity,
    })
  }

  #[instrument(level = "info", skip(self, req), fields(problem_id = ?req.problem_id))]
  pub async fn validate_solution(&self, req: ValidateSolutionIn) -> Result<ValidationResult, AppError> {
    let (Some(problem_id), Some(code)) = (non_blank(req.problem_id.as_deref()), non_blank(req.solution_code.as_deref())) else {
      return Err(missing_fields());
    };
    let language = non_blank(req.language.as_deref()).unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let problem = self.problems.get(&problem_id).await?;
    let verdict = self.judge.judge(&problem, &code, &language).await?;
    info!(is_correct = verdict.is_correct, passed = verdict.passed_tests, total = verdict.total_tests, "Solution judged");
    Ok(verdict)
  }

  #[instrument(level = "info", skip(self, req), fields(problem_id = ?req.problem_id, attempt = ?req.current_attempt))]
  pub async fn hint(&self, req: HintIn) -> Result<Hint, AppError> {
    let problem = self.problem_for(req.problem_id.as_deref()).await?;
    let attempt = non_blank(req.current_attempt.as_deref()).unwrap_or_else(|| "1".to_string());

    let prompt = fill_template(&self.prompts.hint, &[
      ("attempt", attempt.as_str()),
      ("description", problem.description.as_str()),
      ("difficulty", problem.difficulty.as_str()),
      ("category", problem.category.as_str()),
    ]);
    self.ask("hint", &prompt, HINT_TEMPERATURE).await
  }

  #[instrument(level = "info", skip(self, req), fields(problem_id = ?req.problem_id))]
  pub async fn explanation(&self, req: ExplanationIn) -> Result<Explanation, AppError> {
    let problem = self.problem_for(req.problem_id.as_deref()).await?;
    let solution_section = non_blank(req.solution_code.as_deref())
      .map(|code| format!("Solution: {code}"))
      .unwrap_or_default();

    let prompt = fill_template(&self.prompts.explanation, &[
      ("description", problem.description.as_str()),
      ("solution_section", solution_section.as_str()),
    ]);
    self.ask("explanation", &prompt, EXPLANATION_TEMPERATURE).await
  }

  #[instrument(level = "info", skip(self, req), fields(topic = ?req.topic))]
  pub async fn quiz(&self, req: QuizIn) -> Result<Quiz, AppError> {
    let topic = non_blank(req.topic.as_deref()).unwrap_or_else(|| DEFAULT_QUIZ_TOPIC.to_string());
    let prompt = fill_template(&self.prompts.quiz, &[("topic", topic.as_str())]);
    self.ask("quiz", &prompt, QUIZ_TEMPERATURE).await
  }

  #[instrument(level = "info", skip(self, req), fields(topic = ?req.topic, difficulty = ?req.difficulty))]
  pub async fn supplementary(&self, req: SupplementaryIn) -> Result<SupplementaryMaterials, AppError> {
    let (Some(topic), Some(difficulty)) = (non_blank(req.topic.as_deref()), non_blank(req.difficulty.as_deref())) else {
      return Err(missing_fields());
    };
    let prompt = fill_template(&self.prompts.supplementary, &[("topic", topic.as_str()), ("difficulty", difficulty.as_str())]);
    self.ask("materials", &prompt, SUPPLEMENTARY_TEMPERATURE).await
  }

  async fn problem_for(&self, id: Option<&str>) -> Result<Problem, AppError> {
    let id = non_blank(id).ok_or_else(|| AppError::Validation("Missing problem ID".to_string()))?;
    self.problems.get(&id).await
  }

  async fn ask<T: DeserializeOwned>(&self, operation: &'static str, prompt: &str, temperature: f32) -> Result<T, AppError> {
    ask_json(self.model.as_ref(), &self.model_name, operation, prompt, temperature).await
  }
}

fn missing_fields() -> AppError {
  AppError::Validation("Missing required fields".to_string())
}

/// One completion call whose reply must be a JSON document of shape `T`.
/// A single surrounding code fence is tolerated.
pub(crate) async fn ask_json<T: DeserializeOwned>(
  model: &dyn ChatModel,
  model_name: &str,
  operation: &'static str,
  prompt: &str,
  temperature: f32,
) -> Result<T, AppError> {
  let start = Instant::now();
  let text = model.complete(Completion { model: model_name, prompt, temperature }).await?;
  debug!(%operation, elapsed = ?start.elapsed(), response = %trunc_for_log(&text, 200), "Model replied");

  serde_json::from_str::<T>(strip_code_fence(&text)).map_err(|e| {
    warn!(%operation, error = %e, preview = %trunc_for_log(&text, 200), "Unparseable model reply");
    AppError::UpstreamFormat { operation, detail: e.to_string() }
  })
}
