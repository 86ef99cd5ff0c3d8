//! AI endpoints. Each handler forwards its body to the gateway and wraps the
//! parsed model output in the envelope.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument};

use crate::domain::{Explanation, GeneratedProblem, Hint, Quiz, SupplementaryMaterials, ValidationResult};
use crate::error::AppError;
use crate::protocol::{
    ApiJson, Envelope, ExplanationIn, GenerateProblemIn, HintIn, QuizIn, SupplementaryIn, ValidateSolutionIn,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate-problem", post(generate_problem))
        .route("/validate-solution", post(validate_solution))
        .route("/hint", post(hint))
        .route("/explanation", post(explanation))
        .route("/quiz", post(quiz))
        .route("/supplementary", post(supplementary))
}

#[instrument(level = "info", skip_all)]
async fn generate_problem(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<GenerateProblemIn>,
) -> Result<Json<Envelope<GeneratedProblem>>, AppError> {
    let generated = state.gateway.generate_problem(body).await?;
    info!(id = %generated.problem.id, "HTTP generate-problem served");
    Ok(Json(Envelope::ok(generated)))
}

#[instrument(level = "info", skip_all)]
async fn validate_solution(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ValidateSolutionIn>,
) -> Result<Json<Envelope<ValidationResult>>, AppError> {
    Ok(Json(Envelope::ok(state.gateway.validate_solution(body).await?)))
}

#[instrument(level = "info", skip_all)]
async fn hint(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<HintIn>,
) -> Result<Json<Envelope<Hint>>, AppError> {
    Ok(Json(Envelope::ok(state.gateway.hint(body).await?)))
}

#[instrument(level = "info", skip_all)]
async fn explanation(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ExplanationIn>,
) -> Result<Json<Envelope<Explanation>>, AppError> {
    Ok(Json(Envelope::ok(state.gateway.explanation(body).await?)))
}

#[instrument(level = "info", skip_all)]
async fn quiz(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<QuizIn>,
) -> Result<Json<Envelope<Quiz>>, AppError> {
    Ok(Json(Envelope::ok(state.gateway.quiz(body).await?)))
}

#[instrument(level = "info", skip_all)]
async fn supplementary(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<SupplementaryIn>,
) -> Result<Json<Envelope<SupplementaryMaterials>>, AppError> {
    Ok(Json(Envelope::ok(state.gateway.supplementary(body).await?)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::db::ProblemRepository;
    use crate::domain::{ProblemFilter, TestCase};
    use crate::openai::ProviderError;
    use crate::test_utils::TestApp;

    use super::*;

    async fn problem_count(app: &TestApp) -> usize {
        let all = ProblemFilter { difficulty: None, category: None, limit: 100, offset: 0 };
        app.state.problems.list(&all).await.unwrap().len()
    }

    #[tokio::test]
    async fn generate_problem_returns_stored_problem_with_extras() {
        let app = TestApp::new().await;
        app.model.reply(
            r#"{"title": "Two Sum", "description": "d", "category": "Arrays",
                "testCases": [{"input": "[1,2], 3", "output": "[0,1]"}],
                "hints": ["map"], "timeComplexity": "O(n)", "spaceComplexity": "O(n)"}"#,
        );

        let res = app
            .server
            .post("/api/ai/generate-problem")
            .json(&json!({ "topic": "hashing", "difficulty": "medium" }))
            .await;
        res.assert_status_ok();

        let env: Envelope<Value> = res.json();
        let data = env.data.unwrap();
        assert_eq!(data["title"], "Two Sum");
        assert_eq!(data["difficulty"], "medium");
        assert_eq!(data["hints"][0], "map");
        assert_eq!(data["spaceComplexity"], "O(n)");

        let id = data["id"].as_str().unwrap();
        let stored = app.state.problems.get(id).await.unwrap();
        assert_eq!(
            stored.test_cases,
            vec![TestCase { input: "[1,2], 3".into(), output: "[0,1]".into(), explanation: String::new() }]
        );
    }

    #[tokio::test]
    async fn non_json_generation_is_500_and_persists_nothing() {
        let app = TestApp::new().await;
        app.model.reply("I'm sorry, I can't do that.");

        let res = app
            .server
            .post("/api/ai/generate-problem")
            .json(&json!({ "topic": "graphs", "difficulty": "hard" }))
            .await;
        res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let env: Envelope<Value> = res.json();
        assert_eq!(env.error.as_deref(), Some("Invalid problem response from AI provider"));
        assert_eq!(problem_count(&app).await, 0);
    }

    #[tokio::test]
    async fn generate_problem_validates_before_calling_the_model() {
        let app = TestApp::new().await;
        let res = app.server.post("/api/ai/generate-problem").json(&json!({ "topic": "graphs" })).await;
        res.assert_status(StatusCode::BAD_REQUEST);
        let env: Envelope<Value> = res.json();
        assert_eq!(env.error.as_deref(), Some("Missing required fields"));
        assert!(app.model.calls().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_enveloped_500() {
        let app = TestApp::new().await;
        app.model.fail(ProviderError::NotConfigured);

        let res = app.server.post("/api/ai/quiz").json(&json!({})).await;
        res.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
        let env: Envelope<Value> = res.json();
        assert_eq!(env.error.as_deref(), Some("AI provider request failed"));
    }

    #[tokio::test]
    async fn validate_solution_for_unknown_problem_is_404() {
        let app = TestApp::new().await;
        let res = app
            .server
            .post("/api/ai/validate-solution")
            .json(&json!({ "problemId": "missing", "solutionCode": "return 1" }))
            .await;
        res.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn problem_keyed_endpoints_round_trip() {
        let app = TestApp::new().await;
        let created: Envelope<Value> = app
            .server
            .post("/api/problems")
            .json(&json!({
                "title": "Add", "description": "Add two numbers", "difficulty": "easy",
                "category": "math", "testCases": [{ "input": "1,2", "output": "3" }]
            }))
            .await
            .json();
        let id = created.data.unwrap()["id"].as_str().unwrap().to_string();

        app.model
            .reply(r#"{"isCorrect": true, "passedTests": 1, "totalTests": 1}"#)
            .reply(r#"{"hint": "Use +", "hintLevel": "subtle", "nextStep": "Return a + b"}"#)
            .reply("```json\n{\"explanation\": \"Add them\", \"keyConcepts\": [\"arithmetic\"]}\n```");

        let res = app
            .server
            .post("/api/ai/validate-solution")
            .json(&json!({ "problemId": id, "solutionCode": "return a + b" }))
            .await;
        res.assert_status_ok();
        let env: Envelope<ValidationResult> = res.json();
        assert!(env.data.unwrap().is_correct);

        let res = app.server.post("/api/ai/hint").json(&json!({ "problemId": id, "currentAttempt": "3" })).await;
        let env: Envelope<Hint> = res.json();
        assert_eq!(env.data.unwrap().next_step, "Return a + b");

        let res = app.server.post("/api/ai/explanation").json(&json!({ "problemId": id })).await;
        let env: Envelope<Explanation> = res.json();
        assert_eq!(env.data.unwrap().key_concepts, vec!["arithmetic".to_string()]);

        let calls = app.model.calls();
        let temps: Vec<f32> = calls.iter().map(|c| c.temperature).collect();
        assert_eq!(temps, vec![0.3, 0.5, 0.3]);
        assert!(calls[1].prompt.contains("attempt number 3"));
    }

    #[tokio::test]
    async fn quiz_and_supplementary() {
        let app = TestApp::new().await;
        app.model
            .reply(r#"{"questions": [{"question": "Big-O of binary search?", "options": ["O(n)", "O(log n)"], "correctAnswer": 1, "explanation": "halving"}]}"#)
            .reply(r#"{"resources": [{"type": "article", "title": "Tries", "description": "intro", "difficulty": "beginner"}], "keyTakeaways": ["prefixes"], "nextTopics": ["suffix trees"]}"#);

        let res = app.server.post("/api/ai/quiz").json(&json!({ "topic": "searching" })).await;
        res.assert_status_ok();
        let env: Envelope<Quiz> = res.json();
        assert_eq!(env.data.unwrap().questions[0].correct_answer, 1);

        let res = app
            .server
            .post("/api/ai/supplementary")
            .json(&json!({ "topic": "tries", "difficulty": "beginner" }))
            .await;
        res.assert_status_ok();
        let env: Envelope<Value> = res.json();
        let data = env.data.unwrap();
        assert_eq!(data["resources"][0]["type"], "article");
        assert_eq!(data["nextTopics"][0], "suffix trees");

        let temps: Vec<f32> = app.model.calls().iter().map(|c| c.temperature).collect();
        assert_eq!(temps, vec![0.7, 0.5]);
    }
}
