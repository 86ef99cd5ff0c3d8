//! Problem CRUD endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use crate::domain::{Difficulty, NewProblem, Problem, ProblemFilter, ProblemPatch};
use crate::error::AppError;
use crate::protocol::{ApiJson, ApiQuery, Envelope, Pagination, ProblemIn, ProblemListQuery, ProblemUpdateIn};
use crate::state::AppState;
use crate::util::non_blank;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 100;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_problems).post(create_problem))
        .route("/{id}", get(get_problem).put(update_problem).delete(delete_problem))
}

fn parse_difficulty(raw: Option<&str>) -> Result<Option<Difficulty>, AppError> {
    non_blank(raw)
        .map(|d| d.parse::<Difficulty>().map_err(AppError::Validation))
        .transpose()
}

fn parse_int(name: &str, raw: Option<&str>) -> Result<Option<i64>, AppError> {
    non_blank(raw)
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| AppError::Validation(format!("Invalid {name}: expected an integer")))
        })
        .transpose()
}

impl TryFrom<ProblemListQuery> for ProblemFilter {
    type Error = AppError;

    fn try_from(q: ProblemListQuery) -> Result<Self, Self::Error> {
        Ok(ProblemFilter {
            difficulty: parse_difficulty(q.difficulty.as_deref())?,
            category: non_blank(q.category.as_deref()),
            limit: parse_int("limit", q.limit.as_deref())?
                .unwrap_or(DEFAULT_LIMIT)
                .clamp(1, MAX_LIMIT),
            offset: parse_int("offset", q.offset.as_deref())?.unwrap_or(0).max(0),
        })
    }
}

#[instrument(level = "info", skip(state))]
async fn list_problems(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ProblemListQuery>,
) -> Result<Json<Envelope<Vec<Problem>>>, AppError> {
    let filter = ProblemFilter::try_from(query)?;
    let problems = state.problems.list(&filter).await?;
    Ok(Json(Envelope::paginated(
        problems,
        Pagination { limit: filter.limit, offset: filter.offset },
    )))
}

#[instrument(level = "info", skip(state))]
async fn get_problem(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Problem>>, AppError> {
    let problem = state.problems.get(&id).await?;
    Ok(Json(Envelope::ok(problem)))
}

#[instrument(level = "info", skip(state, body), fields(title = ?body.title))]
async fn create_problem(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<ProblemIn>,
) -> Result<(StatusCode, Json<Envelope<Problem>>), AppError> {
    let (Some(title), Some(description), Some(difficulty), Some(category), Some(test_cases)) = (
        non_blank(body.title.as_deref()),
        non_blank(body.description.as_deref()),
        non_blank(body.difficulty.as_deref()),
        non_blank(body.category.as_deref()),
        body.test_cases,
    ) else {
        return Err(AppError::Validation("Missing required fields".to_string()));
    };
    let difficulty = difficulty.parse::<Difficulty>().map_err(AppError::Validation)?;

    let problem = state
        .problems
        .create(NewProblem {
            title,
            description,
            difficulty,
            category,
            test_cases,
            solution_template: body.solution_template,
        })
        .await?;

    info!(id = %problem.id, "Problem created");
    Ok((StatusCode::CREATED, Json(Envelope::ok(problem))))
}

#[instrument(level = "info", skip(state, body))]
async fn update_problem(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProblemUpdateIn>,
) -> Result<Json<Envelope<()>>, AppError> {
    let patch = ProblemPatch {
        title: non_blank(body.title.as_deref()),
        description: non_blank(body.description.as_deref()),
        difficulty: parse_difficulty(body.difficulty.as_deref())?,
        category: non_blank(body.category.as_deref()),
        test_cases: body.test_cases,
        solution_template: body.solution_template,
    };

    state.problems.update(&id, &patch).await?;
    Ok(Json(Envelope::message("Problem updated successfully")))
}

#[instrument(level = "info", skip(state))]
async fn delete_problem(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<()>>, AppError> {
    state.problems.delete(&id).await?;
    Ok(Json(Envelope::message("Problem deleted successfully")))
}
