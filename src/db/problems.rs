use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Difficulty, NewProblem, Problem, ProblemFilter, ProblemPatch, TestCase};
use crate::error::AppError;

const COLUMNS: &str =
    "id, title, description, difficulty, category, test_cases, solution_template, created_at, updated_at";

#[async_trait]
pub trait ProblemRepository: Send + Sync {
    /// Conjunctive equality filters, newest first, paginated. Empty when nothing matches.
    async fn list(&self, filter: &ProblemFilter) -> Result<Vec<Problem>, AppError>;
    async fn get(&self, id: &str) -> Result<Problem, AppError>;
    async fn create(&self, new: NewProblem) -> Result<Problem, AppError>;
    /// Fails with Validation on an empty patch and NotFound when no row matched.
    async fn update(&self, id: &str, patch: &ProblemPatch) -> Result<(), AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[derive(sqlx::FromRow)]
struct ProblemRow {
    id: String,
    title: String,
    description: String,
    difficulty: String,
    category: String,
    test_cases: String,
    solution_template: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProblemRow> for Problem {
    type Error = AppError;

    fn try_from(row: ProblemRow) -> Result<Self, Self::Error> {
        let difficulty = row.difficulty.parse::<Difficulty>().map_err(|e| {
            AppError::DataCorruption(format!("problem {}: {e}", row.id))
        })?;
        let test_cases = serde_json::from_str::<Vec<TestCase>>(&row.test_cases).map_err(|e| {
            AppError::DataCorruption(format!("problem {}: test_cases: {e}", row.id))
        })?;

        Ok(Problem {
            id: row.id,
            title: row.title,
            description: row.description,
            difficulty,
            category: row.category,
            test_cases,
            solution_template: row.solution_template,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn encode_test_cases(test_cases: &[TestCase]) -> Result<String, AppError> {
    serde_json::to_string(test_cases)
        .map_err(|e| AppError::Internal(format!("serialize test cases: {e}")))
}

fn not_found() -> AppError {
    AppError::NotFound("Problem not found".to_string())
}

#[derive(Clone)]
pub struct SqliteProblems {
    pool: SqlitePool,
}

impl SqliteProblems {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProblemRepository for SqliteProblems {
    #[instrument(skip(self))]
    async fn list(&self, filter: &ProblemFilter) -> Result<Vec<Problem>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM problems WHERE 1=1"));
        if let Some(difficulty) = filter.difficulty {
            qb.push(" AND difficulty = ").push_bind(difficulty.as_str());
        }
        if let Some(category) = &filter.category {
            qb.push(" AND category = ").push_bind(category.clone());
        }
        // rowid breaks ties between rows created within the same instant
        qb.push(" ORDER BY created_at DESC, rowid DESC LIMIT ")
            .push_bind(filter.limit)
            .push(" OFFSET ")
            .push_bind(filter.offset);

        let rows: Vec<ProblemRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        info!(count = rows.len(), "Listed problems");
        rows.into_iter().map(Problem::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<Problem, AppError> {
        let row = sqlx::query_as::<_, ProblemRow>(&format!("SELECT {COLUMNS} FROM problems WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Problem::try_from(row),
            None => Err(not_found()),
        }
    }

    #[instrument(skip(self, new), fields(title = %new.title, difficulty = %new.difficulty))]
    async fn create(&self, new: NewProblem) -> Result<Problem, AppError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let test_cases = encode_test_cases(&new.test_cases)?;

        sqlx::query(
            "INSERT INTO problems
             (id, title, description, difficulty, category, test_cases, solution_template, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.difficulty.as_str())
        .bind(&new.category)
        .bind(&test_cases)
        .bind(&new.solution_template)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(%id, "Created problem");
        Ok(Problem {
            id,
            title: new.title,
            description: new.description,
            difficulty: new.difficulty,
            category: new.category,
            test_cases: new.test_cases,
            solution_template: new.solution_template,
            created_at: now,
            updated_at: now,
        })
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: &ProblemPatch) -> Result<(), AppError> {
        if patch.is_empty() {
            return Err(AppError::Validation("No fields to update".to_string()));
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE problems SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(title) = &patch.title {
                set.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(description) = &patch.description {
                set.push("description = ").push_bind_unseparated(description.clone());
            }
            if let Some(difficulty) = patch.difficulty {
                set.push("difficulty = ").push_bind_unseparated(difficulty.as_str());
            }
            if let Some(category) = &patch.category {
                set.push("category = ").push_bind_unseparated(category.clone());
            }
            if let Some(test_cases) = &patch.test_cases {
                set.push("test_cases = ").push_bind_unseparated(encode_test_cases(test_cases)?);
            }
            if let Some(template) = &patch.solution_template {
                set.push("solution_template = ").push_bind_unseparated(template.clone());
            }
            set.push("updated_at = ").push_bind_unseparated(Utc::now());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        info!("Updated problem");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM problems WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_found());
        }
        info!("Deleted problem");
        Ok(())
    }
}
