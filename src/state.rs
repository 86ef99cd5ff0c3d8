//! Application state shared by every handler: repositories, the AI gateway,
//! auth settings and the process start time used by `/health`.

use std::{sync::Arc, time::Instant};

use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::config::{AuthSettings, Prompts};
use crate::db::{ProblemRepository, SqliteProblems, SqliteUsers, UserRepository};
use crate::gateway::AiGateway;
use crate::judge::ModelJudge;
use crate::openai::ChatModel;

pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub problems: Arc<dyn ProblemRepository>,
    pub gateway: Arc<AiGateway>,
    pub auth: AuthSettings,
    pub started_at: Instant,
}

impl AppState {
    /// Wire the SQLite repositories and the model-backed gateway together.
    #[instrument(level = "info", skip_all, fields(%model_name))]
    pub fn new(
        pool: SqlitePool,
        model: Arc<dyn ChatModel>,
        model_name: String,
        prompts: Prompts,
        auth: AuthSettings,
    ) -> Self {
        let users: Arc<dyn UserRepository> = Arc::new(SqliteUsers::new(pool.clone()));
        let problems: Arc<dyn ProblemRepository> = Arc::new(SqliteProblems::new(pool));
        let prompts = Arc::new(prompts);

        let judge = Arc::new(ModelJudge {
            model: model.clone(),
            model_name: model_name.clone(),
            prompts: prompts.clone(),
        });
        let gateway = Arc::new(AiGateway {
            model,
            model_name,
            prompts,
            problems: problems.clone(),
            judge,
        });

        info!("Application state ready");
        Self { users, problems, gateway, auth, started_at: Instant::now() }
    }
}
