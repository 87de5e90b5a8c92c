pub mod daily;
pub mod description;
pub mod quest;
pub mod user;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::daily_quest_service::DailyQuestService;
use crate::services::description_service::DescriptionService;
use crate::services::progression_engine::ProgressionEngine;
use crate::services::quest_service::QuestService;
use crate::services::user_service::UserService;
use crate::utils::clock::{SharedClock, SystemClock};

#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    quest_service: Arc<QuestService>,
    user_service: Arc<UserService>,
    daily_quest_service: Arc<DailyQuestService>,
    description_service: Arc<DescriptionService>,
}

impl AppState {
    /// Wires services without side effects beyond opening the database.
    pub fn new(db_pool: DbPool, config: &AppConfig, clock: SharedClock) -> AppResult<Self> {
        let engine = ProgressionEngine::new(config.timezone);

        let quest_service = Arc::new(QuestService::new(
            db_pool.clone(),
            Arc::clone(&clock),
            engine,
        ));
        let user_service = Arc::new(UserService::new(
            db_pool.clone(),
            Arc::clone(&clock),
            engine,
        ));
        let daily_quest_service = Arc::new(DailyQuestService::new(
            db_pool.clone(),
            Arc::clone(&clock),
            config.timezone,
        ));
        let description_service = Arc::new(DescriptionService::from_config(&config.gemini)?);

        Ok(Self {
            db_pool,
            quest_service,
            user_service,
            daily_quest_service,
            description_service,
        })
    }

    /// Opens the configured database, seeds the demo account when enabled
    /// and starts the weekly points reset job.
    pub fn initialize(config: &AppConfig) -> AppResult<Self> {
        let db_pool = DbPool::new(config.db_path())?;
        let state = Self::new(db_pool, config, Arc::new(SystemClock))?;

        if config.seed_demo_user {
            state.user_service.ensure_demo_user()?;
        }
        state.user_service.ensure_weekly_reset_job()?;

        info!(
            target: "app::startup",
            db_path = %state.db_pool.path().display(),
            timezone = %config.timezone,
            ai_enabled = state.description_service.is_enabled(),
            "application state ready"
        );
        Ok(state)
    }

    pub fn quests(&self) -> Arc<QuestService> {
        Arc::clone(&self.quest_service)
    }

    pub fn users(&self) -> Arc<UserService> {
        Arc::clone(&self.user_service)
    }

    pub fn daily_quests(&self) -> Arc<DailyQuestService> {
        Arc::clone(&self.daily_quest_service)
    }

    pub fn descriptions(&self) -> Arc<DescriptionService> {
        Arc::clone(&self.description_service)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl CommandError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CommandError {}

impl From<AppError> for CommandError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => CommandError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => {
                CommandError::new("NOT_FOUND", "The requested resource does not exist", None)
            }
            AppError::Unauthorized => CommandError::new(
                "UNAUTHORIZED",
                "You are not allowed to perform this action",
                None,
            ),
            AppError::Conflict { message } => CommandError::new("CONFLICT", message, None),
            AppError::InvalidReward { reward } => {
                warn!(target: "app::command", reward, "invalid reward in command");
                CommandError::new(
                    "INVALID_REWARD",
                    format!("Reward must be a positive number of points, got {reward}"),
                    Some(serde_json::json!({ "reward": reward })),
                )
            }
            AppError::Ai { code, message } => CommandError::new(code.as_str(), message, None),
            AppError::Database { message } => {
                error!(target: "app::command", %message, "database error in command");
                CommandError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::command", error = %error, "serialization error in command");
                CommandError::new("UNKNOWN", "Serialization failed", None)
            }
            AppError::Io(error) => {
                error!(target: "app::command", error = %error, "io error in command");
                CommandError::new("UNKNOWN", "File system access failed", None)
            }
            AppError::Other(message) => {
                error!(target: "app::command", %message, "unexpected error in command");
                CommandError::new("UNKNOWN", message, None)
            }
        }
    }
}

pub(crate) async fn run_blocking<T: Send + 'static>(
    task: impl FnOnce() -> Result<T, AppError> + Send + 'static,
) -> CommandResult<T> {
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| CommandError::new("UNKNOWN", format!("background task failed: {err}"), None))?
        .map_err(CommandError::from)
}
