use serde::Deserialize;
use tracing::debug;

use crate::models::user::{DashboardStats, UserProfile, UserRecord};

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsInput {
    pub username: String,
    pub password: String,
}

pub async fn users_register(state: &AppState, input: CredentialsInput) -> CommandResult<UserRecord> {
    let service = state.users();
    run_blocking(move || service.register(&input.username, &input.password)).await
}

pub async fn users_login(state: &AppState, input: CredentialsInput) -> CommandResult<UserRecord> {
    let service = state.users();
    run_blocking(move || service.authenticate(&input.username, &input.password)).await
}

pub async fn users_profile(state: &AppState, user_id: String) -> CommandResult<UserProfile> {
    debug!(target: "app::users", %user_id, "profile requested");
    let service = state.users();
    run_blocking(move || service.profile(&user_id)).await
}

/// Generates today's daily quests on the way, as the dashboard is the
/// landing view after login.
pub async fn users_dashboard(state: &AppState, user_id: String) -> CommandResult<DashboardStats> {
    let users = state.users();
    let daily = state.daily_quests();
    run_blocking(move || {
        daily.ensure_daily_quests(&user_id, daily.today())?;
        users.dashboard(&user_id)
    })
    .await
}
