use serde::Deserialize;
use tracing::debug;

use crate::models::quest::{QuestCompletionResult, QuestCreateInput, QuestRecord, QuestUpdateInput};

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QuestListKind {
    #[default]
    Active,
    Completed,
    Daily,
}

pub async fn quests_list(
    state: &AppState,
    user_id: String,
    kind: Option<QuestListKind>,
) -> CommandResult<Vec<QuestRecord>> {
    let kind = kind.unwrap_or_default();
    let quests = state.quests();
    let daily = state.daily_quests();

    let records = run_blocking(move || match kind {
        QuestListKind::Active => quests.list_active_quests(&user_id),
        QuestListKind::Completed => quests.list_completed_quests(&user_id),
        QuestListKind::Daily => quests.list_daily_quests(&user_id, daily.today()),
    })
    .await?;
    debug!(target: "app::quests", ?kind, count = records.len(), "quests listed");
    Ok(records)
}

pub async fn quests_create(
    state: &AppState,
    user_id: String,
    payload: QuestCreateInput,
) -> CommandResult<QuestRecord> {
    let service = state.quests();
    run_blocking(move || service.create_quest(&user_id, payload)).await
}

pub async fn quests_update(
    state: &AppState,
    user_id: String,
    quest_id: String,
    payload: QuestUpdateInput,
) -> CommandResult<QuestRecord> {
    let service = state.quests();
    run_blocking(move || service.update_quest(&user_id, &quest_id, payload)).await
}

pub async fn quests_delete(state: &AppState, user_id: String, quest_id: String) -> CommandResult<()> {
    let service = state.quests();
    run_blocking(move || service.delete_quest(&user_id, &quest_id)).await
}

pub async fn quests_complete(
    state: &AppState,
    user_id: String,
    quest_id: String,
) -> CommandResult<QuestCompletionResult> {
    let service = state.quests();
    run_blocking(move || service.complete_quest(&user_id, &quest_id)).await
}
