use serde::Serialize;

use crate::models::daily_quest::DailyQuestAssignment;
use crate::models::quest::QuestRecord;

use super::{run_blocking, AppState, CommandResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyQuestBoard {
    pub assignment: Option<DailyQuestAssignment>,
    /// True when this call generated the batch.
    pub generated: bool,
    pub quests: Vec<QuestRecord>,
}

pub async fn daily_quests_fetch(state: &AppState, user_id: String) -> CommandResult<DailyQuestBoard> {
    let daily = state.daily_quests();
    let quests = state.quests();
    run_blocking(move || {
        let today = daily.today();
        let generated = daily.ensure_daily_quests(&user_id, today)?.is_some();
        let assignment = daily.todays_assignment(&user_id)?;
        let quests = quests.list_daily_quests(&user_id, today)?;
        Ok(DailyQuestBoard {
            assignment,
            generated,
            quests,
        })
    })
    .await
}
