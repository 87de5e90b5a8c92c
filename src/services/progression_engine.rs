use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::progression::{
    AchievementId, CompletionOutcome, LevelProgress, ProgressionState,
};
use crate::services::achievement_catalog::ACHIEVEMENTS;
use crate::services::level_table;
use crate::utils::calendar::local_date;

/// Applies quest rewards to a user's progression state.
///
/// Pure and synchronous: persisting the mutated state is the caller's job and
/// must happen in the same transaction that marks the quest completed.
#[derive(Debug, Clone, Copy)]
pub struct ProgressionEngine {
    timezone: Tz,
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl ProgressionEngine {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn apply_completion(
        &self,
        state: &mut ProgressionState,
        reward_points: i64,
        now: DateTime<Utc>,
    ) -> AppResult<CompletionOutcome> {
        if reward_points <= 0 {
            return Err(AppError::invalid_reward(reward_points));
        }

        // Level-up detection compares against the level held before crediting.
        let old_level = state.level;
        state.points += reward_points;

        let recalculated = level_table::calculate_level(state.points);
        let leveled_up = recalculated > old_level;
        if leveled_up {
            state.level = recalculated;
            info!(
                target: "app::progression",
                old_level,
                new_level = recalculated,
                points = state.points,
                "level up"
            );
        }

        state.points_this_week += reward_points;
        self.update_streak(state, now);

        let newly_unlocked = unlock_achievements(state);

        debug!(
            target: "app::progression",
            reward_points,
            points = state.points,
            streak = state.streak,
            unlocked = newly_unlocked.len(),
            "completion applied"
        );

        Ok(CompletionOutcome {
            points_earned: reward_points,
            leveled_up,
            new_level: leveled_up.then_some(recalculated),
            newly_unlocked_achievements: newly_unlocked,
        })
    }

    /// Streak continuity by calendar date, not elapsed hours.
    pub fn update_streak(&self, state: &mut ProgressionState, now: DateTime<Utc>) {
        let today = local_date(now, self.timezone);

        state.streak = match state.last_completed_at {
            None => 1,
            Some(last) => {
                let gap = (today - local_date(last, self.timezone)).num_days();
                match gap {
                    0 => state.streak,
                    1 => state.streak + 1,
                    _ => 1,
                }
            }
        };

        state.last_completed_at = Some(now);
    }

    pub fn level_progress(&self, state: &ProgressionState) -> LevelProgress {
        LevelProgress {
            level: state.level,
            points: state.points,
            points_to_next_level: level_table::points_to_next_level(state.level, state.points),
            progress_percentage: level_table::level_progress_percentage(state.level, state.points),
        }
    }
}

fn unlock_achievements(state: &mut ProgressionState) -> Vec<AchievementId> {
    let mut unlocked = Vec::new();
    for definition in ACHIEVEMENTS {
        if state.unlocked_achievements.contains(definition.id) {
            continue;
        }
        if (definition.condition)(state) && state.unlocked_achievements.insert(definition.id) {
            info!(
                target: "app::progression",
                achievement = %definition.id,
                "achievement unlocked"
            );
            unlocked.push(definition.id);
        }
    }
    unlocked
}
