use crate::models::progression::{AchievementId, ProgressionState};

pub struct AchievementDefinition {
    pub id: AchievementId,
    pub name: &'static str,
    pub condition: fn(&ProgressionState) -> bool,
}

/// Evaluated in declaration order; unlock reports follow this order.
pub static ACHIEVEMENTS: &[AchievementDefinition] = &[
    AchievementDefinition {
        id: AchievementId::WeekWarrior,
        name: "100 Points This Week!",
        condition: |state| state.points_this_week >= 100,
    },
    AchievementDefinition {
        id: AchievementId::StreakMaster,
        name: "7-Day Streak Achieved!",
        condition: |state| state.streak >= 7,
    },
    AchievementDefinition {
        id: AchievementId::LevelMaster,
        name: "Level Master!",
        condition: |state| state.points >= 1_000,
    },
    AchievementDefinition {
        id: AchievementId::PointsProdigy,
        name: "500 Points in Total!",
        condition: |state| state.points >= 500,
    },
    AchievementDefinition {
        id: AchievementId::WeekChampion,
        name: "200 Points This Week!",
        condition: |state| state.points_this_week >= 200,
    },
    AchievementDefinition {
        id: AchievementId::StreakLegend,
        name: "14-Day Streak!",
        condition: |state| state.streak >= 14,
    },
    AchievementDefinition {
        id: AchievementId::MonthlyGrinder,
        name: "300 Points in Four Weeks!",
        condition: |state| state.points_this_week >= 300,
    },
    AchievementDefinition {
        id: AchievementId::StreakMarathoner,
        name: "30-Day Streak!",
        condition: |state| state.streak >= 30,
    },
    AchievementDefinition {
        id: AchievementId::HalfwayHero,
        name: "Reach Halfway to 1000 Points!",
        condition: |state| state.points >= 500,
    },
    AchievementDefinition {
        id: AchievementId::StreakStarter,
        name: "First 3-Day Streak!",
        condition: |state| state.streak >= 3,
    },
    AchievementDefinition {
        id: AchievementId::WeekContributor,
        name: "50 Points This Week!",
        condition: |state| state.points_this_week >= 50,
    },
    AchievementDefinition {
        id: AchievementId::LifelongLearner,
        name: "2000 Total Points!",
        condition: |state| state.points >= 2_000,
    },
];

pub fn find(id: AchievementId) -> Option<&'static AchievementDefinition> {
    ACHIEVEMENTS.iter().find(|definition| definition.id == id)
}

pub fn achievement_name(id: AchievementId) -> &'static str {
    find(id).map(|definition| definition.name).unwrap_or("Unknown Achievement")
}

/// Display names for the given ids, in the order supplied.
pub fn achievement_names<I>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = AchievementId>,
{
    ids.into_iter()
        .map(|id| achievement_name(id).to_string())
        .collect()
}
