use crate::models::daily_quest::QuestCategory;
use crate::models::quest::Difficulty;

/// Static daily quest definition, seeded into `daily_quest_templates` once.
#[derive(Debug, Clone, Copy)]
pub struct TemplateDefinition {
    pub category: QuestCategory,
    pub name: &'static str,
    pub description: &'static str,
    pub target: Option<i64>,
    pub unit: Option<&'static str>,
    pub base_reward: i64,
    pub duration_minutes: i64,
    pub difficulty: Difficulty,
}

pub static TEMPLATE_CATALOG: &[TemplateDefinition] = &[
    TemplateDefinition {
        category: QuestCategory::Strength,
        name: "Push-ups",
        description: "Complete 100 push-ups. Can be broken into sets.",
        target: Some(50),
        unit: Some("reps"),
        base_reward: 5,
        duration_minutes: 30,
        difficulty: Difficulty::Medium,
    },
    TemplateDefinition {
        category: QuestCategory::Strength,
        name: "Sit-ups",
        description: "Complete 100 sit-ups. Can be broken into sets.",
        target: Some(50),
        unit: Some("reps"),
        base_reward: 5,
        duration_minutes: 30,
        difficulty: Difficulty::Medium,
    },
    TemplateDefinition {
        category: QuestCategory::Strength,
        name: "Squats",
        description: "Complete 100 squats. Can be broken into sets.",
        target: Some(50),
        unit: Some("reps"),
        base_reward: 5,
        duration_minutes: 30,
        difficulty: Difficulty::Medium,
    },
    TemplateDefinition {
        category: QuestCategory::Strength,
        name: "Running",
        description: "Run 10 km at your own pace.",
        target: Some(5),
        unit: Some("km"),
        base_reward: 10,
        duration_minutes: 60,
        difficulty: Difficulty::Hard,
    },
    TemplateDefinition {
        category: QuestCategory::Intelligence,
        name: "Read a Book",
        description: "Read a book for 45 minutes.",
        target: Some(30),
        unit: Some("mins"),
        base_reward: 4,
        duration_minutes: 45,
        difficulty: Difficulty::Easy,
    },
    TemplateDefinition {
        category: QuestCategory::Intelligence,
        name: "Journal",
        description: "Write in your journal for 30 minutes.",
        target: Some(45),
        unit: Some("mins"),
        base_reward: 3,
        duration_minutes: 30,
        difficulty: Difficulty::Easy,
    },
    TemplateDefinition {
        category: QuestCategory::Intelligence,
        name: "Study a Topic",
        description: "Study a new topic for 1 hour.",
        target: Some(60),
        unit: Some("mins"),
        base_reward: 6,
        duration_minutes: 60,
        difficulty: Difficulty::Medium,
    },
    TemplateDefinition {
        category: QuestCategory::Agility,
        name: "Jump Rope",
        description: "Jump rope for 15 minutes.",
        target: Some(15),
        unit: Some("mins"),
        base_reward: 4,
        duration_minutes: 15,
        difficulty: Difficulty::Medium,
    },
    TemplateDefinition {
        category: QuestCategory::Agility,
        name: "Stretching",
        description: "Complete a 30-minute stretching routine.",
        target: Some(15),
        unit: Some("mins"),
        base_reward: 3,
        duration_minutes: 30,
        difficulty: Difficulty::Easy,
    },
    TemplateDefinition {
        category: QuestCategory::Agility,
        name: "Sprinting",
        description: "Complete 10 sets of 30-second sprints.",
        target: Some(15),
        unit: Some("mins"),
        base_reward: 5,
        duration_minutes: 20,
        difficulty: Difficulty::Hard,
    },
];

pub fn templates_for(category: QuestCategory) -> impl Iterator<Item = &'static TemplateDefinition> {
    TEMPLATE_CATALOG
        .iter()
        .filter(move |template| template.category == category)
}
