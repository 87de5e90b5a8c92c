pub mod achievement_catalog;
pub mod daily_quest_service;
pub mod description_service;
pub mod level_table;
pub mod progression_engine;
pub mod quest_service;
pub mod quest_templates;
pub mod user_service;
