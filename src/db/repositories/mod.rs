pub mod daily_quest_repository;
pub mod quest_repository;
pub mod user_repository;
