pub mod daily_quest;
pub mod progression;
pub mod quest;
pub mod user;
