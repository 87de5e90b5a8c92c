pub mod calendar;
pub mod clock;
pub mod crypto;
pub mod logger;
