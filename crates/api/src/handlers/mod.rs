//! API handlers module

pub mod calendars;
pub mod courses;
pub mod documents;
pub mod health;
pub mod news;
pub mod personnel;
pub mod subjects;
