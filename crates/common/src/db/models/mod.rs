//! Row models
//!
//! Most reads are joins decoded with `FromQueryResult`; calendar events are a
//! plain SeaORM entity.

mod calendar;
mod course;
mod news;
mod personnel;
mod subject;

pub use calendar::{
    Entity as CalendarEntity,
    Model as CalendarEvent,
    ActiveModel as CalendarActiveModel,
    Column as CalendarColumn,
};

pub use course::{Course, CourseStructure, Roadmap};
pub use news::{News, NewsImage, NewsRow};
pub use personnel::{Personnel, PersonnelRow, Publication, Research, ScopusAuthor};
pub use subject::Subject;
