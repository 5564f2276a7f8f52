//! Subject entity

use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// A subject of a course plan. `subject_id` is the registrar's subject code
/// and keys the description and CLO rows; `id` is the surrogate key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult)]
pub struct Subject {
    pub id: i32,
    pub subject_id: String,
    pub course_id: i32,
    pub thai_course: Option<String>,
    pub plan_type: Option<String>,
    pub semester: Option<String>,
    pub thai_subject: String,
    pub eng_subject: Option<String>,
    pub credits: Option<String>,
    pub compulsory_subject: Option<String>,
    pub condition: Option<String>,
    pub description_thai: Option<String>,
    pub description_eng: Option<String>,
    pub clo: Option<String>,
}
