//! Courses and the documents attached to them

use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

/// A course with its reference columns joined in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
pub struct Course {
    pub course_id: i32,
    pub degree: String,
    pub major_id: Option<i32>,
    pub major: Option<String>,
    pub year: i32,
    pub thai_course: String,
    pub eng_course: Option<String>,
    pub degree_id: Option<i32>,
    pub thai_degree: Option<String>,
    pub eng_degree: Option<String>,
    pub admission_req: Option<String>,
    pub graduation_req: Option<String>,
    pub philosophy: Option<String>,
    pub objective: Option<String>,
    pub tuition: Option<String>,
    pub credits: Option<String>,
    pub career_paths_id: Option<i32>,
    pub career_paths: Option<String>,
    pub plo_id: Option<i32>,
    pub plo: Option<String>,
    pub detail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult)]
pub struct Roadmap {
    pub roadmap_id: i32,
    pub course_id: i32,
    pub thai_course: Option<String>,
    pub roadmap_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromQueryResult)]
pub struct CourseStructure {
    pub course_structure_id: i32,
    pub course_id: i32,
    pub thai_course: Option<String>,
    pub course_structure_url: String,
}
