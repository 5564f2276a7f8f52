//! Personnel with their research publications

use crate::db::aggregate::{FlatRow, HasChildren};
use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Personnel {
    pub personnel_id: i32,
    pub type_personnel: String,
    pub department_position_id: Option<i32>,
    pub department_position_name: Option<String>,
    pub academic_position_id: Option<i32>,
    pub thai_academic_position: Option<String>,
    pub eng_academic_position: Option<String>,
    pub thai_name: String,
    pub eng_name: Option<String>,
    pub education: Option<String>,
    pub related_fields: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub file_image: Option<String>,
    pub scopus_id: Option<String>,
    pub researches: Vec<Research>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromQueryResult)]
pub struct Research {
    pub research_id: i32,
    pub personnel_id: i32,
    pub title: String,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub cited: i32,
    pub created_at: DateTime<Utc>,
}

/// A publication as reported by the citation source, before it is stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub title: String,
    pub journal: Option<String>,
    pub year: Option<i32>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub pages: Option<String>,
    pub doi: Option<String>,
    pub cited: i32,
}

/// Personnel with a scopus author id, used by the bulk research sync
#[derive(Debug, Clone, FromQueryResult)]
pub struct ScopusAuthor {
    pub personnel_id: i32,
    pub scopus_id: String,
}

/// One row of `personnels LEFT JOIN research` plus the position joins.
/// Research columns are prefixed with `r_`.
#[derive(Debug, Clone, FromQueryResult)]
pub struct PersonnelRow {
    pub personnel_id: i32,
    pub type_personnel: String,
    pub department_position_id: Option<i32>,
    pub department_position_name: Option<String>,
    pub academic_position_id: Option<i32>,
    pub thai_academic_position: Option<String>,
    pub eng_academic_position: Option<String>,
    pub thai_name: String,
    pub eng_name: Option<String>,
    pub education: Option<String>,
    pub related_fields: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub file_image: Option<String>,
    pub scopus_id: Option<String>,
    pub r_research_id: Option<i32>,
    pub r_title: Option<String>,
    pub r_journal: Option<String>,
    pub r_year: Option<i32>,
    pub r_volume: Option<String>,
    pub r_issue: Option<String>,
    pub r_pages: Option<String>,
    pub r_doi: Option<String>,
    pub r_cited: Option<i32>,
    pub r_created_at: Option<DateTime<Utc>>,
}

impl HasChildren for Personnel {
    type Child = Research;

    fn children_mut(&mut self) -> &mut Vec<Research> {
        &mut self.researches
    }
}

impl FlatRow for PersonnelRow {
    type Key = i32;
    type Root = Personnel;

    fn key(&self) -> i32 {
        self.personnel_id
    }

    fn to_root(&self) -> Personnel {
        Personnel {
            personnel_id: self.personnel_id,
            type_personnel: self.type_personnel.clone(),
            department_position_id: self.department_position_id,
            department_position_name: self.department_position_name.clone(),
            academic_position_id: self.academic_position_id,
            thai_academic_position: self.thai_academic_position.clone(),
            eng_academic_position: self.eng_academic_position.clone(),
            thai_name: self.thai_name.clone(),
            eng_name: self.eng_name.clone(),
            education: self.education.clone(),
            related_fields: self.related_fields.clone(),
            email: self.email.clone(),
            website: self.website.clone(),
            file_image: self.file_image.clone(),
            scopus_id: self.scopus_id.clone(),
            researches: Vec::new(),
        }
    }

    fn into_child(self) -> Option<Research> {
        Some(Research {
            research_id: self.r_research_id?,
            personnel_id: self.personnel_id,
            title: self.r_title?,
            journal: self.r_journal,
            year: self.r_year,
            volume: self.r_volume,
            issue: self.r_issue,
            pages: self.r_pages,
            doi: self.r_doi,
            cited: self.r_cited.unwrap_or(0),
            created_at: self.r_created_at?,
        })
    }
}
