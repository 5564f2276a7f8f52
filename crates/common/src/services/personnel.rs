//! Personnel CRUD and research synchronization from the citation source

use super::validate;
use crate::db::models::{Personnel, Research};
use crate::db::repository::{PersonnelQuery, PersonnelWrite, ResearchQuery};
use crate::db::Repository;
use crate::errors::{AppError, Result};
use crate::metrics;
use crate::scopus::{most_recent, CitationSource};
use crate::storage::{upload, BlobStore, UploadCategory, UploadedFile};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of a bulk research sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Personnel whose research set was replaced
    pub processed: usize,
    /// Personnel skipped because the fetch or the write failed
    pub failed: usize,
    /// Research rows written in total
    pub records: usize,
}

pub struct PersonnelService {
    repo: Repository,
    storage: Arc<dyn BlobStore>,
    citations: Arc<dyn CitationSource>,
    sync_limit: usize,
}

impl PersonnelService {
    pub fn new(
        repo: Repository,
        storage: Arc<dyn BlobStore>,
        citations: Arc<dyn CitationSource>,
        sync_limit: usize,
    ) -> Self {
        Self {
            repo,
            storage,
            citations,
            sync_limit,
        }
    }

    pub async fn list(&self, query: &PersonnelQuery) -> Result<Vec<Personnel>> {
        self.repo.list_personnel(query).await
    }

    pub async fn get(&self, personnel_id: i32) -> Result<Personnel> {
        self.repo.get_personnel(personnel_id).await
    }

    pub async fn create(&self, mut write: PersonnelWrite, image: Option<UploadedFile>) -> Result<Personnel> {
        validate(&write)?;
        if let Some(file) = image {
            write.file_image = Some(upload(self.storage.as_ref(), UploadCategory::Personnel, &file).await?);
        }

        let personnel_id = self.repo.create_personnel(&write).await?;
        self.repo.get_personnel(personnel_id).await
    }

    /// Update a person. Without a new image the stored one is kept.
    pub async fn update(
        &self,
        personnel_id: i32,
        mut write: PersonnelWrite,
        image: Option<UploadedFile>,
    ) -> Result<Personnel> {
        validate(&write)?;
        write.file_image = match image {
            Some(file) => Some(upload(self.storage.as_ref(), UploadCategory::Personnel, &file).await?),
            None => None,
        };

        self.repo.update_personnel(personnel_id, &write).await?;
        self.repo.get_personnel(personnel_id).await
    }

    pub async fn delete(&self, personnel_id: i32) -> Result<()> {
        self.repo.delete_personnel(personnel_id).await
    }

    pub async fn list_research(&self, query: &ResearchQuery) -> Result<Vec<Research>> {
        self.repo.list_research(query).await
    }

    /// Replace one person's research with what the citation source reports
    pub async fn sync_research(&self, personnel_id: i32) -> Result<Vec<Research>> {
        let scopus_id = self
            .repo
            .scopus_id(personnel_id)
            .await?
            .ok_or_else(|| {
                AppError::invalid_field(
                    "scopus_id",
                    format!("personnel {} has no scopus_id", personnel_id),
                )
            })?;

        let publications = match self.citations.publications(&scopus_id).await {
            Ok(publications) => publications,
            Err(e) => {
                metrics::record_research_sync(0, false);
                return Err(e);
            }
        };

        let written = self.repo.replace_research(personnel_id, &publications).await?;
        metrics::record_research_sync(written, true);
        info!(personnel_id, scopus_id = %scopus_id, records = written, "Research synced");

        self.repo
            .list_research(&ResearchQuery {
                personnel_id: Some(personnel_id),
                ..Default::default()
            })
            .await
    }

    /// Sync everyone with a Scopus id, keeping the most recent publications.
    /// Individual failures are logged and skipped.
    pub async fn sync_all(&self) -> Result<SyncSummary> {
        let authors = self.repo.scopus_authors().await?;
        let mut summary = SyncSummary::default();

        info!(authors = authors.len(), "Bulk research sync started");

        for author in authors {
            let publications = match self.citations.publications(&author.scopus_id).await {
                Ok(publications) => publications,
                Err(e) => {
                    warn!(personnel_id = author.personnel_id, error = %e, "Research fetch failed, skipping");
                    metrics::record_research_sync(0, false);
                    summary.failed += 1;
                    continue;
                }
            };

            if publications.is_empty() {
                continue;
            }

            let recent = most_recent(publications, self.sync_limit);
            match self.repo.replace_research(author.personnel_id, &recent).await {
                Ok(written) => {
                    metrics::record_research_sync(written, true);
                    summary.processed += 1;
                    summary.records += written;
                }
                Err(e) => {
                    warn!(personnel_id = author.personnel_id, error = %e, "Research write failed, skipping");
                    metrics::record_research_sync(0, false);
                    summary.failed += 1;
                }
            }
        }

        info!(
            processed = summary.processed,
            failed = summary.failed,
            records = summary.records,
            "Bulk research sync finished"
        );
        Ok(summary)
    }
}
