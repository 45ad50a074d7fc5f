//! Extraction job records

use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{ExtractionJob, ExtractionSource, ExtractionStatus, ImageLocator};

/// Hex SHA256 of `text`
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

const JOB_COLUMNS: &str = "id, bucket, image_key, status, source, confidence, error,
    input_hash, receipt_id, created_at, completed_at";

impl Database {
    /// Record a new pending job for `locator`
    pub fn create_extraction_job(&self, locator: &ImageLocator) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO extraction_jobs (bucket, image_key, status) VALUES (?, ?, 'pending')",
            params![locator.bucket, locator.key],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_extraction_job(&self, id: i64) -> Result<Option<ExtractionJob>> {
        let conn = self.conn()?;
        let job = conn
            .query_row(
                &format!("SELECT {} FROM extraction_jobs WHERE id = ?", JOB_COLUMNS),
                params![id],
                Self::row_to_job,
            )
            .optional()?;
        Ok(job)
    }

    /// Most recent jobs first
    pub fn list_extraction_jobs(&self, limit: i64) -> Result<Vec<ExtractionJob>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM extraction_jobs ORDER BY id DESC LIMIT ?",
            JOB_COLUMNS
        ))?;

        let jobs = stmt
            .query_map(params![limit], Self::row_to_job)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(jobs)
    }

    /// Move a job to `next`, rejecting transitions the lifecycle forbids
    pub fn transition_extraction_job(&self, id: i64, next: ExtractionStatus) -> Result<()> {
        let current = self.extraction_status(id)?;
        if !current.can_transition_to(next) {
            return Err(Error::InvalidState(format!(
                "Extraction job {} cannot move from {} to {}",
                id, current, next
            )));
        }

        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE extraction_jobs SET status = ? WHERE id = ? AND status = ?",
            params![next.as_str(), id, current.as_str()],
        )?;
        if changed == 0 {
            return Err(Error::InvalidState(format!(
                "Extraction job {} changed status concurrently",
                id
            )));
        }
        Ok(())
    }

    pub fn set_extraction_input_hash(&self, id: i64, input_hash: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE extraction_jobs SET input_hash = ? WHERE id = ?",
            params![input_hash, id],
        )?;
        Ok(())
    }

    /// processing -> completed, recording which parser produced the result
    pub fn complete_extraction_job(
        &self,
        id: i64,
        source: ExtractionSource,
        confidence: f64,
    ) -> Result<()> {
        self.finish_extraction_job(
            id,
            ExtractionStatus::Completed,
            Some(source),
            Some(confidence),
            None,
        )
    }

    /// processing -> failed
    pub fn fail_extraction_job(&self, id: i64, error: &str) -> Result<()> {
        self.finish_extraction_job(id, ExtractionStatus::Failed, None, None, Some(error))
    }

    /// Point a completed job at the receipt created from it
    pub fn link_extraction_receipt(&self, id: i64, receipt_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE extraction_jobs SET receipt_id = ? WHERE id = ? AND status = 'completed'",
            params![receipt_id, id],
        )?;
        if changed == 0 {
            return Err(Error::InvalidState(format!(
                "Extraction job {} is not completed",
                id
            )));
        }
        Ok(())
    }

    fn finish_extraction_job(
        &self,
        id: i64,
        status: ExtractionStatus,
        source: Option<ExtractionSource>,
        confidence: Option<f64>,
        error: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE extraction_jobs SET status = ?, source = ?, confidence = ?, error = ?,
             completed_at = CURRENT_TIMESTAMP
             WHERE id = ? AND status = 'processing'",
            params![
                status.as_str(),
                source.map(|s| s.as_str()),
                confidence,
                error,
                id
            ],
        )?;
        if changed == 0 {
            let current = self.extraction_status(id)?;
            return Err(Error::InvalidState(format!(
                "Extraction job {} cannot move from {} to {}",
                id, current, status
            )));
        }
        Ok(())
    }

    fn extraction_status(&self, id: i64) -> Result<ExtractionStatus> {
        let conn = self.conn()?;
        let status: Option<String> = conn
            .query_row(
                "SELECT status FROM extraction_jobs WHERE id = ?",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        status
            .ok_or_else(|| Error::NotFound(format!("extraction job {}", id)))?
            .parse()
            .map_err(Error::InvalidState)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<ExtractionJob> {
        let status: String = row.get(3)?;
        let source: Option<String> = row.get(4)?;
        let created_at: String = row.get(9)?;
        let completed_at: Option<String> = row.get(10)?;

        Ok(ExtractionJob {
            id: row.get(0)?,
            bucket: row.get(1)?,
            key: row.get(2)?,
            status: status.parse().unwrap_or_default(),
            source: source.and_then(|s| s.parse().ok()),
            confidence: row.get(5)?,
            error: row.get(6)?,
            input_hash: row.get(7)?,
            receipt_id: row.get(8)?,
            created_at: parse_datetime(&created_at),
            completed_at: completed_at.as_deref().map(parse_datetime),
        })
    }
}
