// db/jobdb.rs
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::db::{DBClient, StoreError};
use crate::models::jobmodel::*;

pub(crate) const JOB_COLUMNS: &str = "id, title, description, category, location, hourly_rate, \
     duration, employer_id, employer_name, status, skills, experience, created_at, updated_at";

#[async_trait]
pub trait JobExt: Send + Sync {
    async fn create_job(&self, job: NewJob) -> Result<Job, StoreError>;

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// Newest first, strictly after `after` when given.
    async fn list_jobs(
        &self,
        filter: &JobFilter,
        page_size: i64,
        after: Option<JobCursor>,
    ) -> Result<Vec<Job>, StoreError>;

    async fn update_job(&self, job_id: Uuid, update: &JobUpdate) -> Result<Job, StoreError>;

    async fn delete_job(&self, job_id: Uuid) -> Result<(), StoreError>;

    async fn get_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, StoreError>;
}

/// Builds the listing statement. Every filter value and the cursor are bound,
/// never interpolated.
pub fn build_job_listing_query(
    filter: &JobFilter,
    page_size: i64,
    after: Option<JobCursor>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM jobs", JOB_COLUMNS));
    let mut clause = " WHERE ";

    for predicate in filter.predicates() {
        builder.push(clause);
        match predicate {
            JobPredicate::Category(category) => {
                builder.push("category = ").push_bind(category);
            }
            JobPredicate::Location(location) => {
                builder.push("location = ").push_bind(location);
            }
            JobPredicate::Status(status) => {
                builder.push("status = ").push_bind(status);
            }
            JobPredicate::MinRate(min) => {
                builder.push("hourly_rate >= ").push_bind(min);
            }
            JobPredicate::MaxRate(max) => {
                builder.push("hourly_rate <= ").push_bind(max);
            }
        }
        clause = " AND ";
    }

    if let Some(cursor) = after {
        builder
            .push(clause)
            .push("(created_at, id) < (")
            .push_bind(cursor.created_at)
            .push(", ")
            .push_bind(cursor.id)
            .push(")");
    }

    builder
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page_size);

    builder
}

#[async_trait]
impl JobExt for DBClient {
    async fn create_job(&self, job: NewJob) -> Result<Job, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            r#"
            INSERT INTO jobs
            (title, description, category, location, hourly_rate, duration,
             employer_id, employer_name, skills, experience)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job.title)
        .bind(job.description)
        .bind(job.category)
        .bind(job.location)
        .bind(job.hourly_rate)
        .bind(job.duration)
        .bind(job.employer_id)
        .bind(job.employer_name)
        .bind(job.skills)
        .bind(job.experience)
        .fetch_one(&self.pool)
        .await?;

        Ok(job)
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let job = sqlx::query_as::<_, Job>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(job)
    }

    async fn list_jobs(
        &self,
        filter: &JobFilter,
        page_size: i64,
        after: Option<JobCursor>,
    ) -> Result<Vec<Job>, StoreError> {
        let mut builder = build_job_listing_query(filter, page_size, after);

        let jobs = builder
            .build_query_as::<Job>()
            .fetch_all(&self.pool)
            .await?;

        Ok(jobs)
    }

    async fn update_job(&self, job_id: Uuid, update: &JobUpdate) -> Result<Job, StoreError> {
        sqlx::query_as::<_, Job>(&format!(
            r#"
            UPDATE jobs
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                location = COALESCE($5, location),
                hourly_rate = COALESCE($6, hourly_rate),
                duration = COALESCE($7, duration),
                status = COALESCE($8, status),
                skills = COALESCE($9, skills),
                experience = COALESCE($10, experience),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(update.title.clone())
        .bind(update.description.clone())
        .bind(update.category)
        .bind(update.location.clone())
        .bind(update.hourly_rate)
        .bind(update.duration)
        .bind(update.status)
        .bind(update.skills.clone())
        .bind(update.experience.clone())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("jobs", job_id))
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<(), StoreError> {
        // Applications are left in place.
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, StoreError> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            r#"
            SELECT {}
            FROM jobs
            WHERE employer_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
            JOB_COLUMNS
        ))
        .bind(employer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }
}
