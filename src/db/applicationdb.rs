// db/applicationdb.rs
use async_trait::async_trait;
use uuid::Uuid;

use super::db::{DBClient, StoreError};
use crate::models::jobmodel::{ApplicationStatus, JobApplication, NewApplication};

const APPLICATION_COLUMNS: &str = "id, job_id, worker_id, worker_name, worker_phone, status, \
     message, applied_at, updated_at";

#[async_trait]
pub trait ApplicationExt: Send + Sync {
    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<JobApplication, StoreError>;

    async fn get_application_by_id(
        &self,
        application_id: Uuid,
    ) -> Result<Option<JobApplication>, StoreError>;

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<JobApplication>, StoreError>;

    async fn get_worker_applications(
        &self,
        worker_id: Uuid,
    ) -> Result<Vec<JobApplication>, StoreError>;

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<JobApplication, StoreError>;
}

#[async_trait]
impl ApplicationExt for DBClient {
    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<JobApplication, StoreError> {
        let application = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            INSERT INTO applications (job_id, worker_id, worker_name, worker_phone, message)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        ))
        .bind(application.job_id)
        .bind(application.worker_id)
        .bind(application.worker_name)
        .bind(application.worker_phone)
        .bind(application.message)
        .fetch_one(&self.pool)
        .await?;

        Ok(application)
    }

    async fn get_application_by_id(
        &self,
        application_id: Uuid,
    ) -> Result<Option<JobApplication>, StoreError> {
        let application = sqlx::query_as::<_, JobApplication>(&format!(
            "SELECT {} FROM applications WHERE id = $1",
            APPLICATION_COLUMNS
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(application)
    }

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<JobApplication>, StoreError> {
        let applications = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            SELECT {}
            FROM applications
            WHERE job_id = $1
            ORDER BY applied_at DESC
            "#,
            APPLICATION_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(applications)
    }

    async fn get_worker_applications(
        &self,
        worker_id: Uuid,
    ) -> Result<Vec<JobApplication>, StoreError> {
        let applications = sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            SELECT {}
            FROM applications
            WHERE worker_id = $1
            ORDER BY applied_at DESC
            "#,
            APPLICATION_COLUMNS
        ))
        .bind(worker_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(applications)
    }

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<JobApplication, StoreError> {
        sqlx::query_as::<_, JobApplication>(&format!(
            r#"
            UPDATE applications
            SET status = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            APPLICATION_COLUMNS
        ))
        .bind(application_id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("applications", application_id))
    }
}
