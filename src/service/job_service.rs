// service/job_service.rs
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    db::{ApplicationExt, JobExt, Store},
    dtos::jobdtos::*,
    models::{
        jobmodel::*,
        usermodel::{User, UserRole},
    },
    service::error::ServiceError,
};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct JobService {
    db_client: Arc<dyn Store>,
}

impl JobService {
    pub fn new(db_client: Arc<dyn Store>) -> Self {
        Self { db_client }
    }

    pub async fn list_jobs(
        &self,
        filter: &JobFilter,
        page_size: Option<i64>,
        cursor: Option<&str>,
    ) -> Result<JobPage, ServiceError> {
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(ServiceError::Validation(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        let after = match cursor.filter(|c| !c.is_empty()) {
            Some(token) => Some(
                JobCursor::decode(token)
                    .ok_or_else(|| ServiceError::Validation("Invalid pagination cursor".to_string()))?,
            ),
            None => None,
        };

        let jobs = self.db_client.list_jobs(filter, page_size, after).await?;
        tracing::debug!("job listing returned {} rows (filters: {:?})", jobs.len(), filter);

        Ok(JobPage::from_rows(jobs, page_size))
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job, ServiceError> {
        self.db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))
    }

    pub async fn create_job(&self, employer: &User, dto: CreateJobDto) -> Result<Job, ServiceError> {
        if employer.role != UserRole::Employer {
            return Err(ServiceError::RoleRequired(UserRole::Employer, "post jobs"));
        }

        let new_job = dto
            .into_new_job(employer.id, employer.name.clone())
            .map_err(ServiceError::InvalidInput)?;

        let job = self.db_client.create_job(new_job).await?;
        tracing::info!(
            "{} job {} created by employer {}",
            job.category.to_str(),
            job.id,
            employer.id
        );

        Ok(job)
    }

    async fn owned_job(&self, actor_id: Uuid, job_id: Uuid) -> Result<Job, ServiceError> {
        let job = self.get_job(job_id).await?;

        if job.employer_id != actor_id {
            return Err(ServiceError::UnauthorizedJobAccess(actor_id, job_id));
        }
        Ok(job)
    }

    /// Any field, status included, may be changed. Concurrent updates race and
    /// the last write wins.
    pub async fn update_job(
        &self,
        actor_id: Uuid,
        job_id: Uuid,
        dto: UpdateJobDto,
    ) -> Result<Job, ServiceError> {
        if let Some(rate) = dto.hourly_rate {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(ServiceError::InvalidInput(vec![RATE_REQUIRED]));
            }
        }

        self.owned_job(actor_id, job_id).await?;

        let job = self.db_client.update_job(job_id, &dto.into()).await?;
        tracing::info!("job {} updated (status {:?})", job.id, job.status);

        Ok(job)
    }

    pub async fn delete_job(&self, actor_id: Uuid, job_id: Uuid) -> Result<(), ServiceError> {
        self.owned_job(actor_id, job_id).await?;
        self.db_client.delete_job(job_id).await?;

        tracing::info!("job {} deleted by {}", job_id, actor_id);
        Ok(())
    }

    pub async fn jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, ServiceError> {
        Ok(self.db_client.get_jobs_by_employer(employer_id).await?)
    }

    pub async fn apply_for_job(
        &self,
        worker: &User,
        job_id: Uuid,
        dto: ApplyJobDto,
    ) -> Result<JobApplication, ServiceError> {
        if worker.role != UserRole::Worker {
            return Err(ServiceError::RoleRequired(UserRole::Worker, "apply for jobs"));
        }

        let job = self.get_job(job_id).await?;

        let application = self
            .db_client
            .create_application(NewApplication {
                job_id: job.id,
                worker_id: worker.id,
                worker_name: worker.name.clone(),
                worker_phone: dto
                    .worker_phone
                    .or_else(|| worker.phone.clone())
                    .unwrap_or_default(),
                message: dto.message.filter(|m| !m.trim().is_empty()),
            })
            .await?;

        tracing::info!("worker {} applied to job {}", worker.id, job.id);
        Ok(application)
    }

    pub async fn job_applications(
        &self,
        actor_id: Uuid,
        job_id: Uuid,
    ) -> Result<Vec<JobApplication>, ServiceError> {
        self.owned_job(actor_id, job_id).await?;
        Ok(self.db_client.get_job_applications(job_id).await?)
    }

    pub async fn applications_by_worker(
        &self,
        worker_id: Uuid,
    ) -> Result<Vec<JobApplication>, ServiceError> {
        Ok(self.db_client.get_worker_applications(worker_id).await?)
    }

    /// Any status may follow any other; only the job's employer may change it.
    pub async fn update_application_status(
        &self,
        actor_id: Uuid,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<JobApplication, ServiceError> {
        let application = self
            .db_client
            .get_application_by_id(application_id)
            .await?
            .ok_or(ServiceError::ApplicationNotFound(application_id))?;

        self.owned_job(actor_id, application.job_id).await?;

        let application = self
            .db_client
            .update_application_status(application_id, status)
            .await?;

        tracing::info!("application {} set to {:?}", application.id, application.status);
        Ok(application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{memory::MemoryDb, userdb::UserExt},
        dtos::ApiResponse,
        models::usermodel::NewUser,
    };
    use std::collections::HashSet;

    async fn user(db: &MemoryDb, name: &str, role: UserRole) -> User {
        db.save_user(NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            password: "hash".to_string(),
            role,
            phone: Some("9876543210".to_string()),
        })
        .await
        .unwrap()
    }

    fn job_form(title: &str, category: JobCategory, rate: f64) -> CreateJobDto {
        CreateJobDto {
            title: title.to_string(),
            description: "Needs to start tomorrow morning".to_string(),
            location: "Jaipur".to_string(),
            hourly_rate: Some(rate),
            category: Some(category),
            duration: Some(JobDuration::Daily),
            skills: Some(vec!["lifting".to_string()]),
            experience: None,
        }
    }

    fn setup() -> (Arc<MemoryDb>, JobService) {
        let db = Arc::new(MemoryDb::new());
        let service = JobService::new(db.clone());
        (db, service)
    }

    #[tokio::test]
    async fn workers_cannot_post_jobs() {
        let (db, service) = setup();
        let worker = user(&db, "Sunil", UserRole::Worker).await;

        let err = service
            .create_job(&worker, job_form("Loader", JobCategory::Delivery, 100.0))
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::RoleRequired(UserRole::Employer, _)));
    }

    #[tokio::test]
    async fn invalid_form_returns_the_rule_list() {
        let (db, service) = setup();
        let employer = user(&db, "Asha", UserRole::Employer).await;

        let err = service
            .create_job(&employer, CreateJobDto::default())
            .await
            .unwrap_err();

        match err {
            ServiceError::InvalidInput(errors) => assert_eq!(errors.len(), 6),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn pages_cover_every_job_exactly_once() {
        let (db, service) = setup();
        let employer = user(&db, "Asha", UserRole::Employer).await;

        let mut created = Vec::new();
        for i in 0..23 {
            let job = service
                .create_job(&employer, job_form(&format!("Job {i}"), JobCategory::Cleaning, 90.0))
                .await
                .unwrap();
            created.push(job.id);
        }

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = service
                .list_jobs(&JobFilter::default(), Some(5), cursor.as_deref())
                .await
                .unwrap();
            pages += 1;
            seen.extend(page.jobs.iter().map(|j| (j.created_at, j.id)));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(pages, 5);
        assert_eq!(seen.len(), created.len());
        let unique: HashSet<Uuid> = seen.iter().map(|(_, id)| *id).collect();
        assert_eq!(unique, created.into_iter().collect::<HashSet<Uuid>>());
        assert!(seen.windows(2).all(|w| w[0] > w[1]), "listing must be newest first");
    }

    #[tokio::test]
    async fn pagination_respects_filters() {
        let (db, service) = setup();
        let employer = user(&db, "Asha", UserRole::Employer).await;

        for i in 0..6 {
            let category = if i % 2 == 0 {
                JobCategory::Plumbing
            } else {
                JobCategory::Painting
            };
            service
                .create_job(&employer, job_form(&format!("Job {i}"), category, 100.0 + i as f64))
                .await
                .unwrap();
        }

        let filter = JobFilter {
            category: Some(JobCategory::Plumbing),
            ..JobFilter::default()
        };
        let first = service.list_jobs(&filter, Some(2), None).await.unwrap();
        let second = service
            .list_jobs(&filter, Some(2), first.next_cursor.as_deref())
            .await
            .unwrap();

        assert_eq!(first.jobs.len(), 2);
        assert_eq!(second.jobs.len(), 1);
        assert!(second.next_cursor.is_none());
        assert!(first
            .jobs
            .iter()
            .chain(second.jobs.iter())
            .all(|j| j.category == JobCategory::Plumbing));
    }

    #[tokio::test]
    async fn bad_cursor_and_page_size_are_validation_errors() {
        let (_db, service) = setup();

        let err = service
            .list_jobs(&JobFilter::default(), None, Some("%%%"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Validation error: Invalid pagination cursor");

        let err = service
            .list_jobs(&JobFilter::default(), Some(0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn only_the_owner_can_update_or_delete() {
        let (db, service) = setup();
        let owner = user(&db, "Asha", UserRole::Employer).await;
        let other = user(&db, "Vikram", UserRole::Employer).await;
        let job = service
            .create_job(&owner, job_form("Wiring", JobCategory::Electrical, 250.0))
            .await
            .unwrap();

        let err = service
            .update_job(other.id, job.id, UpdateJobDto::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedJobAccess(_, _)));

        let err = service.delete_job(other.id, job.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedJobAccess(_, _)));

        service.delete_job(owner.id, job.id).await.unwrap();
        assert!(matches!(
            service.get_job(job.id).await.unwrap_err(),
            ServiceError::JobNotFound(_)
        ));
    }

    #[tokio::test]
    async fn status_can_move_freely() {
        let (db, service) = setup();
        let owner = user(&db, "Asha", UserRole::Employer).await;
        let job = service
            .create_job(&owner, job_form("Tiles", JobCategory::Construction, 300.0))
            .await
            .unwrap();
        assert_eq!(job.status, JobStatus::Open);

        for status in [JobStatus::Completed, JobStatus::Open, JobStatus::Cancelled, JobStatus::InProgress] {
            let updated = service
                .update_job(
                    owner.id,
                    job.id,
                    UpdateJobDto {
                        status: Some(status),
                        ..UpdateJobDto::default()
                    },
                )
                .await
                .unwrap();
            assert_eq!(updated.status, status);
            assert_eq!(updated.title, "Tiles");
        }
    }

    #[tokio::test]
    async fn update_rejects_non_positive_rate() {
        let (db, service) = setup();
        let owner = user(&db, "Asha", UserRole::Employer).await;
        let job = service
            .create_job(&owner, job_form("Tiles", JobCategory::Construction, 300.0))
            .await
            .unwrap();

        let err = service
            .update_job(
                owner.id,
                job.id,
                UpdateJobDto {
                    hourly_rate: Some(0.0),
                    ..UpdateJobDto::default()
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), RATE_REQUIRED);
    }

    #[tokio::test]
    async fn application_flow() {
        let (db, service) = setup();
        let employer = user(&db, "Asha", UserRole::Employer).await;
        let worker = user(&db, "Sunil", UserRole::Worker).await;
        let job = service
            .create_job(&employer, job_form("Pipe fitting", JobCategory::Plumbing, 200.0))
            .await
            .unwrap();

        let application = service
            .apply_for_job(
                &worker,
                job.id,
                ApplyJobDto {
                    message: Some("I have 5 years experience".to_string()),
                    worker_phone: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(application.status, ApplicationStatus::Pending);
        assert_eq!(application.worker_phone, "9876543210");

        let err = service
            .update_application_status(worker.id, application.id, ApplicationStatus::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnauthorizedJobAccess(_, _)));

        let accepted = service
            .update_application_status(employer.id, application.id, ApplicationStatus::Accepted)
            .await
            .unwrap();
        assert_eq!(accepted.status, ApplicationStatus::Accepted);

        let for_job = service.job_applications(employer.id, job.id).await.unwrap();
        let for_worker = service.applications_by_worker(worker.id).await.unwrap();
        assert_eq!(for_job, for_worker);
    }

    #[tokio::test]
    async fn applying_to_a_missing_job_fails() {
        let (db, service) = setup();
        let worker = user(&db, "Sunil", UserRole::Worker).await;

        let err = service
            .apply_for_job(&worker, Uuid::new_v4(), ApplyJobDto::default())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Job not found");
    }

    #[tokio::test]
    async fn every_call_reports_backend_failure() {
        let (db, service) = setup();
        let employer = user(&db, "Asha", UserRole::Employer).await;
        let worker = user(&db, "Sunil", UserRole::Worker).await;
        db.simulate_outage("deadline exceeded").await;

        let id = Uuid::new_v4();
        let results: Vec<ApiResponse<()>> = vec![
            service.list_jobs(&JobFilter::default(), None, None).await.map(|_| ()).into(),
            service.get_job(id).await.map(|_| ()).into(),
            service
                .create_job(&employer, job_form("x", JobCategory::Other, 1.0))
                .await
                .map(|_| ())
                .into(),
            service.update_job(employer.id, id, UpdateJobDto::default()).await.map(|_| ()).into(),
            service.delete_job(employer.id, id).await.into(),
            service.jobs_by_employer(employer.id).await.map(|_| ()).into(),
            service.apply_for_job(&worker, id, ApplyJobDto::default()).await.map(|_| ()).into(),
            service.job_applications(employer.id, id).await.map(|_| ()).into(),
            service.applications_by_worker(worker.id).await.map(|_| ()).into(),
            service
                .update_application_status(employer.id, id, ApplicationStatus::Rejected)
                .await
                .map(|_| ())
                .into(),
        ];

        for response in results {
            assert!(!response.success);
            assert_eq!(
                response.error.as_deref(),
                Some("Backend unavailable: deadline exceeded")
            );
        }
    }
}
