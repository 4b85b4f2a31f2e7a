use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobCategory {
    Construction,
    Delivery,
    Cleaning,
    Electrical,
    Plumbing,
    Carpentry,
    Painting,
    Other,
}

impl JobCategory {
    pub fn to_str(&self) -> &str {
        match self {
            JobCategory::Construction => "construction",
            JobCategory::Delivery => "delivery",
            JobCategory::Cleaning => "cleaning",
            JobCategory::Electrical => "electrical",
            JobCategory::Plumbing => "plumbing",
            JobCategory::Carpentry => "carpentry",
            JobCategory::Painting => "painting",
            JobCategory::Other => "other",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_duration", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobDuration {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

// Status changes are free-form: any value may follow any other.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: JobCategory,
    pub location: String,
    pub hourly_rate: f64,
    pub duration: JobDuration,
    pub employer_id: Uuid,
    pub employer_name: String,
    pub status: JobStatus,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, PartialEq)]
pub struct JobApplication {
    pub id: Uuid,
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub worker_name: String,
    pub worker_phone: String,
    pub status: ApplicationStatus,
    pub message: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub category: JobCategory,
    pub location: String,
    pub hourly_rate: f64,
    pub duration: JobDuration,
    pub employer_id: Uuid,
    pub employer_name: String,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
}

/// Partial job update. `None` keeps the stored value.
#[derive(Debug, Default, Clone)]
pub struct JobUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<JobCategory>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
    pub duration: Option<JobDuration>,
    pub status: Option<JobStatus>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
}

impl JobUpdate {
    pub fn apply_to(&self, job: &mut Job) {
        if let Some(title) = &self.title {
            job.title = title.clone();
        }
        if let Some(description) = &self.description {
            job.description = description.clone();
        }
        if let Some(category) = self.category {
            job.category = category;
        }
        if let Some(location) = &self.location {
            job.location = location.clone();
        }
        if let Some(rate) = self.hourly_rate {
            job.hourly_rate = rate;
        }
        if let Some(duration) = self.duration {
            job.duration = duration;
        }
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(skills) = &self.skills {
            job.skills = Some(skills.clone());
        }
        if let Some(experience) = &self.experience {
            job.experience = Some(experience.clone());
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub worker_name: String,
    pub worker_phone: String,
    pub message: Option<String>,
}

/// Filters for the public job listing. Present fields are ANDed together.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct JobFilter {
    pub category: Option<JobCategory>,
    pub location: Option<String>,
    pub status: Option<JobStatus>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobPredicate {
    Category(JobCategory),
    Location(String),
    Status(JobStatus),
    MinRate(f64),
    MaxRate(f64),
}

impl JobPredicate {
    pub fn matches(&self, job: &Job) -> bool {
        match self {
            JobPredicate::Category(category) => job.category == *category,
            JobPredicate::Location(location) => job.location == *location,
            JobPredicate::Status(status) => job.status == *status,
            JobPredicate::MinRate(min) => job.hourly_rate >= *min,
            JobPredicate::MaxRate(max) => job.hourly_rate <= *max,
        }
    }
}

impl JobFilter {
    /// One predicate per present filter, in a fixed order.
    pub fn predicates(&self) -> Vec<JobPredicate> {
        let mut predicates = Vec::new();

        if let Some(category) = self.category {
            predicates.push(JobPredicate::Category(category));
        }
        if let Some(location) = &self.location {
            predicates.push(JobPredicate::Location(location.clone()));
        }
        if let Some(status) = self.status {
            predicates.push(JobPredicate::Status(status));
        }
        if let Some(min) = self.min_rate {
            predicates.push(JobPredicate::MinRate(min));
        }
        if let Some(max) = self.max_rate {
            predicates.push(JobPredicate::MaxRate(max));
        }

        predicates
    }

    pub fn matches(&self, job: &Job) -> bool {
        self.predicates().iter().all(|p| p.matches(job))
    }
}

/// Keyset position in the newest-first job listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobCursor {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl JobCursor {
    pub fn after(job: &Job) -> Self {
        JobCursor {
            created_at: job.created_at,
            id: job.id,
        }
    }

    pub fn encode(&self) -> String {
        let raw = format!("{}|{}", self.created_at.timestamp_micros(), self.id);
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn decode(token: &str) -> Option<Self> {
        let bytes = URL_SAFE_NO_PAD.decode(token).ok()?;
        let raw = String::from_utf8(bytes).ok()?;
        let (micros, id) = raw.split_once('|')?;

        Some(JobCursor {
            created_at: DateTime::from_timestamp_micros(micros.parse().ok()?)?,
            id: Uuid::parse_str(id).ok()?,
        })
    }

    /// True when `job` sorts strictly after this cursor (created_at DESC, id DESC).
    pub fn precedes(&self, job: &Job) -> bool {
        (job.created_at, job.id) < (self.created_at, self.id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobPage {
    pub jobs: Vec<Job>,
    pub next_cursor: Option<String>,
}

impl JobPage {
    pub fn from_rows(jobs: Vec<Job>, page_size: i64) -> Self {
        let next_cursor = if page_size > 0 && jobs.len() as i64 == page_size {
            jobs.last().map(|job| JobCursor::after(job).encode())
        } else {
            None
        };

        JobPage { jobs, next_cursor }
    }
}

/// Store timestamps carry microsecond precision, like a Postgres `timestamptz`.
pub fn store_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
