use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::jobmodel::*;

pub const TITLE_REQUIRED: &str = "Job title is required";
pub const DESCRIPTION_REQUIRED: &str = "Job description is required";
pub const LOCATION_REQUIRED: &str = "Location is required";
pub const RATE_REQUIRED: &str = "Valid hourly rate is required";
pub const CATEGORY_REQUIRED: &str = "Job category is required";
pub const DURATION_REQUIRED: &str = "Job duration is required";

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateJobDto {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub hourly_rate: Option<f64>,
    pub category: Option<JobCategory>,
    pub duration: Option<JobDuration>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
}

impl CreateJobDto {
    /// Every failed rule, in form order.
    pub fn validation_errors(&self) -> Vec<&'static str> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(TITLE_REQUIRED);
        }
        if self.description.trim().is_empty() {
            errors.push(DESCRIPTION_REQUIRED);
        }
        if self.location.trim().is_empty() {
            errors.push(LOCATION_REQUIRED);
        }
        if !matches!(self.hourly_rate, Some(rate) if rate.is_finite() && rate > 0.0) {
            errors.push(RATE_REQUIRED);
        }
        if self.category.is_none() {
            errors.push(CATEGORY_REQUIRED);
        }
        if self.duration.is_none() {
            errors.push(DURATION_REQUIRED);
        }

        errors
    }

    pub fn into_new_job(
        self,
        employer_id: Uuid,
        employer_name: String,
    ) -> Result<NewJob, Vec<&'static str>> {
        let errors = self.validation_errors();

        match (self.hourly_rate, self.category, self.duration) {
            (Some(hourly_rate), Some(category), Some(duration)) if errors.is_empty() => Ok(NewJob {
                title: self.title.trim().to_string(),
                description: self.description.trim().to_string(),
                category,
                location: self.location.trim().to_string(),
                hourly_rate,
                duration,
                employer_id,
                employer_name,
                skills: self.skills,
                experience: self.experience,
            }),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateJobDto {
    #[validate(custom = "validate_title")]
    pub title: Option<String>,
    #[validate(custom = "validate_description")]
    pub description: Option<String>,
    pub category: Option<JobCategory>,
    #[validate(custom = "validate_location")]
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
    pub duration: Option<JobDuration>,
    pub status: Option<JobStatus>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
}

fn not_blank(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("blank");
        error.message = Some(Cow::Borrowed(message));
        return Err(error);
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<(), ValidationError> {
    not_blank(title, "Job title cannot be empty")
}

fn validate_description(description: &str) -> Result<(), ValidationError> {
    not_blank(description, "Job description cannot be empty")
}

fn validate_location(location: &str) -> Result<(), ValidationError> {
    not_blank(location, "Location cannot be empty")
}

impl From<UpdateJobDto> for JobUpdate {
    fn from(dto: UpdateJobDto) -> Self {
        JobUpdate {
            title: dto.title,
            description: dto.description,
            category: dto.category,
            location: dto.location,
            hourly_rate: dto.hourly_rate,
            duration: dto.duration,
            status: dto.status,
            skills: dto.skills,
            experience: dto.experience,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct JobQueryDto {
    pub category: Option<JobCategory>,
    pub location: Option<String>,
    pub status: Option<JobStatus>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    #[validate(range(min = 1, max = 100, message = "Page size must be between 1 and 100"))]
    pub page_size: Option<i64>,
    pub cursor: Option<String>,
}

impl JobQueryDto {
    pub fn filter(&self) -> JobFilter {
        JobFilter {
            category: self.category,
            location: self.location.clone().filter(|l| !l.trim().is_empty()),
            status: self.status,
            min_rate: self.min_rate,
            max_rate: self.max_rate,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, Validate)]
pub struct ApplyJobDto {
    #[validate(length(max = 500, message = "Message must be at most 500 characters"))]
    pub message: Option<String>,
    pub worker_phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateApplicationStatusDto {
    pub status: ApplicationStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> CreateJobDto {
        CreateJobDto {
            title: "Paint a 2BHK".to_string(),
            description: "Two coats, walls only".to_string(),
            location: "Indore".to_string(),
            hourly_rate: Some(180.0),
            category: Some(JobCategory::Painting),
            duration: Some(JobDuration::Weekly),
            skills: None,
            experience: None,
        }
    }

    #[test]
    fn complete_job_passes() {
        assert!(complete().validation_errors().is_empty());
        assert!(complete().into_new_job(Uuid::new_v4(), "Asha".into()).is_ok());
    }

    #[test]
    fn empty_form_lists_every_rule_in_order() {
        assert_eq!(
            CreateJobDto::default().validation_errors(),
            vec![
                TITLE_REQUIRED,
                DESCRIPTION_REQUIRED,
                LOCATION_REQUIRED,
                RATE_REQUIRED,
                CATEGORY_REQUIRED,
                DURATION_REQUIRED,
            ]
        );
    }

    #[test]
    fn whitespace_only_text_counts_as_empty() {
        let dto = CreateJobDto {
            title: "   ".to_string(),
            location: "\t".to_string(),
            ..complete()
        };

        assert_eq!(dto.validation_errors(), vec![TITLE_REQUIRED, LOCATION_REQUIRED]);
    }

    #[test]
    fn non_positive_rate_is_rejected() {
        for rate in [0.0, -40.0, f64::NAN] {
            let dto = CreateJobDto {
                hourly_rate: Some(rate),
                ..complete()
            };
            assert_eq!(dto.validation_errors(), vec![RATE_REQUIRED]);
        }
    }

    #[test]
    fn missing_enums_are_reported() {
        let dto = CreateJobDto {
            category: None,
            duration: None,
            ..complete()
        };

        assert_eq!(
            dto.into_new_job(Uuid::new_v4(), "Asha".into()).unwrap_err(),
            vec![CATEGORY_REQUIRED, DURATION_REQUIRED]
        );
    }

    #[test]
    fn blank_update_fields_are_rejected() {
        let dto = UpdateJobDto {
            title: Some("  ".to_string()),
            location: Some("\n".to_string()),
            ..UpdateJobDto::default()
        };
        let errors = dto.validate().unwrap_err();
        let fields = errors.field_errors();

        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields["title"][0].message.as_deref(),
            Some("Job title cannot be empty")
        );
        assert_eq!(
            fields["location"][0].message.as_deref(),
            Some("Location cannot be empty")
        );

        let dto = UpdateJobDto {
            title: Some("Whitewash two rooms".to_string()),
            ..UpdateJobDto::default()
        };
        assert!(dto.validate().is_ok());
    }

    #[test]
    fn blank_location_filter_is_ignored() {
        let query = JobQueryDto {
            location: Some(" ".to_string()),
            ..JobQueryDto::default()
        };

        assert_eq!(query.filter().location, None);
    }
}
