use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::usermodel::{User, UserProfile, UserProfileUpdate, UserRole};

// Email format and password strength are checked by the auth service so that
// failures map onto its fixed set of messages.
#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPhoneDto {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    pub password: String,
    pub role: UserRole,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginPhoneDto {
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Role cannot change after registration.
#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(url(message = "Avatar must be a URL"))]
    pub avatar: Option<String>,
    pub skills: Option<Vec<String>>,
    #[validate(length(max = 500, message = "Experience must be at most 500 characters"))]
    pub experience: Option<String>,
    pub location: Option<String>,
    #[validate(custom = "validate_hourly_rate")]
    pub hourly_rate: Option<f64>,
}

fn validate_hourly_rate(rate: f64) -> Result<(), ValidationError> {
    if rate.is_finite() && rate > 0.0 {
        return Ok(());
    }
    let mut error = ValidationError::new("hourly_rate");
    error.message = Some(Cow::Borrowed("Hourly rate must be positive"));
    Err(error)
}

impl From<UpdateProfileDto> for UserProfileUpdate {
    fn from(dto: UpdateProfileDto) -> Self {
        UserProfileUpdate {
            name: dto.name,
            avatar_url: dto.avatar,
            skills: dto.skills,
            experience: dto.experience,
            location: dto.location,
            hourly_rate: dto.hourly_rate,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FilterUserDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub profile: UserProfile,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl FilterUserDto {
    pub fn filter_user(user: &User) -> Self {
        FilterUserDto {
            id: user.id.to_string(),
            name: user.name.to_owned(),
            email: user.email.to_owned(),
            role: user.role.to_str().to_string(),
            phone: user.phone.clone(),
            profile: user.profile(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserData {
    pub user: FilterUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserLoginResponseDto {
    pub token: String,
    pub user: FilterUserDto,
}

#[derive(Serialize, Deserialize)]
pub struct Response {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_rate_must_be_above_zero() {
        for rate in [0.0, -5.0] {
            let dto = UpdateProfileDto {
                hourly_rate: Some(rate),
                ..UpdateProfileDto::default()
            };
            let errors = dto.validate().unwrap_err();
            assert_eq!(
                errors.field_errors()["hourly_rate"][0].message.as_deref(),
                Some("Hourly rate must be positive")
            );
        }

        let dto = UpdateProfileDto {
            hourly_rate: Some(150.0),
            ..UpdateProfileDto::default()
        };
        assert!(dto.validate().is_ok());
    }
}
