use chrono::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Employer,
    Worker,
}

impl UserRole {
    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Employer => "employer",
            UserRole::Worker => "worker",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, sqlx::FromRow, Clone)]
pub struct User {
    pub id: uuid::Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    pub avatar_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Optional worker/employer details shown on a profile page.
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct UserProfile {
    pub avatar: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            avatar: self.avatar_url.clone(),
            skills: self.skills.clone(),
            experience: self.experience.clone(),
            location: self.location.clone(),
            hourly_rate: self.hourly_rate,
        }
    }
}

/// Fields written when a user registers.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub phone: Option<String>,
}

/// Partial profile update. `None` leaves the stored value untouched.
#[derive(Debug, Default, Clone)]
pub struct UserProfileUpdate {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub skills: Option<Vec<String>>,
    pub experience: Option<String>,
    pub location: Option<String>,
    pub hourly_rate: Option<f64>,
}
