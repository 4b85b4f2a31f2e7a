pub mod auth_service;
pub mod error;
pub mod job_service;
pub mod messaging_service;
pub mod storage_service;
