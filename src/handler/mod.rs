pub mod auth;
pub mod chat;
pub mod jobs;
pub mod storage;
pub mod users;
