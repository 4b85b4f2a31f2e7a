// db/memory.rs
//! In-process document store with the same semantics as the Postgres client.
//! Used when no database is configured and throughout the test suite.
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    applicationdb::ApplicationExt,
    chatdb::ChatExt,
    db::StoreError,
    jobdb::JobExt,
    userdb::UserExt,
};
use crate::models::{
    chatmodels::*,
    jobmodel::*,
    usermodel::{NewUser, User, UserProfileUpdate},
};

#[derive(Debug, Default)]
struct Collections {
    users: HashMap<Uuid, User>,
    jobs: HashMap<Uuid, Job>,
    applications: HashMap<Uuid, JobApplication>,
    chats: HashMap<Uuid, Chat>,
    // Append-only, in insertion order.
    messages: Vec<Message>,
}

#[derive(Debug, Default)]
pub struct MemoryDb {
    collections: RwLock<Collections>,
    outage: RwLock<Option<String>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every subsequent call fails with `StoreError::Unavailable(reason)`.
    #[cfg(test)]
    pub async fn simulate_outage(&self, reason: impl Into<String>) {
        *self.outage.write().await = Some(reason.into());
    }

    #[cfg(test)]
    pub async fn restore(&self) {
        *self.outage.write().await = None;
    }

    async fn check(&self) -> Result<(), StoreError> {
        match self.outage.read().await.as_ref() {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserExt for MemoryDb {
    async fn get_user(
        &self,
        user_id: Option<Uuid>,
        email: Option<&str>,
    ) -> Result<Option<User>, StoreError> {
        self.check().await?;
        let collections = self.collections.read().await;

        let user = if let Some(user_id) = user_id {
            collections.users.get(&user_id).cloned()
        } else if let Some(email) = email {
            collections.users.values().find(|u| u.email == email).cloned()
        } else {
            None
        };

        Ok(user)
    }

    async fn save_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.check().await?;
        let mut collections = self.collections.write().await;

        if collections.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }

        let now = store_timestamp();
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password: user.password,
            role: user.role,
            phone: user.phone,
            avatar_url: None,
            skills: None,
            experience: None,
            location: None,
            hourly_rate: None,
            created_at: now,
            updated_at: now,
        };
        collections.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: UserProfileUpdate,
    ) -> Result<User, StoreError> {
        self.check().await?;
        let mut collections = self.collections.write().await;

        let user = collections
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::not_found("users", user_id))?;

        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(avatar) = update.avatar_url {
            user.avatar_url = Some(avatar);
        }
        if let Some(skills) = update.skills {
            user.skills = Some(skills);
        }
        if let Some(experience) = update.experience {
            user.experience = Some(experience);
        }
        if let Some(location) = update.location {
            user.location = Some(location);
        }
        if let Some(rate) = update.hourly_rate {
            user.hourly_rate = Some(rate);
        }
        user.updated_at = store_timestamp();

        Ok(user.clone())
    }

    async fn touch_user(&self, user_id: Uuid) -> Result<(), StoreError> {
        self.check().await?;
        let mut collections = self.collections.write().await;

        if let Some(user) = collections.users.get_mut(&user_id) {
            user.updated_at = store_timestamp();
        }
        Ok(())
    }
}

#[async_trait]
impl JobExt for MemoryDb {
    async fn create_job(&self, job: NewJob) -> Result<Job, StoreError> {
        self.check().await?;
        let now = store_timestamp();
        let job = Job {
            id: Uuid::new_v4(),
            title: job.title,
            description: job.description,
            category: job.category,
            location: job.location,
            hourly_rate: job.hourly_rate,
            duration: job.duration,
            employer_id: job.employer_id,
            employer_name: job.employer_name,
            status: JobStatus::Open,
            skills: job.skills,
            experience: job.experience,
            created_at: now,
            updated_at: now,
        };

        self.collections.write().await.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job_by_id(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        self.check().await?;
        Ok(self.collections.read().await.jobs.get(&job_id).cloned())
    }

    async fn list_jobs(
        &self,
        filter: &JobFilter,
        page_size: i64,
        after: Option<JobCursor>,
    ) -> Result<Vec<Job>, StoreError> {
        self.check().await?;
        let collections = self.collections.read().await;

        let mut jobs: Vec<Job> = collections
            .jobs
            .values()
            .filter(|job| filter.matches(job))
            .filter(|job| after.map_or(true, |cursor| cursor.precedes(job)))
            .cloned()
            .collect();

        newest_first(&mut jobs, |job| (job.created_at, job.id));
        jobs.truncate(page_size.max(0) as usize);

        Ok(jobs)
    }

    async fn update_job(&self, job_id: Uuid, update: &JobUpdate) -> Result<Job, StoreError> {
        self.check().await?;
        let mut collections = self.collections.write().await;

        let job = collections
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| StoreError::not_found("jobs", job_id))?;

        update.apply_to(job);
        job.updated_at = store_timestamp();

        Ok(job.clone())
    }

    async fn delete_job(&self, job_id: Uuid) -> Result<(), StoreError> {
        self.check().await?;
        self.collections.write().await.jobs.remove(&job_id);
        Ok(())
    }

    async fn get_jobs_by_employer(&self, employer_id: Uuid) -> Result<Vec<Job>, StoreError> {
        self.check().await?;
        let collections = self.collections.read().await;

        let mut jobs: Vec<Job> = collections
            .jobs
            .values()
            .filter(|job| job.employer_id == employer_id)
            .cloned()
            .collect();

        newest_first(&mut jobs, |job| (job.created_at, job.id));
        Ok(jobs)
    }
}

#[async_trait]
impl ApplicationExt for MemoryDb {
    async fn create_application(
        &self,
        application: NewApplication,
    ) -> Result<JobApplication, StoreError> {
        self.check().await?;
        let now = store_timestamp();
        let application = JobApplication {
            id: Uuid::new_v4(),
            job_id: application.job_id,
            worker_id: application.worker_id,
            worker_name: application.worker_name,
            worker_phone: application.worker_phone,
            status: ApplicationStatus::Pending,
            message: application.message,
            applied_at: now,
            updated_at: now,
        };

        self.collections
            .write()
            .await
            .applications
            .insert(application.id, application.clone());
        Ok(application)
    }

    async fn get_application_by_id(
        &self,
        application_id: Uuid,
    ) -> Result<Option<JobApplication>, StoreError> {
        self.check().await?;
        Ok(self
            .collections
            .read()
            .await
            .applications
            .get(&application_id)
            .cloned())
    }

    async fn get_job_applications(&self, job_id: Uuid) -> Result<Vec<JobApplication>, StoreError> {
        self.check().await?;
        let collections = self.collections.read().await;

        let mut applications: Vec<JobApplication> = collections
            .applications
            .values()
            .filter(|a| a.job_id == job_id)
            .cloned()
            .collect();

        newest_first(&mut applications, |a| (a.applied_at, a.id));
        Ok(applications)
    }

    async fn get_worker_applications(
        &self,
        worker_id: Uuid,
    ) -> Result<Vec<JobApplication>, StoreError> {
        self.check().await?;
        let collections = self.collections.read().await;

        let mut applications: Vec<JobApplication> = collections
            .applications
            .values()
            .filter(|a| a.worker_id == worker_id)
            .cloned()
            .collect();

        newest_first(&mut applications, |a| (a.applied_at, a.id));
        Ok(applications)
    }

    async fn update_application_status(
        &self,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<JobApplication, StoreError> {
        self.check().await?;
        let mut collections = self.collections.write().await;

        let application = collections
            .applications
            .get_mut(&application_id)
            .ok_or_else(|| StoreError::not_found("applications", application_id))?;

        application.status = status;
        application.updated_at = store_timestamp();

        Ok(application.clone())
    }
}

#[async_trait]
impl ChatExt for MemoryDb {
    async fn get_or_create_chat(&self, chat: NewChat) -> Result<Chat, StoreError> {
        self.check().await?;
        let mut collections = self.collections.write().await;

        let existing = collections.chats.values().find(|c| {
            c.job_id == chat.job_id && c.employer_id == chat.employer_id && c.worker_id == chat.worker_id
        });
        if let Some(existing) = existing {
            return Ok(existing.clone());
        }

        let now = store_timestamp();
        let chat = Chat {
            id: Uuid::new_v4(),
            job_id: chat.job_id,
            employer_id: chat.employer_id,
            worker_id: chat.worker_id,
            employer_name: chat.employer_name,
            worker_name: chat.worker_name,
            last_message: None,
            last_message_time: None,
            unread_count: 0,
            created_at: now,
            updated_at: now,
        };
        collections.chats.insert(chat.id, chat.clone());

        Ok(chat)
    }

    async fn get_chat_by_id(&self, chat_id: Uuid) -> Result<Option<Chat>, StoreError> {
        self.check().await?;
        Ok(self.collections.read().await.chats.get(&chat_id).cloned())
    }

    async fn get_user_chats(&self, user_id: Uuid) -> Result<Vec<Chat>, StoreError> {
        self.check().await?;
        let collections = self.collections.read().await;

        let mut chats: Vec<Chat> = collections
            .chats
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect();

        newest_first(&mut chats, |c| (c.updated_at, c.id));
        Ok(chats)
    }

    async fn send_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.check().await?;
        let mut collections = self.collections.write().await;

        if !collections.chats.contains_key(&message.chat_id) {
            return Err(StoreError::not_found("chats", message.chat_id));
        }

        // Never step back behind the chat's latest message, even if the clock does.
        let latest = collections
            .messages
            .iter()
            .filter(|m| m.chat_id == message.chat_id)
            .map(|m| m.timestamp)
            .max();
        let timestamp = match latest {
            Some(latest) => latest.max(store_timestamp()),
            None => store_timestamp(),
        };

        let message = Message {
            id: Uuid::new_v4(),
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            content: message.content,
            message_type: message.message_type,
            read: false,
            timestamp,
        };
        collections.messages.push(message.clone());

        if let Some(chat) = collections.chats.get_mut(&message.chat_id) {
            chat.last_message = Some(message.content.clone());
            chat.last_message_time = Some(timestamp);
            chat.updated_at = timestamp;
            chat.unread_count += 1;
        }

        Ok(message)
    }

    async fn get_chat_messages(
        &self,
        chat_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let messages = self.get_all_chat_messages(chat_id).await?;
        let skip = messages.len().saturating_sub(limit.max(0) as usize);

        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn get_all_chat_messages(&self, chat_id: Uuid) -> Result<Vec<Message>, StoreError> {
        self.check().await?;
        let collections = self.collections.read().await;

        let mut messages: Vec<Message> = collections
            .messages
            .iter()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();

        // Stable: equal timestamps keep insertion order.
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    async fn mark_messages_as_read(
        &self,
        chat_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, StoreError> {
        self.check().await?;
        let mut collections = self.collections.write().await;

        let mut changed = 0;
        for message in collections
            .messages
            .iter_mut()
            .filter(|m| m.chat_id == chat_id && m.sender_id != user_id && !m.read)
        {
            message.read = true;
            changed += 1;
        }

        if let Some(chat) = collections.chats.get_mut(&chat_id) {
            chat.unread_count = 0;
            chat.updated_at = store_timestamp();
        }

        Ok(changed)
    }
}
