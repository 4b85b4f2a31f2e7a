// service/storage_service.rs
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

use crate::{
    db::{JobExt, Store},
    dtos::storagedtos::{DocumentType, StoredFileDto},
    service::error::ServiceError,
};

pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];
pub const IMAGE_TYPE_REJECTED: &str = "Only JPEG, PNG, and WebP images are allowed";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("{}", .0.join(", "))]
    Rejected(Vec<String>),
}

/// Path-addressed object storage. Paths are `/`-separated and relative.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Every object under `prefix`, at any depth.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        path.split('/').fold(self.root.clone(), |acc, segment| acc.join(segment))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, bytes).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        match fs::read(self.resolve(path)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let target = self.resolve(path);
        match fs::metadata(&target).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.resolve(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(path.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut found = Vec::new();
        let mut pending = vec![(self.resolve(prefix), prefix.to_string())];

        while let Some((dir, relative)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let child = format!("{}/{}", relative, name);
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), child));
                } else {
                    found.push(child);
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

const MAX_EXTENSION_CHARS: usize = 10;

/// Lower-cased suffix after the last `.`, or `bin` unless it is short plain
/// ASCII alphanumerics.
pub fn file_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_CHARS
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_ascii_lowercase()
        }
        _ => "bin".to_string(),
    }
}

pub fn content_type_for(path: &str) -> &'static str {
    match file_extension(path).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

pub fn profile_image_path(user_id: Uuid, file_name: &str) -> String {
    format!("profile-images/{}.{}", user_id, file_extension(file_name))
}

pub fn job_image_path(job_id: Uuid, index: usize, file_name: &str) -> String {
    format!("job-images/{}/image-{}.{}", job_id, index, file_extension(file_name))
}

pub fn document_path(user_id: Uuid, doc_type: DocumentType, millis: i64, file_name: &str) -> String {
    format!(
        "documents/{}/{}/{}.{}",
        user_id,
        doc_type.to_str(),
        millis,
        file_extension(file_name)
    )
}

/// Rejects absolute paths, `..` and empty segments. A single trailing `/` is
/// tolerated and dropped.
pub fn checked_path(path: &str) -> Result<&str, StorageError> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);

    let bad = trimmed.is_empty()
        || trimmed.starts_with('/')
        || trimmed.contains('\\')
        || trimmed.split('/').any(|segment| segment.is_empty() || segment == "..");

    if bad {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(trimmed)
}

/// Size limit for every upload; content type only for images.
pub fn validate_file(
    size: usize,
    content_type: &str,
    max_bytes: usize,
    require_image: bool,
) -> Vec<String> {
    let mut errors = Vec::new();

    if size > max_bytes {
        errors.push(format!(
            "File size must be less than {}MB",
            max_bytes / (1024 * 1024)
        ));
    }
    if require_image && !ALLOWED_IMAGE_TYPES.contains(&content_type.to_lowercase().as_str()) {
        errors.push(IMAGE_TYPE_REJECTED.to_string());
    }

    errors
}

/// Who a stored path belongs to, read from its layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathOwner {
    User(Uuid),
    Job(Uuid),
}

impl PathOwner {
    pub fn parse(path: &str) -> Option<Self> {
        let (root, rest) = path.split_once('/')?;

        match root {
            "profile-images" => {
                let (id, _) = rest.split_once('.')?;
                Uuid::parse_str(id).ok().map(PathOwner::User)
            }
            "documents" => {
                let (id, _) = rest.split_once('/')?;
                Uuid::parse_str(id).ok().map(PathOwner::User)
            }
            "job-images" => {
                let (id, _) = rest.split_once('/')?;
                Uuid::parse_str(id).ok().map(PathOwner::Job)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct StorageService {
    blobs: Arc<dyn BlobStore>,
    db_client: Arc<dyn Store>,
    public_base_url: String,
    max_upload_bytes: usize,
}

impl StorageService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        db_client: Arc<dyn Store>,
        public_base_url: impl Into<String>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            blobs,
            db_client,
            public_base_url: public_base_url.into(),
            max_upload_bytes,
        }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/files/{}", self.public_base_url.trim_end_matches('/'), path)
    }

    fn check(&self, file: &UploadedFile, require_image: bool) -> Result<(), StorageError> {
        let errors = validate_file(
            file.bytes.len(),
            &file.content_type,
            self.max_upload_bytes,
            require_image,
        );
        if errors.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Rejected(errors))
        }
    }

    async fn store(&self, path: String, file: &UploadedFile) -> Result<StoredFileDto, StorageError> {
        self.blobs.put(&path, &file.bytes).await?;
        tracing::debug!("stored {} ({} bytes)", path, file.bytes.len());

        Ok(StoredFileDto {
            url: self.url_for(&path),
            path,
        })
    }

    /// Whether `actor_id` may modify objects at `path`.
    pub async fn owns_path(&self, actor_id: Uuid, path: &str) -> Result<bool, ServiceError> {
        match PathOwner::parse(path) {
            Some(PathOwner::User(owner)) => Ok(owner == actor_id),
            Some(PathOwner::Job(job_id)) => Ok(self
                .db_client
                .get_job_by_id(job_id)
                .await?
                .is_some_and(|job| job.employer_id == actor_id)),
            None => Ok(false),
        }
    }

    async fn ensure_owner(&self, actor_id: Uuid, path: &str) -> Result<(), ServiceError> {
        if self.owns_path(actor_id, path).await? {
            Ok(())
        } else {
            Err(ServiceError::NotPathOwner(actor_id, path.to_string()))
        }
    }

    pub async fn upload_profile_image(
        &self,
        user_id: Uuid,
        file: UploadedFile,
    ) -> Result<StoredFileDto, ServiceError> {
        self.check(&file, true)?;
        let stored = self
            .store(profile_image_path(user_id, &file.file_name), &file)
            .await?;
        Ok(stored)
    }

    /// All files are validated before any is written; writes run concurrently.
    pub async fn upload_job_images(
        &self,
        actor_id: Uuid,
        job_id: Uuid,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<StoredFileDto>, ServiceError> {
        let job = self
            .db_client
            .get_job_by_id(job_id)
            .await?
            .ok_or(ServiceError::JobNotFound(job_id))?;
        if job.employer_id != actor_id {
            return Err(ServiceError::UnauthorizedJobAccess(actor_id, job_id));
        }

        if files.is_empty() {
            return Err(ServiceError::Validation(
                "At least one image is required".to_string(),
            ));
        }
        for file in &files {
            self.check(file, true)?;
        }

        let uploads = files
            .iter()
            .enumerate()
            .map(|(index, file)| self.store(job_image_path(job_id, index, &file.file_name), file));

        let stored = futures::future::try_join_all(uploads).await?;
        tracing::info!("stored {} images for job {}", stored.len(), job_id);

        Ok(stored)
    }

    pub async fn upload_document(
        &self,
        user_id: Uuid,
        doc_type: DocumentType,
        file: UploadedFile,
    ) -> Result<StoredFileDto, ServiceError> {
        self.check(&file, false)?;

        let path = document_path(
            user_id,
            doc_type,
            Utc::now().timestamp_millis(),
            &file.file_name,
        );
        Ok(self.store(path, &file).await?)
    }

    pub async fn file_url(&self, path: &str) -> Result<String, ServiceError> {
        let path = checked_path(path)?;

        if !self.blobs.exists(path).await? {
            return Err(StorageError::NotFound(path.to_string()).into());
        }
        Ok(self.url_for(path))
    }

    /// Documents are private: only the uploading user may fetch them.
    pub async fn read_document(
        &self,
        actor_id: Uuid,
        path: &str,
    ) -> Result<(Vec<u8>, &'static str), ServiceError> {
        let path = checked_path(path)?;
        if !path.starts_with("documents/") {
            return Err(StorageError::InvalidPath(path.to_string()).into());
        }
        self.ensure_owner(actor_id, path).await?;

        let bytes = self.blobs.read(path).await?;
        Ok((bytes, content_type_for(path)))
    }

    pub async fn delete_file(&self, actor_id: Uuid, path: &str) -> Result<(), ServiceError> {
        let path = checked_path(path)?;
        self.ensure_owner(actor_id, path).await?;

        self.blobs.delete(path).await?;
        tracing::info!("deleted {}", path);
        Ok(())
    }

    /// Deletes every object under `prefix`. Returns how many were removed.
    pub async fn delete_folder(&self, actor_id: Uuid, prefix: &str) -> Result<usize, ServiceError> {
        let prefix = checked_path(prefix)?;
        // The prefix itself must name something owned, e.g. `job-images/{id}/`.
        self.ensure_owner(actor_id, &format!("{}/", prefix)).await?;

        let paths = self.blobs.list(prefix).await?;
        let deletions = paths.iter().map(|path| self.blobs.delete(path));
        futures::future::try_join_all(deletions).await?;

        tracing::info!("deleted {} objects under {}", paths.len(), prefix);
        Ok(paths.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{jobdb::JobExt, memory::MemoryDb},
        models::jobmodel::{JobCategory, JobDuration, NewJob},
    };

    const MB: usize = 1024 * 1024;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("kaambazar-test-{}", Uuid::new_v4()))
    }

    fn setup() -> (Arc<MemoryDb>, StorageService, PathBuf) {
        let root = temp_root();
        let db = Arc::new(MemoryDb::new());
        let service = StorageService::new(
            Arc::new(LocalBlobStore::new(&root)),
            db.clone(),
            "http://localhost:8000/",
            5 * MB,
        );
        (db, service, root)
    }

    fn png(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    async fn job_for(db: &MemoryDb, employer_id: Uuid) -> Uuid {
        db.create_job(NewJob {
            title: "Shop front".to_string(),
            description: "Paint the shutter".to_string(),
            category: JobCategory::Painting,
            location: "Pune".to_string(),
            hourly_rate: 150.0,
            duration: JobDuration::Daily,
            employer_id,
            employer_name: "Asha".to_string(),
            skills: None,
            experience: None,
        })
        .await
        .unwrap()
        .id
    }

    #[test]
    fn extension_rules() {
        assert_eq!(file_extension("Photo.JPG"), "jpg");
        assert_eq!(file_extension("archive.tar.gz"), "gz");
        assert_eq!(file_extension("README"), "bin");
        assert_eq!(file_extension("trailing."), "bin");
        assert_eq!(file_extension("me.png#1"), "bin");
        assert_eq!(file_extension("x.jpg?v=2"), "bin");
        assert_eq!(file_extension("evil.png/../up"), "bin");
        assert_eq!(file_extension("scan.p d f"), "bin");
        assert_eq!(file_extension("photo.jpegjpegjpeg"), "bin");
        assert_eq!(file_extension("clip.MP4"), "mp4");
    }

    #[test]
    fn paths_follow_the_layout() {
        let user = Uuid::nil();
        assert_eq!(
            profile_image_path(user, "me.png"),
            format!("profile-images/{}.png", user)
        );
        assert_eq!(
            job_image_path(user, 2, "site.webp"),
            format!("job-images/{}/image-2.webp", user)
        );
        assert_eq!(
            document_path(user, DocumentType::IdProof, 1700000000000, "aadhaar.PDF"),
            format!("documents/{}/id-proof/1700000000000.pdf", user)
        );
    }

    #[test]
    fn file_validation_messages() {
        assert!(validate_file(MB, "image/jpeg", 5 * MB, true).is_empty());
        assert_eq!(
            validate_file(6 * MB, "image/png", 5 * MB, true),
            vec!["File size must be less than 5MB".to_string()]
        );
        assert_eq!(
            validate_file(10, "image/gif", 5 * MB, true),
            vec![IMAGE_TYPE_REJECTED.to_string()]
        );
        assert!(validate_file(10, "application/pdf", 5 * MB, false).is_empty());
    }

    #[test]
    fn unsafe_paths_are_rejected() {
        for path in ["", "/etc/passwd", "documents/../secret", "a//b", "a\\b"] {
            assert!(checked_path(path).is_err(), "{path:?} should be rejected");
        }
        assert_eq!(checked_path("job-images/x/").unwrap(), "job-images/x");
    }

    #[test]
    fn owner_is_read_from_the_path() {
        let id = Uuid::new_v4();
        assert_eq!(
            PathOwner::parse(&format!("profile-images/{}.png", id)),
            Some(PathOwner::User(id))
        );
        assert_eq!(
            PathOwner::parse(&format!("documents/{}/other/1.pdf", id)),
            Some(PathOwner::User(id))
        );
        assert_eq!(
            PathOwner::parse(&format!("job-images/{}/", id)),
            Some(PathOwner::Job(id))
        );
        assert_eq!(PathOwner::parse("misc/file.txt"), None);
    }

    #[tokio::test]
    async fn profile_image_upload_returns_a_fetchable_url() {
        let (_db, service, root) = setup();
        let user = Uuid::new_v4();

        let stored = service.upload_profile_image(user, png("me.PNG")).await.unwrap();

        assert_eq!(stored.path, format!("profile-images/{}.png", user));
        assert_eq!(
            stored.url,
            format!("http://localhost:8000/files/profile-images/{}.png", user)
        );
        assert_eq!(service.file_url(&stored.path).await.unwrap(), stored.url);
        assert!(root.join("profile-images").join(format!("{}.png", user)).exists());

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn rejected_upload_writes_nothing() {
        let (_db, service, root) = setup();
        let gif = UploadedFile {
            content_type: "image/gif".to_string(),
            ..png("anim.gif")
        };

        let err = service
            .upload_profile_image(Uuid::new_v4(), gif)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), IMAGE_TYPE_REJECTED);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn job_images_are_indexed_and_folder_delete_is_recursive() {
        let (db, service, root) = setup();
        let employer = Uuid::new_v4();
        let job_id = job_for(&db, employer).await;

        let stored = service
            .upload_job_images(employer, job_id, vec![png("a.png"), png("b.jpeg")])
            .await
            .unwrap();
        assert_eq!(stored[0].path, format!("job-images/{}/image-0.png", job_id));
        assert_eq!(stored[1].path, format!("job-images/{}/image-1.jpeg", job_id));

        let stranger = Uuid::new_v4();
        let folder = format!("job-images/{}", job_id);
        assert!(service.delete_folder(stranger, &folder).await.is_err());

        assert_eq!(service.delete_folder(employer, &folder).await.unwrap(), 2);
        assert!(matches!(
            service.file_url(&stored[0].path).await.unwrap_err(),
            ServiceError::Storage(StorageError::NotFound(_))
        ));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn only_the_job_owner_uploads_job_images() {
        let (db, service, _root) = setup();
        let job_id = job_for(&db, Uuid::new_v4()).await;

        let err = service
            .upload_job_images(Uuid::new_v4(), job_id, vec![png("a.png")])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::UnauthorizedJobAccess(_, _)));
    }

    #[tokio::test]
    async fn documents_accept_any_type_and_delete_once() {
        let (_db, service, root) = setup();
        let user = Uuid::new_v4();
        let pdf = UploadedFile {
            file_name: "certificate.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: b"%PDF-1.4".to_vec(),
        };

        let stored = service
            .upload_document(user, DocumentType::SkillCertificate, pdf)
            .await
            .unwrap();
        assert!(stored
            .path
            .starts_with(&format!("documents/{}/skill-certificate/", user)));
        assert!(stored.path.ends_with(".pdf"));

        assert!(service.delete_file(Uuid::new_v4(), &stored.path).await.is_err());
        service.delete_file(user, &stored.path).await.unwrap();

        let err = service.delete_file(user, &stored.path).await.unwrap_err();
        assert_eq!(err.to_string(), format!("File not found: {}", stored.path));

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn documents_are_readable_only_by_their_owner() {
        let (_db, service, root) = setup();
        let user = Uuid::new_v4();
        let stored = service
            .upload_document(
                user,
                DocumentType::IdProof,
                UploadedFile {
                    file_name: "aadhaar.pdf".to_string(),
                    content_type: "application/pdf".to_string(),
                    bytes: b"%PDF-1.7".to_vec(),
                },
            )
            .await
            .unwrap();

        let (bytes, content_type) = service.read_document(user, &stored.path).await.unwrap();
        assert_eq!(bytes, b"%PDF-1.7");
        assert_eq!(content_type, "application/pdf");

        let err = service
            .read_document(Uuid::new_v4(), &stored.path)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotPathOwner(_, _)));

        let err = service
            .read_document(user, &format!("profile-images/{}.png", user))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Storage(StorageError::InvalidPath(_))));

        let _ = std::fs::remove_dir_all(root);
    }
}
