use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentType {
    IdProof,
    SkillCertificate,
    Other,
}

impl DocumentType {
    pub fn to_str(&self) -> &str {
        match self {
            DocumentType::IdProof => "id-proof",
            DocumentType::SkillCertificate => "skill-certificate",
            DocumentType::Other => "other",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StoragePathQuery {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredFileDto {
    pub path: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct FileUrlDto {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct DeletedDto {
    pub deleted: usize,
}
