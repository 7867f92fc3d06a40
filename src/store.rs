//! Flat-file JSON collections, one array per file.
//!
//! The database is the source of truth. These files are the interchange format
//! for legacy data directories: imported once at startup, exported on shutdown.

use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{communities::Community, members::Membership, messages::Message};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Communities,
    CommunityMembers,
    CommunityMessages,
}

impl Collection {
    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Communities => "communities.json",
            Collection::CommunityMembers => "community-members.json",
            Collection::CommunityMessages => "community-messages.json",
        }
    }

    pub fn path(self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Reads a collection. Anything unreadable counts as empty; records that do
/// not fit `T` are skipped.
pub async fn read<T: DeserializeOwned>(dir: &Path, collection: Collection) -> Vec<T> {
    let path = collection.path(dir);
    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to read collection");
            return Vec::new();
        }
    };
    if content.trim().is_empty() {
        return Vec::new();
    }

    let records = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(records)) => records,
        Ok(_) => {
            tracing::warn!(path = %path.display(), "collection is not a JSON array");
            return Vec::new();
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "collection is not valid JSON");
            return Vec::new();
        }
    };

    records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match serde_json::from_value(record) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(path = %path.display(), index = i, %err, "skipping malformed record");
                None
            }
        })
        .collect()
}

/// Replaces a collection with `records`. Returns false on any failure.
pub async fn write<T: Serialize>(dir: &Path, collection: Collection, records: &[T]) -> bool {
    let path = collection.path(dir);
    match try_write(dir, &path, records).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to write collection");
            false
        }
    }
}

async fn try_write<T: Serialize>(dir: &Path, path: &Path, records: &[T]) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let content = serde_json::to_string_pretty(records)?;

    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub communities: usize,
    pub members: usize,
    pub messages: usize,
    pub skipped: usize,
}

/// Loads a legacy data directory. Records whose id already exists, or that
/// break a constraint, are skipped.
pub async fn import(db_pool: &SqlitePool, dir: &Path) -> anyhow::Result<ImportReport> {
    let mut report = ImportReport::default();

    for community in read::<Community>(dir, Collection::Communities).await {
        let updated_at = if community.updated_at.is_empty() {
            &community.created_at
        } else {
            &community.updated_at
        };
        let result = sqlx::query(
            "INSERT OR IGNORE INTO communities (id,name,category,description,creator_msme_id,is_public,status,created_at,updated_at,suspended_by,suspended_at) VALUES (?,?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(&community.id)
        .bind(&community.name)
        .bind(&community.category)
        .bind(&community.description)
        .bind(&community.creator_msme_id)
        .bind(community.is_public)
        .bind(community.status)
        .bind(&community.created_at)
        .bind(updated_at)
        .bind(&community.suspended_by)
        .bind(&community.suspended_at)
        .execute(db_pool)
        .await;
        tally(&mut report.communities, &mut report.skipped, &community.id, result);
    }

    for member in read::<Membership>(dir, Collection::CommunityMembers).await {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO community_members (id,community_id,msme_id,role,status,joined_at,left_at) VALUES (?,?,?,?,?,?,?)",
        )
        .bind(&member.id)
        .bind(&member.community_id)
        .bind(&member.msme_id)
        .bind(member.role)
        .bind(member.status)
        .bind(&member.joined_at)
        .bind(&member.left_at)
        .execute(db_pool)
        .await;
        tally(&mut report.members, &mut report.skipped, &member.id, result);
    }

    for message in read::<Message>(dir, Collection::CommunityMessages).await {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO community_messages (id,community_id,msme_id,msme_name,msme_email,body,created_at) VALUES (?,?,?,?,?,?,?)",
        )
        .bind(&message.id)
        .bind(&message.community_id)
        .bind(&message.msme_id)
        .bind(&message.msme_name)
        .bind(&message.msme_email)
        .bind(&message.body)
        .bind(&message.created_at)
        .execute(db_pool)
        .await;
        tally(&mut report.messages, &mut report.skipped, &message.id, result);
    }

    Ok(report)
}

fn tally(
    imported: &mut usize,
    skipped: &mut usize,
    id: &str,
    result: Result<sqlx::sqlite::SqliteQueryResult, sqlx::Error>,
) {
    match result {
        Ok(done) if done.rows_affected() > 0 => *imported += 1,
        Ok(_) => *skipped += 1,
        Err(err) => {
            tracing::warn!(%id, %err, "skipping record that violates a constraint");
            *skipped += 1;
        }
    }
}

/// Writes every table out as its flat-file collection.
pub async fn export(db_pool: &SqlitePool, dir: &Path) -> anyhow::Result<()> {
    let communities: Vec<Community> =
        sqlx::query_as("SELECT * FROM communities ORDER BY created_at, rowid")
            .fetch_all(db_pool)
            .await?;
    let members: Vec<Membership> =
        sqlx::query_as("SELECT * FROM community_members ORDER BY joined_at, rowid")
            .fetch_all(db_pool)
            .await?;
    let messages: Vec<Message> =
        sqlx::query_as("SELECT * FROM community_messages ORDER BY created_at, rowid")
            .fetch_all(db_pool)
            .await?;

    let written = write(dir, Collection::Communities, &communities).await
        & write(dir, Collection::CommunityMembers, &members).await
        & write(dir, Collection::CommunityMessages, &messages).await;
    anyhow::ensure!(written, "failed to export to {}", dir.display());

    tracing::info!(
        dir = %dir.display(),
        communities = communities.len(),
        members = members.len(),
        messages = messages.len(),
        "exported collections"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<Value> = read(dir.path(), Collection::Communities).await;
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn corrupt_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = Collection::Communities.path(dir.path());

        tokio::fs::write(&path, "[{\"id\": ").await.unwrap();
        assert!(read::<Value>(dir.path(), Collection::Communities).await.is_empty());

        tokio::fs::write(&path, "{\"id\": \"c1\"}").await.unwrap();
        assert!(read::<Value>(dir.path(), Collection::Communities).await.is_empty());

        tokio::fs::write(&path, "  \n").await.unwrap();
        assert!(read::<Value>(dir.path(), Collection::Communities).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            Collection::CommunityMessages.path(dir.path()),
            r#"[
                {"id":"1","community_id":"c1","msme_id":"m1","body":"hi","created_at":"2024-01-01T00:00:00.000Z"},
                {"id":"2","community_id":"c1"}
            ]"#,
        )
        .await
        .unwrap();

        let messages: Vec<Message> = read(dir.path(), Collection::CommunityMessages).await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "1");
        assert_eq!(messages[0].msme_name, "");
    }

    #[tokio::test]
    async fn write_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data").join("nested");

        let records = vec![serde_json::json!({ "id": "c1" })];
        assert!(write(&nested, Collection::Communities, &records).await);
        assert!(!Collection::Communities.path(&nested).with_extension("json.tmp").exists());

        let back: Vec<Value> = read(&nested, Collection::Communities).await;
        assert_eq!(back, records);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let records: Vec<Value> = Vec::new();
        assert!(!write(&blocker, Collection::Communities, &records).await);
    }
}
