//! Directory-backed ConversationStore implementation.
//!
//! Each conversation is one JSON document. Writes go through a temp file
//! plus rename so a crash cannot leave a torn document behind.
//!
//! Directory structure:
//! ```text
//! base_dir/
//! └── conversations/
//!     ├── conversation-id-1.json
//!     └── conversation-id-2.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use mentor_core::conversation::{ConversationStore, Interaction};

/// On-disk shape of one conversation.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredConversation {
    label: Option<String>,
    interactions: Vec<Interaction>,
}

/// JSON-file conversation store.
pub struct AsyncDirConversationStore {
    conversations_dir: PathBuf,
    /// Serializes load-modify-write cycles so concurrent appends to the
    /// same document cannot clobber each other.
    write_lock: Mutex<()>,
}

impl AsyncDirConversationStore {
    /// Creates a store rooted at `base_dir`, creating the directory
    /// structure if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let conversations_dir = base_dir.as_ref().join("conversations");
        fs::create_dir_all(&conversations_dir)
            .await
            .context("Failed to create conversations directory")?;
        Ok(Self {
            conversations_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the directory conversation documents live in.
    pub fn conversations_dir(&self) -> &Path {
        &self.conversations_dir
    }

    fn document_path(&self, conversation_id: &str) -> PathBuf {
        self.conversations_dir.join(format!("{conversation_id}.json"))
    }

    async fn load_document(&self, conversation_id: &str) -> Result<Option<StoredConversation>> {
        let path = self.document_path(conversation_id);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("Failed to read conversation document"),
        };
        let document = serde_json::from_str(&content)
            .context("Failed to parse conversation document")?;
        Ok(Some(document))
    }

    async fn save_document(
        &self,
        conversation_id: &str,
        document: &StoredConversation,
    ) -> Result<()> {
        let path = self.document_path(conversation_id);
        let tmp_path = self.conversations_dir.join(format!("{conversation_id}.json.tmp"));

        let content = serde_json::to_string_pretty(document)
            .context("Failed to serialize conversation document")?;
        fs::write(&tmp_path, content)
            .await
            .context("Failed to write conversation document")?;
        fs::rename(&tmp_path, &path)
            .await
            .context("Failed to move conversation document into place")?;
        Ok(())
    }

}

#[async_trait]
impl ConversationStore for AsyncDirConversationStore {
    async fn append_interaction(
        &self,
        conversation_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document(conversation_id).await?.unwrap_or_default();
        document.interactions.push(Interaction::new(question, answer));
        self.save_document(conversation_id, &document).await
    }

    async fn load_interactions(&self, conversation_id: &str) -> Result<Vec<Interaction>> {
        Ok(self
            .load_document(conversation_id)
            .await?
            .map(|document| document.interactions)
            .unwrap_or_default())
    }

    async fn set_label(&self, conversation_id: &str, label: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.load_document(conversation_id).await?.unwrap_or_default();
        document.label = Some(label.to_string());
        self.save_document(conversation_id, &document).await
    }

    async fn get_label(&self, conversation_id: &str) -> Result<Option<String>> {
        Ok(self
            .load_document(conversation_id)
            .await?
            .and_then(|document| document.label))
    }

    async fn delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(self.document_path(conversation_id)).await {
            Ok(()) => {
                debug!(conversation_id, "deleted conversation document");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).context("Failed to delete conversation document"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_append_and_load_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = AsyncDirConversationStore::new(temp_dir.path()).await.unwrap();

        store
            .append_interaction("conv-1", "first question", "first answer")
            .await
            .unwrap();
        store
            .append_interaction("conv-1", "second question", "second answer")
            .await
            .unwrap();

        let interactions = store.load_interactions("conv-1").await.unwrap();
        assert_eq!(interactions.len(), 2);
        assert_eq!(interactions[0].question, "first question");
        assert_eq!(interactions[1].answer, "second answer");
    }

    #[tokio::test]
    async fn test_missing_conversation_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = AsyncDirConversationStore::new(temp_dir.path()).await.unwrap();

        assert!(store.load_interactions("nope").await.unwrap().is_empty());
        assert_eq!(store.get_label("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_label_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = AsyncDirConversationStore::new(temp_dir.path()).await.unwrap();

        store
            .append_interaction("conv-1", "q", "a")
            .await
            .unwrap();
        store.set_label("conv-1", "Hash Tables").await.unwrap();

        assert_eq!(
            store.get_label("conv-1").await.unwrap(),
            Some("Hash Tables".to_string())
        );
        // Label writes do not disturb the history.
        assert_eq!(store.load_interactions("conv-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let temp_dir = TempDir::new().unwrap();
        let store = AsyncDirConversationStore::new(temp_dir.path()).await.unwrap();

        store.append_interaction("conv-1", "q", "a").await.unwrap();
        store.delete_conversation("conv-1").await.unwrap();

        assert!(store.load_interactions("conv-1").await.unwrap().is_empty());
        // Deleting a missing conversation is not an error.
        store.delete_conversation("conv-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_conversations_are_separate_documents() {
        let temp_dir = TempDir::new().unwrap();
        let store = AsyncDirConversationStore::new(temp_dir.path()).await.unwrap();

        store.append_interaction("a", "qa", "aa").await.unwrap();
        store.append_interaction("b", "qb", "ab").await.unwrap();

        assert_eq!(store.load_interactions("a").await.unwrap().len(), 1);
        assert_eq!(store.load_interactions("b").await.unwrap().len(), 1);
        assert_eq!(
            store.load_interactions("a").await.unwrap()[0].question,
            "qa"
        );
    }
}
