use anyhow::Result;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikedItem {
    pub uri: String,
    pub liked_at: DateTime<Utc>,
}

/// One page of a paginated feed. `next` is an opaque continuation cursor.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Remote library capability consumed by the sync engine.
///
/// Implementations own transport concerns: authentication, retries, and
/// splitting `add_items` into calls under the service's batch limit.
pub trait LibraryClient {
    /// Liked items, newest first. `None` fetches the first page.
    fn list_liked_items(&self, cursor: Option<&str>) -> Result<Page<LikedItem>>;

    fn current_user_id(&self) -> Result<String>;

    /// Creates a playlist owned by `owner` and returns its id.
    fn create_collection(&self, owner: &str, name: &str) -> Result<String>;

    fn add_items(&self, collection_id: &str, uris: &[String]) -> Result<()>;

    /// Member uris of a playlist. `None` fetches the first page.
    fn list_collection_items(
        &self,
        collection_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<String>>;
}
