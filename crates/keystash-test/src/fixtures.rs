//! Blog schema fixtures.
//!
//! Models:
//!
//! | model     | relationships                                             |
//! |-----------|-----------------------------------------------------------|
//! | `post`    | `author` → author, `comments` → comment, `tags` → tag     |
//! | `author`  | `posts` → post                                            |
//! | `comment` | `post` → post                                             |
//! | `tag`     | none; persisted by the `remote` adapter                   |
//!
//! [`seed_blog`] stores two authors, three posts and three comments. Tags are
//! referenced but never stored here, since another adapter owns them.

use std::sync::Arc;

use keystash_core::{
    AdapterId, AdapterOptions, LocalAdapter, ModelDef, Schema, Snapshot, StashResult,
};
use keystash_events::EventBus;
use keystash_storage::StorageHandle;

/// Adapter id that owns the `tag` model.
pub const REMOTE_ADAPTER: &str = "remote";

/// The blog schema.
#[must_use]
pub fn blog_schema() -> Schema {
    Schema::new()
        .with_model(
            ModelDef::new("post")
                .belongs_to("author", "author")
                .has_many("comments", "comment")
                .has_many("tags", "tag"),
        )
        .with_model(ModelDef::new("author").has_many("posts", "post"))
        .with_model(ModelDef::new("comment").belongs_to("post", "post"))
        .with_model(ModelDef::new("tag"))
        .with_adapter("tag", AdapterId::new(REMOTE_ADAPTER))
}

/// In-memory storage handle on a fresh event bus.
#[must_use]
pub fn memory_handle() -> Arc<StorageHandle> {
    Arc::new(StorageHandle::memory(EventBus::new()))
}

/// Empty blog adapter over `storage`.
#[must_use]
pub fn blog_adapter(storage: Arc<StorageHandle>) -> LocalAdapter {
    LocalAdapter::new(storage, Arc::new(blog_schema()), AdapterOptions::default())
}

/// Snapshots written by [`seed_blog`], in write order.
#[must_use]
pub fn blog_snapshots() -> Vec<Snapshot> {
    vec![
        Snapshot::new("author")
            .with_id("a1")
            .attr("name", "Ann")
            .has_many("posts", ["p1", "p2"]),
        Snapshot::new("author")
            .with_id("a2")
            .attr("name", "Bob")
            .has_many("posts", ["p3"]),
        Snapshot::new("post")
            .with_id("p1")
            .attr("title", "Hello world")
            .attr("views", 10)
            .belongs_to("author", Some("a1"))
            .has_many("comments", ["c1", "c2"])
            .has_many("tags", ["t1"]),
        Snapshot::new("post")
            .with_id("p2")
            .attr("title", "Hello again")
            .attr("views", 3)
            .belongs_to("author", Some("a1"))
            .has_many("comments", ["c3"]),
        Snapshot::new("post")
            .with_id("p3")
            .attr("title", "Goodbye")
            .attr("views", 0)
            .belongs_to("author", Some("a2")),
        Snapshot::new("comment")
            .with_id("c1")
            .attr("body", "First!")
            .belongs_to("post", Some("p1")),
        Snapshot::new("comment")
            .with_id("c2")
            .attr("body", "Nice post")
            .belongs_to("post", Some("p1")),
        Snapshot::new("comment")
            .with_id("c3")
            .attr("body", "Welcome back")
            .belongs_to("post", Some("p2")),
    ]
}

/// Store the blog fixture records through `adapter`.
///
/// # Errors
///
/// Propagates the first write error.
pub async fn seed_blog(adapter: &LocalAdapter) -> StashResult<()> {
    for snapshot in blog_snapshots() {
        adapter.create_record(&snapshot).await?;
    }
    Ok(())
}

/// In-memory blog adapter with the fixture records stored.
///
/// # Panics
///
/// Panics if seeding fails.
pub async fn seeded_adapter() -> LocalAdapter {
    let adapter = blog_adapter(memory_handle());
    seed_blog(&adapter)
        .await
        .expect("Failed to seed blog fixtures");
    adapter
}
