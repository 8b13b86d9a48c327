//! Test fixtures for creating test data
#![allow(dead_code)]

use async_trait::async_trait;
use ruforo_moderation::app_config::ModerationConfig;
use ruforo_moderation::moderation::category::NewCategory;
use ruforo_moderation::moderation::content::{
    Community, ContentStore, Post, PostComment, User,
};
use ruforo_moderation::moderation::reports::NewReport;
use ruforo_moderation::orm::moderated_objects::ObjectType;
use ruforo_moderation::orm::moderation_categories::{self, Severity};
use ruforo_moderation::Moderation;
use sea_orm::{DatabaseConnection, DbErr};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Initialise logging once; later calls are no-ops
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// In-memory stand-in for the forum's content tables
#[derive(Default)]
pub struct MemoryContentStore {
    posts: Mutex<HashMap<i32, Post>>,
    comments: Mutex<HashMap<i32, PostComment>>,
    communities: Mutex<HashMap<i32, Community>>,
    users: Mutex<HashMap<i32, User>>,
}

impl MemoryContentStore {
    pub fn add_user(&self, id: i32) -> User {
        let user = User { id };
        self.users.lock().unwrap().insert(id, user.clone());
        user
    }

    pub fn add_community(&self, id: i32, creator_id: i32, staff_member_ids: &[i32]) -> Community {
        let community = Community {
            id,
            creator_id,
            staff_member_ids: staff_member_ids.to_vec(),
        };
        self.communities
            .lock()
            .unwrap()
            .insert(id, community.clone());
        community
    }

    pub fn add_post(&self, id: i32, creator_id: i32, community_id: Option<i32>) -> Post {
        let post = Post {
            id,
            creator_id,
            community_id,
        };
        self.posts.lock().unwrap().insert(id, post.clone());
        post
    }

    /// Add a comment on an existing post. The comment inherits the post's community.
    pub fn add_comment(&self, id: i32, commenter_id: i32, post_id: i32) -> PostComment {
        let community_id = self
            .posts
            .lock()
            .unwrap()
            .get(&post_id)
            .and_then(|p| p.community_id);
        let comment = PostComment {
            id,
            commenter_id,
            post_id,
            community_id,
        };
        self.comments.lock().unwrap().insert(id, comment.clone());
        comment
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_post(&self, id: i32) -> Result<Option<Post>, DbErr> {
        Ok(self.posts.lock().unwrap().get(&id).cloned())
    }

    async fn find_post_comment(&self, id: i32) -> Result<Option<PostComment>, DbErr> {
        Ok(self.comments.lock().unwrap().get(&id).cloned())
    }

    async fn find_community(&self, id: i32) -> Result<Option<Community>, DbErr> {
        Ok(self.communities.lock().unwrap().get(&id).cloned())
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, DbErr> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

/// A moderation service over `db` and a fresh content store
pub fn create_test_moderation(db: DatabaseConnection) -> (Moderation, Arc<MemoryContentStore>) {
    let store = Arc::new(MemoryContentStore::default());
    let moderation = Moderation::new(db, store.clone(), &ModerationConfig::default());
    (moderation, store)
}

/// Create a category with the given severity
pub async fn create_test_category(
    moderation: &Moderation,
    name: &str,
    severity: Severity,
) -> moderation_categories::Model {
    moderation
        .categories()
        .create(
            moderation.db(),
            NewCategory {
                name: name.to_string(),
                title: format!("Test {}", name),
                description: format!("Test category {}", name),
                severity,
            },
        )
        .await
        .expect("Failed to create test category")
}

/// Build a report with no description
pub fn new_report(
    object_type: ObjectType,
    object_id: i32,
    reporter_id: i32,
    category_id: i32,
) -> NewReport {
    NewReport {
        object_type,
        object_id,
        reporter_id,
        category_id,
        description: None,
    }
}
