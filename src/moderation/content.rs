//! Resolution of `(object_type, object_id)` references to moderatable content.
//!
//! Posts, comments, communities and users live outside this module and are
//! fetched through a [`ContentStore`]. Moderated objects themselves can also
//! be reported, and are resolved from our own tables.

use crate::error::{ModerationError, ModerationResult};
use crate::moderation::reports;
use crate::orm::moderated_objects::{self, ObjectType};
use async_trait::async_trait;
use sea_orm::{entity::*, query::*, ActiveEnum, ConnectionTrait, DbErr};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: i32,
    pub creator_id: i32,
    pub community_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostComment {
    pub id: i32,
    pub commenter_id: i32,
    pub post_id: i32,
    /// Community of the parent post
    pub community_id: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Community {
    pub id: i32,
    pub creator_id: i32,
    /// Administrators and moderators, in the order the store ranks them
    pub staff_member_ids: Vec<i32>,
}

impl Community {
    pub fn staff_member_ids(&self) -> &[i32] {
        &self.staff_member_ids
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
    pub id: i32,
}

/// Source of the content that can be reported.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_post(&self, id: i32) -> Result<Option<Post>, DbErr>;

    async fn find_post_comment(&self, id: i32) -> Result<Option<PostComment>, DbErr>;

    async fn find_community(&self, id: i32) -> Result<Option<Community>, DbErr>;

    async fn find_user(&self, id: i32) -> Result<Option<User>, DbErr>;
}

/// A resolved, moderatable piece of content.
#[derive(Clone, Debug, PartialEq)]
pub enum ModeratedContent {
    Post(Post),
    PostComment(PostComment),
    Community(Community),
    User(User),
    ModeratedObject(moderated_objects::Model),
}

impl ModeratedContent {
    /// Look up the content behind a reference. Missing content is NotFound.
    pub async fn resolve<C>(
        store: &dyn ContentStore,
        conn: &C,
        object_type: ObjectType,
        object_id: i32,
    ) -> ModerationResult<Self>
    where
        C: ConnectionTrait,
    {
        let content = match object_type {
            ObjectType::Post => store.find_post(object_id).await?.map(Self::Post),
            ObjectType::PostComment => store
                .find_post_comment(object_id)
                .await?
                .map(Self::PostComment),
            ObjectType::Community => store
                .find_community(object_id)
                .await?
                .map(Self::Community),
            ObjectType::User => store.find_user(object_id).await?.map(Self::User),
            ObjectType::ModeratedObject => moderated_objects::Entity::find_by_id(object_id)
                .one(conn)
                .await?
                .map(Self::ModeratedObject),
        };

        content.ok_or_else(|| ModerationError::not_found(object_type.label(), object_id))
    }

    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Post(_) => ObjectType::Post,
            Self::PostComment(_) => ObjectType::PostComment,
            Self::Community(_) => ObjectType::Community,
            Self::User(_) => ObjectType::User,
            Self::ModeratedObject(_) => ObjectType::ModeratedObject,
        }
    }

    pub fn object_id(&self) -> i32 {
        match self {
            Self::Post(post) => post.id,
            Self::PostComment(comment) => comment.id,
            Self::Community(community) => community.id,
            Self::User(user) => user.id,
            Self::ModeratedObject(moderated_object) => moderated_object.id,
        }
    }

    /// Community the content was posted in. Communities and users have none.
    pub fn community_id(&self) -> Option<i32> {
        match self {
            Self::Post(post) => post.community_id,
            Self::PostComment(comment) => comment.community_id,
            Self::Community(_) | Self::User(_) => None,
            Self::ModeratedObject(moderated_object) => moderated_object.community_id,
        }
    }

    pub fn owner_or_creator(&self) -> Option<i32> {
        match self {
            Self::Post(post) => Some(post.creator_id),
            Self::PostComment(comment) => Some(comment.commenter_id),
            Self::Community(community) => Some(community.creator_id),
            Self::User(user) => Some(user.id),
            Self::ModeratedObject(_) => None,
        }
    }

    /// Users who get suspended when a report against this content is upheld.
    pub async fn penalty_targets<C>(&self, conn: &C) -> ModerationResult<Vec<i32>>
    where
        C: ConnectionTrait,
    {
        Ok(match self {
            Self::Post(post) => vec![post.creator_id],
            Self::PostComment(comment) => vec![comment.commenter_id],
            Self::Community(community) => community.staff_member_ids().to_vec(),
            Self::User(user) => vec![user.id],
            Self::ModeratedObject(moderated_object) => {
                reports::reporters_of(conn, moderated_object.id)
                    .await?
                    .into_iter()
                    .collect()
            }
        })
    }

    /// Users who reported this content. Empty if it was never reported.
    pub async fn reporters<C>(&self, conn: &C) -> ModerationResult<BTreeSet<i32>>
    where
        C: ConnectionTrait,
    {
        let moderated_object = moderated_objects::Entity::find()
            .filter(moderated_objects::Column::ObjectType.eq(self.object_type().to_value()))
            .filter(moderated_objects::Column::ObjectId.eq(self.object_id()))
            .one(conn)
            .await?;

        match moderated_object {
            Some(moderated_object) => reports::reporters_of(conn, moderated_object.id).await,
            None => Ok(BTreeSet::new()),
        }
    }
}
