use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tag::TagLink;
use crate::error::RepoError;
use crate::ports::{Record, Repository, Store};
use crate::query::{Filter, IntFilter, PostField, PostFilter, PostOrderBy, PostPredicate};
use crate::schema::EntityKind;

/// Post record - authored by exactly one user, tagged with any number of tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub title: String,
    pub likes: i32,
    pub published: bool,
    pub author_id: i32,
}

/// Post content without an author, as nested under a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub likes: i32,
    pub published: bool,
    pub tags: Vec<TagLink>,
}

impl PostDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            likes: 0,
            published: false,
            tags: Vec::new(),
        }
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    pub fn likes(mut self, likes: i32) -> Self {
        self.likes = likes;
        self
    }

    pub fn tag(mut self, link: TagLink) -> Self {
        self.tags.push(link);
        self
    }

    /// Attaches the draft to an author.
    pub fn by(self, author_id: i32) -> NewPost {
        NewPost {
            author_id,
            draft: self,
        }
    }

    pub fn validate(&self) -> Result<(), RepoError> {
        if self.likes < 0 {
            return Err(RepoError::Validation(
                "likes must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Payload for creating a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: i32,
    pub draft: PostDraft,
}

impl NewPost {
    pub fn new(author_id: i32, title: impl Into<String>) -> Self {
        PostDraft::new(title).by(author_id)
    }

    pub fn tag(mut self, link: TagLink) -> Self {
        self.draft.tags.push(link);
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.draft.published = published;
        self
    }

    pub fn has_nested_writes(&self) -> bool {
        !self.draft.tags.is_empty()
    }
}

/// Change to an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntUpdate {
    Set(i32),
    Increment(i32),
    Decrement(i32),
}

impl IntUpdate {
    /// New value given the current one, `None` on overflow.
    pub fn apply(self, current: i32) -> Option<i32> {
        match self {
            Self::Set(value) => Some(value),
            Self::Increment(by) => current.checked_add(by),
            Self::Decrement(by) => current.checked_sub(by),
        }
    }
}

/// Field changes for a post. Every applied update refreshes `updated_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub likes: Option<IntUpdate>,
    pub published: Option<bool>,
}

impl PostUpdate {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn likes(mut self, change: IntUpdate) -> Self {
        self.likes = Some(change);
        self
    }

    pub fn published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.likes.is_none() && self.published.is_none()
    }

    /// Applies the changes to an in-memory copy of the row. A result that
    /// would leave `likes` negative is a constraint violation; one that
    /// leaves the `i32` range fails as a query error, as on PostgreSQL.
    pub fn apply_to(&self, post: &mut Post, updated_at: DateTime<Utc>) -> Result<(), RepoError> {
        if let Some(change) = self.likes {
            let likes = change.apply(post.likes).ok_or_else(|| {
                RepoError::Query(format!("likes of post {}: integer out of range", post.id))
            })?;
            if likes < 0 {
                return Err(RepoError::Constraint(format!(
                    "likes of post {} must stay non-negative",
                    post.id
                )));
            }
            post.likes = likes;
        }
        if let Some(title) = &self.title {
            post.title = title.clone();
        }
        if let Some(published) = self.published {
            post.published = published;
        }
        post.updated_at = updated_at;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostKey {
    Id(i32),
}

impl PostKey {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            Self::Id(id) => post.id == *id,
        }
    }
}

impl Record for Post {
    const KIND: EntityKind = EntityKind::Post;

    type Key = PostKey;
    type Create = NewPost;
    type Update = PostUpdate;
    type Predicate = PostPredicate;
    type OrderBy = PostOrderBy;

    fn id(&self) -> i32 {
        self.id
    }

    fn id_in(ids: Vec<i32>) -> PostFilter {
        Filter::Where(PostPredicate::Id(IntFilter::In(ids)))
    }

    fn id_ascending() -> PostOrderBy {
        PostField::Id.asc()
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.posts()
    }

    fn validate_create(data: &NewPost) -> Result<(), RepoError> {
        data.draft.validate()
    }

    fn validate_update(data: &PostUpdate) -> Result<(), RepoError> {
        match data.likes {
            Some(IntUpdate::Set(value)) if value < 0 => Err(RepoError::Validation(
                "likes must be non-negative".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(likes: i32) -> Post {
        let now = crate::domain::now();
        Post {
            id: 1,
            created_at: now,
            updated_at: now,
            title: "Learn Rust".to_string(),
            likes,
            published: false,
            author_id: 1,
        }
    }

    #[test]
    fn increment_and_decrement() {
        let mut row = post(0);
        let later = crate::domain::touch(row.updated_at);
        PostUpdate::default()
            .likes(IntUpdate::Increment(2))
            .apply_to(&mut row, later)
            .unwrap();
        assert_eq!(row.likes, 2);
        assert_eq!(row.updated_at, later);

        let err = PostUpdate::default()
            .likes(IntUpdate::Decrement(3))
            .apply_to(&mut row, later)
            .unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
        assert_eq!(row.likes, 2);
    }

    #[test]
    fn overflow_is_not_a_constraint_violation() {
        let mut row = post(i32::MAX);
        let err = PostUpdate::default()
            .likes(IntUpdate::Increment(1))
            .apply_to(&mut row, crate::domain::now())
            .unwrap_err();
        assert!(matches!(err, RepoError::Query(ref m) if m.contains("out of range")));
        assert_eq!(row.likes, i32::MAX);
    }

    #[test]
    fn negative_absolute_likes_rejected() {
        let update = PostUpdate::default().likes(IntUpdate::Set(-1));
        assert!(matches!(
            Post::validate_update(&update),
            Err(RepoError::Validation(_))
        ));
    }
}
