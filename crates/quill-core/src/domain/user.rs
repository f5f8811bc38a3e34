use std::fmt;

use serde::{Deserialize, Serialize};

use super::post::PostDraft;
use crate::error::RepoError;
use crate::ports::{Record, Repository, Store};
use crate::query::{Filter, IntFilter, UserField, UserOrderBy, UserPredicate, UserFilter};
use crate::schema::EntityKind;

/// Access level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record. Owns at most one profile and any number of posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
}

/// Payload for creating a user, optionally with a profile and posts.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub profile_bio: Option<String>,
    pub posts: Vec<PostDraft>,
}

impl NewUser {
    /// A plain user with the default role and no related rows.
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            password_hash: password_hash.into(),
            role: Role::default(),
            profile_bio: None,
            posts: Vec::new(),
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn profile(mut self, bio: impl Into<String>) -> Self {
        self.profile_bio = Some(bio.into());
        self
    }

    pub fn post(mut self, post: PostDraft) -> Self {
        self.posts.push(post);
        self
    }

    pub fn has_nested_writes(&self) -> bool {
        self.profile_bio.is_some() || !self.posts.is_empty()
    }
}

/// Field changes for a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl UserUpdate {
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.name.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
    }

    /// Applies the changes to an in-memory copy of the row.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(role) = self.role {
            user.role = role;
        }
    }
}

/// Unique keys of a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKey {
    Id(i32),
    Email(String),
}

impl UserKey {
    pub fn email(email: impl Into<String>) -> Self {
        Self::Email(email.into())
    }

    pub fn matches(&self, user: &User) -> bool {
        match self {
            Self::Id(id) => user.id == *id,
            Self::Email(email) => user.email == *email,
        }
    }
}

impl Record for User {
    const KIND: EntityKind = EntityKind::User;

    type Key = UserKey;
    type Create = NewUser;
    type Update = UserUpdate;
    type Predicate = UserPredicate;
    type OrderBy = UserOrderBy;

    fn id(&self) -> i32 {
        self.id
    }

    fn id_in(ids: Vec<i32>) -> UserFilter {
        Filter::Where(UserPredicate::Id(IntFilter::In(ids)))
    }

    fn id_ascending() -> UserOrderBy {
        UserField::Id.asc()
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.users()
    }

    fn validate_create(data: &NewUser) -> Result<(), RepoError> {
        data.posts.iter().try_for_each(PostDraft::validate)
    }
}
