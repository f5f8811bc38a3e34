use serde::{Deserialize, Serialize};

use crate::ports::{Record, Repository, Store};
use crate::query::{
    Filter, IntFilter, ProfileField, ProfileFilter, ProfileOrderBy, ProfilePredicate,
};
use crate::schema::EntityKind;

/// Profile record, one-to-one with a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i32,
    pub bio: String,
    pub user_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub user_id: i32,
    pub bio: String,
}

impl NewProfile {
    pub fn new(user_id: i32, bio: impl Into<String>) -> Self {
        Self {
            user_id,
            bio: bio.into(),
        }
    }
}

/// Field changes for a profile. The owning user cannot be changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub bio: Option<String>,
}

impl ProfileUpdate {
    pub fn bio(mut self, bio: impl Into<String>) -> Self {
        self.bio = Some(bio.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bio.is_none()
    }

    pub fn apply_to(&self, profile: &mut Profile) {
        if let Some(bio) = &self.bio {
            profile.bio = bio.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileKey {
    Id(i32),
    UserId(i32),
}

impl ProfileKey {
    pub fn matches(&self, profile: &Profile) -> bool {
        match self {
            Self::Id(id) => profile.id == *id,
            Self::UserId(user_id) => profile.user_id == *user_id,
        }
    }
}

impl Record for Profile {
    const KIND: EntityKind = EntityKind::Profile;

    type Key = ProfileKey;
    type Create = NewProfile;
    type Update = ProfileUpdate;
    type Predicate = ProfilePredicate;
    type OrderBy = ProfileOrderBy;

    fn id(&self) -> i32 {
        self.id
    }

    fn id_in(ids: Vec<i32>) -> ProfileFilter {
        Filter::Where(ProfilePredicate::Id(IntFilter::In(ids)))
    }

    fn id_ascending() -> ProfileOrderBy {
        ProfileField::Id.asc()
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.profiles()
    }
}
