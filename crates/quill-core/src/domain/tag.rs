use serde::{Deserialize, Serialize};

use crate::ports::{Record, Repository, Store};
use crate::query::{Filter, IntFilter, TagField, TagFilter, TagOrderBy, TagPredicate};
use crate::schema::EntityKind;

/// Tag record with a unique name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTag {
    pub name: String,
}

impl NewTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagUpdate {
    pub name: Option<String>,
}

impl TagUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
    }

    pub fn apply_to(&self, tag: &mut Tag) {
        if let Some(name) = &self.name {
            tag.name = name.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKey {
    Id(i32),
    Name(String),
}

impl TagKey {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn matches(&self, tag: &Tag) -> bool {
        match self {
            Self::Id(id) => tag.id == *id,
            Self::Name(name) => tag.name == *name,
        }
    }
}

/// How a post being created is linked to a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagLink {
    /// Create a new tag; fails if the name is taken.
    Create(NewTag),
    /// Link an existing tag; fails if it does not exist.
    Connect(TagKey),
    /// Link the tag with this name, creating it when missing.
    ConnectOrCreate(NewTag),
}

impl TagLink {
    pub fn create(name: impl Into<String>) -> Self {
        Self::Create(NewTag::new(name))
    }

    pub fn connect(id: i32) -> Self {
        Self::Connect(TagKey::Id(id))
    }

    pub fn connect_or_create(name: impl Into<String>) -> Self {
        Self::ConnectOrCreate(NewTag::new(name))
    }
}

/// A row of the post/tag link table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PostTag {
    pub post_id: i32,
    pub tag_id: i32,
}

/// Which side of the link table to look up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkScope {
    Posts(Vec<i32>),
    Tags(Vec<i32>),
}

impl LinkScope {
    pub fn contains(&self, link: &PostTag) -> bool {
        match self {
            Self::Posts(ids) => ids.contains(&link.post_id),
            Self::Tags(ids) => ids.contains(&link.tag_id),
        }
    }
}

impl Record for Tag {
    const KIND: EntityKind = EntityKind::Tag;

    type Key = TagKey;
    type Create = NewTag;
    type Update = TagUpdate;
    type Predicate = TagPredicate;
    type OrderBy = TagOrderBy;

    fn id(&self) -> i32 {
        self.id
    }

    fn id_in(ids: Vec<i32>) -> TagFilter {
        Filter::Where(TagPredicate::Id(IntFilter::In(ids)))
    }

    fn id_ascending() -> TagOrderBy {
        TagField::Id.asc()
    }

    fn repository(store: &dyn Store) -> &dyn Repository<Self> {
        store.tags()
    }
}
