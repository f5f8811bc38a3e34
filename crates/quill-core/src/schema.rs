//! Schema catalog: entity kinds, their scalar fields, relations and the
//! foreign-key references that constrain deletion.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The record types managed by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    User,
    Profile,
    Post,
    Tag,
}

impl EntityKind {
    /// All kinds in declaration order.
    pub const ALL: [EntityKind; 4] = [Self::User, Self::Profile, Self::Post, Self::Tag];

    pub fn name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Profile => "Profile",
            Self::Post => "Post",
            Self::Tag => "Tag",
        }
    }

    /// Scalar field names as they appear in rendered documents.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Self::User => &["id", "email", "name", "password_hash", "role"],
            Self::Profile => &["id", "bio", "user_id"],
            Self::Post => &[
                "id",
                "created_at",
                "updated_at",
                "title",
                "likes",
                "published",
                "author_id",
            ],
            Self::Tag => &["id", "name"],
        }
    }

    pub fn has_field(self, field: &str) -> bool {
        self.fields().contains(&field)
    }

    /// Relations navigable from this kind.
    pub fn relations(self) -> &'static [Relation] {
        match self {
            Self::User => &[Relation::UserProfile, Relation::UserPosts],
            Self::Profile => &[Relation::ProfileUser],
            Self::Post => &[Relation::PostAuthor, Relation::PostTags],
            Self::Tag => &[Relation::TagPosts],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How many rows sit on the far side of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Zero or one related row, rendered as an object or `null`.
    One,
    /// Any number of related rows, rendered as an array.
    Many,
}

/// A navigable relation between two kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    UserProfile,
    UserPosts,
    ProfileUser,
    PostAuthor,
    PostTags,
    TagPosts,
}

impl Relation {
    /// Key under which the related rows are rendered.
    pub fn name(self) -> &'static str {
        match self {
            Self::UserProfile => "profile",
            Self::UserPosts => "posts",
            Self::ProfileUser => "user",
            Self::PostAuthor => "author",
            Self::PostTags => "tags",
            Self::TagPosts => "posts",
        }
    }

    pub fn source(self) -> EntityKind {
        match self {
            Self::UserProfile | Self::UserPosts => EntityKind::User,
            Self::ProfileUser => EntityKind::Profile,
            Self::PostAuthor | Self::PostTags => EntityKind::Post,
            Self::TagPosts => EntityKind::Tag,
        }
    }

    pub fn target(self) -> EntityKind {
        match self {
            Self::UserProfile => EntityKind::Profile,
            Self::UserPosts | Self::TagPosts => EntityKind::Post,
            Self::ProfileUser | Self::PostAuthor => EntityKind::User,
            Self::PostTags => EntityKind::Tag,
        }
    }

    pub fn cardinality(self) -> Cardinality {
        match self {
            Self::UserProfile | Self::ProfileUser | Self::PostAuthor => Cardinality::One,
            Self::UserPosts | Self::PostTags | Self::TagPosts => Cardinality::Many,
        }
    }
}

/// A restricting foreign key: rows of `from` point at rows of `to`, so a
/// `to` row cannot be removed while a `from` row still references it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    pub from: EntityKind,
    pub column: &'static str,
    pub to: EntityKind,
}

/// Restricting references between entities. Post/Tag links are not
/// listed: link rows are removed together with either side.
pub const REFERENCES: &[Reference] = &[
    Reference {
        from: EntityKind::Profile,
        column: "user_id",
        to: EntityKind::User,
    },
    Reference {
        from: EntityKind::Post,
        column: "author_id",
        to: EntityKind::User,
    },
];

/// Order in which whole tables can be emptied without tripping a
/// restricting reference: every kind comes after all kinds that
/// reference it. Ties go to the later-declared kind.
pub fn deletion_order() -> Vec<EntityKind> {
    let mut remaining: Vec<EntityKind> = EntityKind::ALL.to_vec();
    let mut order = Vec::with_capacity(remaining.len());

    while !remaining.is_empty() {
        let ready = remaining.iter().rposition(|kind| {
            !REFERENCES
                .iter()
                .any(|r| r.to == *kind && r.from != *kind && remaining.contains(&r.from))
        });
        match ready {
            Some(index) => order.push(remaining.remove(index)),
            // Only reachable if REFERENCES ever gains a cycle.
            None => {
                order.append(&mut remaining);
                break;
            }
        }
    }

    order
}
