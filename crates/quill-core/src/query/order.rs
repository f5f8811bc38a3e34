//! Sort keys and directions.
//!
//! Rows sort by an own column, by a column of a related single entity,
//! or by the size of a related collection. Missing related values sort
//! after present ones in ascending order and before them in descending
//! order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserField {
    Id,
    Email,
    Name,
    Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Id,
    Bio,
    UserId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostField {
    Id,
    CreatedAt,
    UpdatedAt,
    Title,
    Likes,
    Published,
    AuthorId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagField {
    Id,
    Name,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOrderBy {
    Field(UserField, SortOrder),
    /// By a column of the user's profile.
    Profile(ProfileField, SortOrder),
    /// By the number of posts the user authored.
    PostCount(SortOrder),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOrderBy {
    Field(ProfileField, SortOrder),
    User(UserField, SortOrder),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrderBy {
    Field(PostField, SortOrder),
    Author(UserField, SortOrder),
    TagCount(SortOrder),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOrderBy {
    Field(TagField, SortOrder),
    PostCount(SortOrder),
}

macro_rules! field_shorthands {
    ($($field:ty => $order:ident),* $(,)?) => {
        $(
            impl $field {
                pub fn asc(self) -> $order {
                    $order::Field(self, SortOrder::Asc)
                }

                pub fn desc(self) -> $order {
                    $order::Field(self, SortOrder::Desc)
                }
            }
        )*
    };
}

field_shorthands! {
    UserField => UserOrderBy,
    ProfileField => ProfileOrderBy,
    PostField => PostOrderBy,
    TagField => TagOrderBy,
}
