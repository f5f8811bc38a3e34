//! Ordering of in-memory rows.
//!
//! Missing values (a user without a profile) compare greater than any
//! present value, so they come last in ascending and first in descending
//! order. Roles sort in declaration order, as the Postgres enum does.
//! Text compares byte-wise, while Postgres uses the database collation,
//! so names and emails differing only in case or accents may come back
//! in a different order there.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use quill_core::domain::{Post, Profile, Role, Tag, User};
use quill_core::query::{
    PostField, PostOrderBy, ProfileField, ProfileOrderBy, SortOrder, TagField, TagOrderBy,
    UserField, UserOrderBy,
};

use super::state::State;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Int(i64),
    Bool(bool),
    Text(String),
    Time(DateTime<Utc>),
    Null,
}

impl From<Option<SortValue>> for SortValue {
    fn from(value: Option<SortValue>) -> Self {
        value.unwrap_or(SortValue::Null)
    }
}

/// Sort key of one row under one ordering.
pub type SortKey = (SortValue, SortOrder);

/// Stable sort by `keys`; rows equal under every key keep their order.
pub fn sort_by_keys<T>(rows: &mut [(Vec<SortKey>, T)]) {
    rows.sort_by(|(a, _), (b, _)| compare_keys(a, b));
}

fn compare_keys(a: &[SortKey], b: &[SortKey]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|((left, order), (right, _))| match order {
            SortOrder::Asc => left.cmp(right),
            SortOrder::Desc => right.cmp(left),
        })
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn count(n: usize) -> SortValue {
    SortValue::Int(n as i64)
}

pub fn user_value(user: &User, field: UserField) -> SortValue {
    match field {
        UserField::Id => SortValue::Int(user.id.into()),
        UserField::Email => SortValue::Text(user.email.clone()),
        UserField::Name => SortValue::Text(user.name.clone()),
        UserField::Role => SortValue::Int(match user.role {
            Role::User => 0,
            Role::Admin => 1,
        }),
    }
}

pub fn profile_value(profile: &Profile, field: ProfileField) -> SortValue {
    match field {
        ProfileField::Id => SortValue::Int(profile.id.into()),
        ProfileField::Bio => SortValue::Text(profile.bio.clone()),
        ProfileField::UserId => SortValue::Int(profile.user_id.into()),
    }
}

pub fn post_value(post: &Post, field: PostField) -> SortValue {
    match field {
        PostField::Id => SortValue::Int(post.id.into()),
        PostField::CreatedAt => SortValue::Time(post.created_at),
        PostField::UpdatedAt => SortValue::Time(post.updated_at),
        PostField::Title => SortValue::Text(post.title.clone()),
        PostField::Likes => SortValue::Int(post.likes.into()),
        PostField::Published => SortValue::Bool(post.published),
        PostField::AuthorId => SortValue::Int(post.author_id.into()),
    }
}

pub fn tag_value(tag: &Tag, field: TagField) -> SortValue {
    match field {
        TagField::Id => SortValue::Int(tag.id.into()),
        TagField::Name => SortValue::Text(tag.name.clone()),
    }
}

pub fn user_key(state: &State, user: &User, order: &UserOrderBy) -> SortKey {
    match *order {
        UserOrderBy::Field(field, dir) => (user_value(user, field), dir),
        UserOrderBy::Profile(field, dir) => {
            let value = state
                .profile_of(user.id)
                .map(|profile| profile_value(profile, field));
            (value.into(), dir)
        }
        UserOrderBy::PostCount(dir) => (count(state.posts_by(user.id).count()), dir),
    }
}

pub fn profile_key(state: &State, profile: &Profile, order: &ProfileOrderBy) -> SortKey {
    match *order {
        ProfileOrderBy::Field(field, dir) => (profile_value(profile, field), dir),
        ProfileOrderBy::User(field, dir) => {
            let value = state
                .users
                .get(&profile.user_id)
                .map(|user| user_value(user, field));
            (value.into(), dir)
        }
    }
}

pub fn post_key(state: &State, post: &Post, order: &PostOrderBy) -> SortKey {
    match *order {
        PostOrderBy::Field(field, dir) => (post_value(post, field), dir),
        PostOrderBy::Author(field, dir) => {
            let value = state
                .users
                .get(&post.author_id)
                .map(|user| user_value(user, field));
            (value.into(), dir)
        }
        PostOrderBy::TagCount(dir) => (count(state.tags_of(post.id).count()), dir),
    }
}

pub fn tag_key(state: &State, tag: &Tag, order: &TagOrderBy) -> SortKey {
    match *order {
        TagOrderBy::Field(field, dir) => (tag_value(tag, field), dir),
        TagOrderBy::PostCount(dir) => (count(state.posts_of(tag.id).count()), dir),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_values_sort_last_ascending_first_descending() {
        let present = (SortValue::Text("a".to_string()), SortOrder::Asc);
        let missing = (SortValue::Null, SortOrder::Asc);
        assert_eq!(
            compare_keys(&[present.clone()], &[missing.clone()]),
            Ordering::Less
        );

        let present = (present.0, SortOrder::Desc);
        let missing = (missing.0, SortOrder::Desc);
        assert_eq!(compare_keys(&[present], &[missing]), Ordering::Greater);
    }

    #[test]
    fn later_keys_break_ties() {
        let mut rows = vec![
            (vec![(SortValue::Int(1), SortOrder::Asc), (SortValue::Int(1), SortOrder::Desc)], "a"),
            (vec![(SortValue::Int(1), SortOrder::Asc), (SortValue::Int(2), SortOrder::Desc)], "b"),
            (vec![(SortValue::Int(0), SortOrder::Asc), (SortValue::Int(0), SortOrder::Desc)], "c"),
        ];
        sort_by_keys(&mut rows);
        let order: Vec<&str> = rows.iter().map(|(_, name)| *name).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
    }
}
