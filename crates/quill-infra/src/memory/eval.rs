//! Direct evaluation of filter trees against the in-memory tables.

use quill_core::domain::{Post, Profile, Tag, User};
use quill_core::query::{
    PostFilter, PostPredicate, ProfileFilter, ProfilePredicate, TagFilter, TagPredicate,
    UserFilter, UserPredicate,
};

use super::state::State;

pub fn user_matches(state: &State, user: &User, filter: &UserFilter) -> bool {
    filter.evaluate(&mut |predicate| user_predicate(state, user, predicate))
}

pub fn profile_matches(state: &State, profile: &Profile, filter: &ProfileFilter) -> bool {
    filter.evaluate(&mut |predicate| profile_predicate(state, profile, predicate))
}

pub fn post_matches(state: &State, post: &Post, filter: &PostFilter) -> bool {
    filter.evaluate(&mut |predicate| post_predicate(state, post, predicate))
}

pub fn tag_matches(state: &State, tag: &Tag, filter: &TagFilter) -> bool {
    filter.evaluate(&mut |predicate| tag_predicate(state, tag, predicate))
}

fn user_predicate(state: &State, user: &User, predicate: &UserPredicate) -> bool {
    match predicate {
        UserPredicate::Id(f) => f.matches(user.id),
        UserPredicate::Email(f) => f.matches(&user.email),
        UserPredicate::Name(f) => f.matches(&user.name),
        UserPredicate::Role(role) => user.role == *role,
        UserPredicate::Profile(filter) => state
            .profile_of(user.id)
            .is_some_and(|profile| profile_matches(state, profile, filter)),
        UserPredicate::Posts(list) => list.matches(state.posts_by(user.id), |post, filter| {
            post_matches(state, post, filter)
        }),
    }
}

fn profile_predicate(state: &State, profile: &Profile, predicate: &ProfilePredicate) -> bool {
    match predicate {
        ProfilePredicate::Id(f) => f.matches(profile.id),
        ProfilePredicate::Bio(f) => f.matches(&profile.bio),
        ProfilePredicate::UserId(f) => f.matches(profile.user_id),
        ProfilePredicate::User(filter) => state
            .users
            .get(&profile.user_id)
            .is_some_and(|user| user_matches(state, user, filter)),
    }
}

fn post_predicate(state: &State, post: &Post, predicate: &PostPredicate) -> bool {
    match predicate {
        PostPredicate::Id(f) => f.matches(post.id),
        PostPredicate::Title(f) => f.matches(&post.title),
        PostPredicate::Likes(f) => f.matches(post.likes),
        PostPredicate::Published(value) => post.published == *value,
        PostPredicate::AuthorId(f) => f.matches(post.author_id),
        PostPredicate::Author(filter) => state
            .users
            .get(&post.author_id)
            .is_some_and(|user| user_matches(state, user, filter)),
        PostPredicate::Tags(list) => list.matches(state.tags_of(post.id), |tag, filter| {
            tag_matches(state, tag, filter)
        }),
    }
}

fn tag_predicate(state: &State, tag: &Tag, predicate: &TagPredicate) -> bool {
    match predicate {
        TagPredicate::Id(f) => f.matches(tag.id),
        TagPredicate::Name(f) => f.matches(&tag.name),
        TagPredicate::Posts(list) => list.matches(state.posts_of(tag.id), |post, filter| {
            post_matches(state, post, filter)
        }),
    }
}
