//! Per-record access to the in-memory tables.

use std::collections::BTreeMap;

use quill_core::domain::{
    self, NewPost, NewProfile, NewTag, NewUser, Post, PostKey, PostUpdate, Profile, ProfileKey,
    ProfileUpdate, Tag, TagKey, TagUpdate, User, UserKey, UserUpdate,
};
use quill_core::error::RepoError;
use quill_core::ports::Record;
use quill_core::query::Filter;

use super::eval::{post_matches, profile_matches, tag_matches, user_matches};
use super::sort::{SortKey, post_key, profile_key, tag_key, user_key};
use super::state::State;

/// A record type backed by one table of [`State`].
pub trait Table: Record {
    fn rows(state: &State) -> &BTreeMap<i32, Self>;

    fn find_key(state: &State, key: &Self::Key) -> Option<Self>;

    fn matches(state: &State, row: &Self, filter: &Filter<Self::Predicate>) -> bool;

    fn sort_key(state: &State, row: &Self, order: &Self::OrderBy) -> SortKey;

    fn insert(state: &mut State, data: &Self::Create) -> Result<Self, RepoError>;

    fn update(state: &mut State, id: i32, data: &Self::Update) -> Result<Self, RepoError>;

    fn remove(state: &mut State, id: i32) -> Result<Self, RepoError>;

    fn has_nested_writes(_data: &Self::Create) -> bool {
        false
    }
}

impl Table for User {
    fn rows(state: &State) -> &BTreeMap<i32, Self> {
        &state.users
    }

    fn find_key(state: &State, key: &UserKey) -> Option<Self> {
        state.users.values().find(|u| key.matches(u)).cloned()
    }

    fn matches(state: &State, row: &Self, filter: &Filter<Self::Predicate>) -> bool {
        user_matches(state, row, filter)
    }

    fn sort_key(state: &State, row: &Self, order: &Self::OrderBy) -> SortKey {
        user_key(state, row, order)
    }

    fn insert(state: &mut State, data: &NewUser) -> Result<Self, RepoError> {
        state.insert_user(data)
    }

    fn update(state: &mut State, id: i32, data: &UserUpdate) -> Result<Self, RepoError> {
        state.update_user(id, data)
    }

    fn remove(state: &mut State, id: i32) -> Result<Self, RepoError> {
        state.remove_user(id)
    }

    fn has_nested_writes(data: &NewUser) -> bool {
        data.has_nested_writes()
    }
}

impl Table for Profile {
    fn rows(state: &State) -> &BTreeMap<i32, Self> {
        &state.profiles
    }

    fn find_key(state: &State, key: &ProfileKey) -> Option<Self> {
        state.profiles.values().find(|p| key.matches(p)).cloned()
    }

    fn matches(state: &State, row: &Self, filter: &Filter<Self::Predicate>) -> bool {
        profile_matches(state, row, filter)
    }

    fn sort_key(state: &State, row: &Self, order: &Self::OrderBy) -> SortKey {
        profile_key(state, row, order)
    }

    fn insert(state: &mut State, data: &NewProfile) -> Result<Self, RepoError> {
        state.insert_profile(data)
    }

    fn update(state: &mut State, id: i32, data: &ProfileUpdate) -> Result<Self, RepoError> {
        state.update_profile(id, data)
    }

    fn remove(state: &mut State, id: i32) -> Result<Self, RepoError> {
        state.remove_profile(id)
    }
}

impl Table for Post {
    fn rows(state: &State) -> &BTreeMap<i32, Self> {
        &state.posts
    }

    fn find_key(state: &State, key: &PostKey) -> Option<Self> {
        state.posts.values().find(|p| key.matches(p)).cloned()
    }

    fn matches(state: &State, row: &Self, filter: &Filter<Self::Predicate>) -> bool {
        post_matches(state, row, filter)
    }

    fn sort_key(state: &State, row: &Self, order: &Self::OrderBy) -> SortKey {
        post_key(state, row, order)
    }

    fn insert(state: &mut State, data: &NewPost) -> Result<Self, RepoError> {
        state.insert_post(data, domain::now())
    }

    fn update(state: &mut State, id: i32, data: &PostUpdate) -> Result<Self, RepoError> {
        state.update_post(id, data)
    }

    fn remove(state: &mut State, id: i32) -> Result<Self, RepoError> {
        state.remove_post(id)
    }

    fn has_nested_writes(data: &NewPost) -> bool {
        data.has_nested_writes()
    }
}

impl Table for Tag {
    fn rows(state: &State) -> &BTreeMap<i32, Self> {
        &state.tags
    }

    fn find_key(state: &State, key: &TagKey) -> Option<Self> {
        state.tag_by_key(key).cloned()
    }

    fn matches(state: &State, row: &Self, filter: &Filter<Self::Predicate>) -> bool {
        tag_matches(state, row, filter)
    }

    fn sort_key(state: &State, row: &Self, order: &Self::OrderBy) -> SortKey {
        tag_key(state, row, order)
    }

    fn insert(state: &mut State, data: &NewTag) -> Result<Self, RepoError> {
        state.insert_tag(data)
    }

    fn update(state: &mut State, id: i32, data: &TagUpdate) -> Result<Self, RepoError> {
        state.update_tag(id, data)
    }

    fn remove(state: &mut State, id: i32) -> Result<Self, RepoError> {
        state.remove_tag(id)
    }
}
