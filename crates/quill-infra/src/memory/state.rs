//! Tables of the in-memory store and the integrity rules the database
//! schema would otherwise enforce.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use quill_core::domain::{
    self, NewPost, NewProfile, NewTag, NewUser, Post, PostTag, PostUpdate, Profile, ProfileUpdate,
    Tag, TagKey, TagLink, TagUpdate, User, UserUpdate,
};
use quill_core::error::RepoError;
use quill_core::schema::EntityKind;

/// Next id per table. Ids are never reused, matching serial columns.
#[derive(Debug, Clone, Default)]
struct Sequences {
    user: i32,
    profile: i32,
    post: i32,
    tag: i32,
}

impl Sequences {
    fn next(&mut self, kind: EntityKind) -> i32 {
        let counter = match kind {
            EntityKind::User => &mut self.user,
            EntityKind::Profile => &mut self.profile,
            EntityKind::Post => &mut self.post,
            EntityKind::Tag => &mut self.tag,
        };
        *counter += 1;
        *counter
    }
}

/// Full contents of the store. Cloned as a draft by every write.
#[derive(Debug, Clone, Default)]
pub struct State {
    pub users: BTreeMap<i32, User>,
    pub profiles: BTreeMap<i32, Profile>,
    pub posts: BTreeMap<i32, Post>,
    pub tags: BTreeMap<i32, Tag>,
    pub links: BTreeSet<PostTag>,
    sequences: Sequences,
}

fn unique_violation(kind: EntityKind, field: &str, value: impl std::fmt::Display) -> RepoError {
    RepoError::Constraint(format!("{kind}.{field} `{value}` already exists"))
}

impl State {
    // -- navigation ---------------------------------------------------------

    pub fn profile_of(&self, user_id: i32) -> Option<&Profile> {
        self.profiles.values().find(|p| p.user_id == user_id)
    }

    pub fn posts_by(&self, author_id: i32) -> impl Iterator<Item = &Post> + '_ {
        self.posts.values().filter(move |p| p.author_id == author_id)
    }

    pub fn tags_of(&self, post_id: i32) -> impl Iterator<Item = &Tag> + '_ {
        self.links
            .iter()
            .filter(move |l| l.post_id == post_id)
            .filter_map(move |l| self.tags.get(&l.tag_id))
    }

    pub fn posts_of(&self, tag_id: i32) -> impl Iterator<Item = &Post> + '_ {
        self.links
            .iter()
            .filter(move |l| l.tag_id == tag_id)
            .filter_map(move |l| self.posts.get(&l.post_id))
    }

    pub fn tag_by_key(&self, key: &TagKey) -> Option<&Tag> {
        self.tags.values().find(|t| key.matches(t))
    }

    // -- inserts --------------------------------------------------------------

    /// Inserts a user together with its nested profile and posts.
    pub fn insert_user(&mut self, data: &NewUser) -> Result<User, RepoError> {
        if self.users.values().any(|u| u.email == data.email) {
            return Err(unique_violation(EntityKind::User, "email", &data.email));
        }
        let user = User {
            id: self.sequences.next(EntityKind::User),
            email: data.email.clone(),
            name: data.name.clone(),
            password_hash: data.password_hash.clone(),
            role: data.role,
        };
        self.users.insert(user.id, user.clone());

        if let Some(bio) = &data.profile_bio {
            self.insert_profile(&NewProfile::new(user.id, bio.clone()))?;
        }
        for draft in &data.posts {
            self.insert_post(&draft.clone().by(user.id), domain::now())?;
        }
        Ok(user)
    }

    pub fn insert_profile(&mut self, data: &NewProfile) -> Result<Profile, RepoError> {
        if !self.users.contains_key(&data.user_id) {
            return Err(RepoError::ForeignKey(format!(
                "Profile.user_id references missing User {}",
                data.user_id
            )));
        }
        if self.profile_of(data.user_id).is_some() {
            return Err(unique_violation(EntityKind::Profile, "user_id", data.user_id));
        }
        let profile = Profile {
            id: self.sequences.next(EntityKind::Profile),
            bio: data.bio.clone(),
            user_id: data.user_id,
        };
        self.profiles.insert(profile.id, profile.clone());
        Ok(profile)
    }

    /// Inserts a post and links it to the tags its payload names.
    pub fn insert_post(&mut self, data: &NewPost, now: DateTime<Utc>) -> Result<Post, RepoError> {
        if !self.users.contains_key(&data.author_id) {
            return Err(RepoError::ForeignKey(format!(
                "Post.author_id references missing User {}",
                data.author_id
            )));
        }
        if data.draft.likes < 0 {
            return Err(RepoError::Constraint(
                "Post.likes must be non-negative".to_string(),
            ));
        }
        let post = Post {
            id: self.sequences.next(EntityKind::Post),
            created_at: now,
            updated_at: now,
            title: data.draft.title.clone(),
            likes: data.draft.likes,
            published: data.draft.published,
            author_id: data.author_id,
        };
        self.posts.insert(post.id, post.clone());

        for link in &data.draft.tags {
            let tag_id = self.resolve_tag(link)?;
            self.link(post.id, tag_id)?;
        }
        Ok(post)
    }

    pub fn insert_tag(&mut self, data: &NewTag) -> Result<Tag, RepoError> {
        if self.tags.values().any(|t| t.name == data.name) {
            return Err(unique_violation(EntityKind::Tag, "name", &data.name));
        }
        let tag = Tag {
            id: self.sequences.next(EntityKind::Tag),
            name: data.name.clone(),
        };
        self.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    fn resolve_tag(&mut self, link: &TagLink) -> Result<i32, RepoError> {
        match link {
            TagLink::Create(new) => self.insert_tag(new).map(|t| t.id),
            TagLink::Connect(key) => self
                .tag_by_key(key)
                .map(|t| t.id)
                .ok_or(RepoError::not_found(EntityKind::Tag)),
            TagLink::ConnectOrCreate(new) => {
                match self.tag_by_key(&TagKey::Name(new.name.clone())) {
                    Some(existing) => Ok(existing.id),
                    None => self.insert_tag(new).map(|t| t.id),
                }
            }
        }
    }

    fn link(&mut self, post_id: i32, tag_id: i32) -> Result<(), RepoError> {
        if !self.links.insert(PostTag { post_id, tag_id }) {
            return Err(RepoError::Constraint(format!(
                "Post {post_id} is already linked to Tag {tag_id}"
            )));
        }
        Ok(())
    }

    // -- updates --------------------------------------------------------------

    pub fn update_user(&mut self, id: i32, data: &UserUpdate) -> Result<User, RepoError> {
        if let Some(email) = &data.email {
            if self.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(unique_violation(EntityKind::User, "email", email));
            }
        }
        let user = self
            .users
            .get_mut(&id)
            .ok_or(RepoError::not_found(EntityKind::User))?;
        data.apply_to(user);
        Ok(user.clone())
    }

    pub fn update_profile(&mut self, id: i32, data: &ProfileUpdate) -> Result<Profile, RepoError> {
        let profile = self
            .profiles
            .get_mut(&id)
            .ok_or(RepoError::not_found(EntityKind::Profile))?;
        data.apply_to(profile);
        Ok(profile.clone())
    }

    pub fn update_post(&mut self, id: i32, data: &PostUpdate) -> Result<Post, RepoError> {
        let post = self
            .posts
            .get_mut(&id)
            .ok_or(RepoError::not_found(EntityKind::Post))?;
        let updated_at = domain::touch(post.updated_at);
        data.apply_to(post, updated_at)?;
        Ok(post.clone())
    }

    pub fn update_tag(&mut self, id: i32, data: &TagUpdate) -> Result<Tag, RepoError> {
        if let Some(name) = &data.name {
            if self.tags.values().any(|t| t.id != id && &t.name == name) {
                return Err(unique_violation(EntityKind::Tag, "name", name));
            }
        }
        let tag = self
            .tags
            .get_mut(&id)
            .ok_or(RepoError::not_found(EntityKind::Tag))?;
        data.apply_to(tag);
        Ok(tag.clone())
    }

    // -- deletes --------------------------------------------------------------

    /// Removes a user. Fails while a profile or post still references it.
    pub fn remove_user(&mut self, id: i32) -> Result<User, RepoError> {
        if self.profile_of(id).is_some() {
            return Err(RepoError::ForeignKey(format!(
                "User {id} is still referenced by Profile.user_id"
            )));
        }
        if self.posts_by(id).next().is_some() {
            return Err(RepoError::ForeignKey(format!(
                "User {id} is still referenced by Post.author_id"
            )));
        }
        self.users
            .remove(&id)
            .ok_or(RepoError::not_found(EntityKind::User))
    }

    pub fn remove_profile(&mut self, id: i32) -> Result<Profile, RepoError> {
        self.profiles
            .remove(&id)
            .ok_or(RepoError::not_found(EntityKind::Profile))
    }

    /// Removes a post and its tag links.
    pub fn remove_post(&mut self, id: i32) -> Result<Post, RepoError> {
        let post = self
            .posts
            .remove(&id)
            .ok_or(RepoError::not_found(EntityKind::Post))?;
        self.links.retain(|l| l.post_id != id);
        Ok(post)
    }

    /// Removes a tag and its post links.
    pub fn remove_tag(&mut self, id: i32) -> Result<Tag, RepoError> {
        let tag = self
            .tags
            .remove(&id)
            .ok_or(RepoError::not_found(EntityKind::Tag))?;
        self.links.retain(|l| l.tag_id != id);
        Ok(tag)
    }
}
