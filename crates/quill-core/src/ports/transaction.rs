//! Independently specified writes that can be batched into a transaction.

use serde::Serialize;

use super::repository::{Record, Repository, Store};
use crate::domain::{Post, Profile, Tag, User};
use crate::error::RepoError;
use crate::query::Filter;
use crate::schema::{EntityKind, deletion_order};

/// One write against a single record type.
#[derive(Debug, Clone)]
pub enum Write<R: Record> {
    Create(R::Create),
    CreateMany(Vec<R::Create>),
    Update {
        key: R::Key,
        data: R::Update,
    },
    UpdateMany {
        filter: Option<Filter<R::Predicate>>,
        data: R::Update,
    },
    Upsert {
        key: R::Key,
        update: R::Update,
        create: R::Create,
    },
    Delete(R::Key),
    DeleteMany(Option<Filter<R::Predicate>>),
}

impl<R: Record> Write<R> {
    pub async fn apply(self, repo: &dyn Repository<R>) -> Result<Outcome<R>, RepoError> {
        let outcome = match self {
            Self::Create(data) => Outcome::Record(repo.create(data).await?),
            Self::CreateMany(data) => Outcome::count(repo.create_many(data).await?),
            Self::Update { key, data } => Outcome::Record(repo.update(key, data).await?),
            Self::UpdateMany { filter, data } => {
                Outcome::count(repo.update_many(filter, data).await?)
            }
            Self::Upsert {
                key,
                update,
                create,
            } => Outcome::Record(repo.upsert(key, update, create).await?),
            Self::Delete(key) => Outcome::Record(repo.delete(key).await?),
            Self::DeleteMany(filter) => Outcome::count(repo.delete_many(filter).await?),
        };
        Ok(outcome)
    }
}

/// Result of one write: the affected row, or a row count for batch writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outcome<R> {
    Record(R),
    Count { count: u64 },
}

impl<R> Outcome<R> {
    pub fn count(count: u64) -> Self {
        Self::Count { count }
    }
}

/// A write against any record type.
#[derive(Debug, Clone)]
pub enum Mutation {
    User(Write<User>),
    Profile(Write<Profile>),
    Post(Write<Post>),
    Tag(Write<Tag>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MutationOutcome {
    User(Outcome<User>),
    Profile(Outcome<Profile>),
    Post(Outcome<Post>),
    Tag(Outcome<Tag>),
}

impl MutationOutcome {
    /// Row count reported by a batch write.
    pub fn affected(&self) -> Option<u64> {
        match self {
            Self::User(Outcome::Count { count })
            | Self::Profile(Outcome::Count { count })
            | Self::Post(Outcome::Count { count })
            | Self::Tag(Outcome::Count { count }) => Some(*count),
            _ => None,
        }
    }
}

impl Mutation {
    /// Removes every row of `kind`.
    pub fn delete_all(kind: EntityKind) -> Self {
        match kind {
            EntityKind::User => Self::User(Write::DeleteMany(None)),
            EntityKind::Profile => Self::Profile(Write::DeleteMany(None)),
            EntityKind::Post => Self::Post(Write::DeleteMany(None)),
            EntityKind::Tag => Self::Tag(Write::DeleteMany(None)),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Self::User(_) => EntityKind::User,
            Self::Profile(_) => EntityKind::Profile,
            Self::Post(_) => EntityKind::Post,
            Self::Tag(_) => EntityKind::Tag,
        }
    }

    pub async fn apply(self, store: &dyn Store) -> Result<MutationOutcome, RepoError> {
        let outcome = match self {
            Self::User(write) => MutationOutcome::User(write.apply(User::repository(store)).await?),
            Self::Profile(write) => {
                MutationOutcome::Profile(write.apply(Profile::repository(store)).await?)
            }
            Self::Post(write) => MutationOutcome::Post(write.apply(Post::repository(store)).await?),
            Self::Tag(write) => MutationOutcome::Tag(write.apply(Tag::repository(store)).await?),
        };
        Ok(outcome)
    }
}

macro_rules! mutation_from_write {
    ($($record:ident),*) => {
        $(
            impl From<Write<$record>> for Mutation {
                fn from(write: Write<$record>) -> Self {
                    Self::$record(write)
                }
            }
        )*
    };
}

mutation_from_write!(User, Profile, Post, Tag);

/// Deletes of every table in dependency order, dependents first.
pub fn clear_all() -> Vec<Mutation> {
    deletion_order()
        .into_iter()
        .map(Mutation::delete_all)
        .collect()
}

/// Applies `mutations` one at a time, stopping at the first failure.
/// Stores call this with a session whose effects they can discard.
pub async fn apply_in_order(
    store: &dyn Store,
    mutations: Vec<Mutation>,
) -> Result<Vec<MutationOutcome>, RepoError> {
    let mut outcomes = Vec::with_capacity(mutations.len());
    for (index, mutation) in mutations.into_iter().enumerate() {
        let kind = mutation.kind();
        let outcome = mutation.apply(store).await.inspect_err(|e| {
            tracing::warn!(step = index, entity = %kind, error = %e, "Transaction step failed");
        })?;
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_all_follows_deletion_order() {
        let kinds: Vec<EntityKind> = clear_all().iter().map(Mutation::kind).collect();
        assert_eq!(kinds, deletion_order());
    }

    #[test]
    fn count_outcome_serializes_as_count_object() {
        let outcome = MutationOutcome::Tag(Outcome::count(3));
        assert_eq!(outcome.affected(), Some(3));
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            serde_json::json!({ "count": 3 })
        );
    }
}
