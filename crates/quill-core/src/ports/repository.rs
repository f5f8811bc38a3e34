use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::transaction::{Mutation, MutationOutcome};
use crate::domain::{LinkScope, Post, PostTag, Profile, Tag, User};
use crate::error::RepoError;
use crate::query::{Filter, FindArgs};
use crate::schema::EntityKind;

/// A record type stored in its own table, together with the payload,
/// key, predicate and ordering types used to operate on it.
pub trait Record: fmt::Debug + Clone + Serialize + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Unique lookup key.
    type Key: fmt::Debug + Clone + Send + Sync + 'static;
    type Create: fmt::Debug + Clone + Send + Sync + 'static;
    type Update: fmt::Debug + Clone + Default + Send + Sync + 'static;
    type Predicate: fmt::Debug + Clone + Send + Sync + 'static;
    type OrderBy: fmt::Debug + Clone + Send + Sync + 'static;

    fn id(&self) -> i32;

    /// Filter selecting rows by primary key.
    fn id_in(ids: Vec<i32>) -> Filter<Self::Predicate>;

    fn id_ascending() -> Self::OrderBy;

    /// The repository for this record type within `store`.
    fn repository(store: &dyn Store) -> &dyn Repository<Self>;

    /// Checks a create payload before it reaches the store.
    fn validate_create(_data: &Self::Create) -> Result<(), RepoError> {
        Ok(())
    }

    /// Checks an update payload before it reaches the store.
    fn validate_update(_data: &Self::Update) -> Result<(), RepoError> {
        Ok(())
    }
}

/// Typed CRUD operations over one record type.
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    /// Insert one row, writing nested related rows in the same unit.
    async fn create(&self, data: R::Create) -> Result<R, RepoError>;

    /// Insert a batch without nested writes. All rows or none are stored.
    async fn create_many(&self, data: Vec<R::Create>) -> Result<u64, RepoError>;

    async fn find_unique(&self, key: R::Key) -> Result<Option<R>, RepoError>;

    async fn find_first(&self, args: FindArgs<R>) -> Result<Option<R>, RepoError> {
        let rows = self.find_many(args.take(1)).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_many(&self, args: FindArgs<R>) -> Result<Vec<R>, RepoError>;

    async fn count(&self, filter: Option<Filter<R::Predicate>>) -> Result<u64, RepoError>;

    /// Update the row with `key`. Fails with `NotFound` if there is none.
    async fn update(&self, key: R::Key, data: R::Update) -> Result<R, RepoError>;

    /// Update every matching row; matching nothing is not an error.
    async fn update_many(
        &self,
        filter: Option<Filter<R::Predicate>>,
        data: R::Update,
    ) -> Result<u64, RepoError>;

    /// Update the row with `key` if it exists, otherwise insert `create`.
    async fn upsert(&self, key: R::Key, update: R::Update, create: R::Create)
    -> Result<R, RepoError>;

    /// Remove the row with `key` and return it.
    async fn delete(&self, key: R::Key) -> Result<R, RepoError>;

    /// Remove every matching row, or every row when `filter` is `None`.
    async fn delete_many(&self, filter: Option<Filter<R::Predicate>>) -> Result<u64, RepoError>;
}

/// A session against one backing store.
#[async_trait]
pub trait Store: Send + Sync {
    fn users(&self) -> &dyn Repository<User>;

    fn profiles(&self) -> &dyn Repository<Profile>;

    fn posts(&self) -> &dyn Repository<Post>;

    fn tags(&self) -> &dyn Repository<Tag>;

    /// Post/tag link rows touching the given side.
    async fn links(&self, scope: LinkScope) -> Result<Vec<PostTag>, RepoError>;

    /// Apply `mutations` in order; either all take effect or none do.
    async fn transaction(&self, mutations: Vec<Mutation>)
    -> Result<Vec<MutationOutcome>, RepoError>;
}
