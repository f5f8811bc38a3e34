//! PostgreSQL-backed [`Store`].

use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};

use quill_core::domain::{LinkScope, Post, PostTag, Profile, Tag, User};
use quill_core::error::RepoError;
use quill_core::ports::{Mutation, MutationOutcome, Repository, Store, apply_in_order};

use super::entity::post_tag;
use super::postgres_base::{finish, id_in, map_db_err};

/// A connection the store can run statements and open transactions on:
/// a pooled [`DatabaseConnection`] or an open `DatabaseTransaction`.
pub trait StoreConnection: ConnectionTrait + TransactionTrait + Send + Sync + 'static {}

impl<T> StoreConnection for T where T: ConnectionTrait + TransactionTrait + Send + Sync + 'static {}

/// Store over a PostgreSQL connection. Bound to a transaction, the same
/// type serves as the session handed to [`Store::transaction`] steps.
pub struct PostgresStore<C = DatabaseConnection> {
    pub(crate) db: C,
}

impl<C: StoreConnection> PostgresStore<C> {
    pub fn new(db: C) -> Self {
        Self { db }
    }

    pub fn into_inner(self) -> C {
        self.db
    }
}

#[async_trait]
impl<C: StoreConnection> Store for PostgresStore<C> {
    fn users(&self) -> &dyn Repository<User> {
        self
    }

    fn profiles(&self) -> &dyn Repository<Profile> {
        self
    }

    fn posts(&self) -> &dyn Repository<Post> {
        self
    }

    fn tags(&self) -> &dyn Repository<Tag> {
        self
    }

    async fn links(&self, scope: LinkScope) -> Result<Vec<PostTag>, RepoError> {
        let condition = match &scope {
            LinkScope::Posts(ids) => id_in(post_tag::Column::PostId, ids),
            LinkScope::Tags(ids) => id_in(post_tag::Column::TagId, ids),
        };
        let rows = post_tag::Entity::find()
            .filter(condition)
            .order_by_asc(post_tag::Column::PostId)
            .order_by_asc(post_tag::Column::TagId)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn transaction(
        &self,
        mutations: Vec<Mutation>,
    ) -> Result<Vec<MutationOutcome>, RepoError> {
        let steps = mutations.len();
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let session = PostgresStore::new(txn);

        let result = apply_in_order(&session, mutations).await;
        if let Err(e) = &result {
            tracing::debug!(steps, error = %e, "Rolling back transaction");
        }
        let outcomes = finish(session.into_inner(), result).await?;

        tracing::debug!(steps, "Transaction committed");
        Ok(outcomes)
    }
}
