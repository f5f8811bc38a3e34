//! In-memory [`Store`], used when no database is configured and as the
//! behavioural test double for the data access layer.
//!
//! Every write runs against a draft copy of the tables that replaces the
//! live copy only when the whole operation succeeds. Readers never see a
//! half-applied write.

use async_trait::async_trait;
use tokio::sync::RwLock;

use quill_core::domain::{LinkScope, Post, PostTag, Profile, Tag, User};
use quill_core::error::RepoError;
use quill_core::ports::{Mutation, MutationOutcome, Repository, Store, apply_in_order};
use quill_core::query::{Filter, FindArgs};

use super::sort::sort_by_keys;
use super::state::State;
use super::table::Table;

/// Store holding every table behind one async `RwLock`.
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::from_state(State::default())
    }

    fn from_state(state: State) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }

    fn into_state(self) -> State {
        self.state.into_inner()
    }

    async fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        let state = self.state.read().await;
        f(&state)
    }

    /// Applies `f` to a draft of the tables, keeping the result only on success.
    async fn write<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, RepoError>,
    ) -> Result<T, RepoError> {
        let mut state = self.state.write().await;
        let mut draft = state.clone();
        let value = f(&mut draft)?;
        *state = draft;
        Ok(value)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matching_ids<R: Table>(state: &State, filter: Option<&Filter<R::Predicate>>) -> Vec<i32> {
    R::rows(state)
        .values()
        .filter(|row| filter.is_none_or(|f| R::matches(state, row, f)))
        .map(|row| row.id())
        .collect()
}

fn select<R: Table>(state: &State, args: &FindArgs<R>) -> Vec<R> {
    let mut keyed: Vec<_> = R::rows(state)
        .values()
        .filter(|row| {
            args.filter
                .as_ref()
                .is_none_or(|f| R::matches(state, row, f))
        })
        .map(|row| {
            let keys = args
                .order_by
                .iter()
                .map(|order| R::sort_key(state, row, order))
                .collect();
            (keys, row)
        })
        .collect();
    sort_by_keys(&mut keyed);

    let skip = args.skip.map_or(0, |n| n as usize);
    let take = args.take.map_or(usize::MAX, |n| n as usize);
    keyed
        .into_iter()
        .skip(skip)
        .take(take)
        .map(|(_, row)| row.clone())
        .collect()
}

#[async_trait]
impl<R: Table> Repository<R> for InMemoryStore {
    async fn create(&self, data: R::Create) -> Result<R, RepoError> {
        R::validate_create(&data)?;
        let row = self.write(|state| R::insert(state, &data)).await?;
        tracing::debug!(entity = %R::KIND, id = row.id(), "Row created");
        Ok(row)
    }

    async fn create_many(&self, data: Vec<R::Create>) -> Result<u64, RepoError> {
        if data.iter().any(R::has_nested_writes) {
            return Err(RepoError::Validation(format!(
                "create_many does not accept nested writes ({})",
                R::KIND
            )));
        }
        data.iter().try_for_each(R::validate_create)?;
        self.write(|state| {
            for row in &data {
                R::insert(state, row)?;
            }
            Ok(data.len() as u64)
        })
        .await
    }

    async fn find_unique(&self, key: R::Key) -> Result<Option<R>, RepoError> {
        Ok(self.read(|state| R::find_key(state, &key)).await)
    }

    async fn find_many(&self, args: FindArgs<R>) -> Result<Vec<R>, RepoError> {
        Ok(self.read(|state| select(state, &args)).await)
    }

    async fn count(&self, filter: Option<Filter<R::Predicate>>) -> Result<u64, RepoError> {
        let ids = self
            .read(|state| matching_ids::<R>(state, filter.as_ref()))
            .await;
        Ok(ids.len() as u64)
    }

    async fn update(&self, key: R::Key, data: R::Update) -> Result<R, RepoError> {
        R::validate_update(&data)?;
        self.write(|state| {
            let row = R::find_key(state, &key).ok_or(RepoError::not_found(R::KIND))?;
            R::update(state, row.id(), &data)
        })
        .await
    }

    async fn update_many(
        &self,
        filter: Option<Filter<R::Predicate>>,
        data: R::Update,
    ) -> Result<u64, RepoError> {
        R::validate_update(&data)?;
        self.write(|state| {
            let ids = matching_ids::<R>(state, filter.as_ref());
            for id in &ids {
                R::update(state, *id, &data)?;
            }
            Ok(ids.len() as u64)
        })
        .await
    }

    async fn upsert(
        &self,
        key: R::Key,
        update: R::Update,
        create: R::Create,
    ) -> Result<R, RepoError> {
        R::validate_update(&update)?;
        R::validate_create(&create)?;
        self.write(|state| match R::find_key(state, &key) {
            Some(row) => R::update(state, row.id(), &update),
            None => R::insert(state, &create),
        })
        .await
    }

    async fn delete(&self, key: R::Key) -> Result<R, RepoError> {
        self.write(|state| {
            let row = R::find_key(state, &key).ok_or(RepoError::not_found(R::KIND))?;
            R::remove(state, row.id())
        })
        .await
    }

    async fn delete_many(&self, filter: Option<Filter<R::Predicate>>) -> Result<u64, RepoError> {
        let removed = self
            .write(|state| {
                let ids = matching_ids::<R>(state, filter.as_ref());
                for id in &ids {
                    R::remove(state, *id)?;
                }
                Ok(ids.len() as u64)
            })
            .await?;
        tracing::debug!(entity = %R::KIND, removed, "Rows deleted");
        Ok(removed)
    }
}

#[async_trait]
impl Store for InMemoryStore {
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
        Ok(self
            .read(|state| {
                state
                    .links
                    .iter()
                    .filter(|link| scope.contains(link))
                    .copied()
                    .collect()
            })
            .await)
    }

    /// Runs the mutations against a scratch store seeded from the current
    /// tables, holding the write lock throughout. The scratch tables
    /// replace the live ones only if every mutation succeeds.
    async fn transaction(
        &self,
        mutations: Vec<Mutation>,
    ) -> Result<Vec<MutationOutcome>, RepoError> {
        let mut state = self.state.write().await;
        let scratch = Self::from_state(state.clone());
        let outcomes = apply_in_order(&scratch, mutations).await?;
        *state = scratch.into_state();
        tracing::debug!(steps = outcomes.len(), "Transaction committed");
        Ok(outcomes)
    }
}
