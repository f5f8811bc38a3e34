//! PostgreSQL repository implementations.
//!
//! Every record type is served by [`PostgresStore`] itself. Operations
//! touching more than one statement run inside a transaction opened on
//! the store's connection, which becomes a savepoint when the store is
//! already bound to a transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Condition, Expr, IntoCondition, SimpleExpr};
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QuerySelect, Set,
};

use quill_core::domain::{
    self, IntUpdate, NewPost, NewProfile, NewTag, NewUser, Post, PostKey, PostUpdate, Profile,
    ProfileKey, ProfileUpdate, Tag, TagKey, TagLink, TagUpdate, User, UserKey, UserUpdate,
};
use quill_core::error::RepoError;
use quill_core::ports::{Record, Repository};
use quill_core::query::{FindArgs, PostFilter, ProfileFilter, TagFilter, UserFilter};
use quill_core::schema::EntityKind;

use super::condition::filter_condition;
use super::entity::{post, post_tag, profile, tag, user};
use super::postgres_base::{filtered, finish, id_in, map_db_err, with_args};
use super::store::{PostgresStore, StoreConnection};
use crate::redact::mask_email;

async fn find_one<E, D>(db: &D, condition: SimpleExpr) -> Result<Option<E::Model>, RepoError>
where
    E: EntityTrait,
    D: ConnectionTrait,
{
    E::find().filter(condition).one(db).await.map_err(map_db_err)
}

/// Removes the row selected by a unique-key condition and returns it.
async fn delete_one<E, D>(
    db: &D,
    condition: SimpleExpr,
    kind: EntityKind,
) -> Result<E::Model, RepoError>
where
    E: EntityTrait,
    D: ConnectionTrait,
{
    let existing = find_one::<E, D>(db, condition.clone())
        .await?
        .ok_or(RepoError::not_found(kind))?;
    E::delete_many()
        .filter(condition)
        .exec(db)
        .await
        .map_err(map_db_err)?;
    Ok(existing)
}

fn nested_writes_rejected(kind: EntityKind) -> RepoError {
    RepoError::Validation(format!(
        "create_many does not accept nested writes ({kind})"
    ))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

fn user_key(key: &UserKey) -> SimpleExpr {
    match key {
        UserKey::Id(id) => user::Column::Id.eq(*id),
        UserKey::Email(email) => user::Column::Email.eq(email.as_str()),
    }
}

async fn insert_user<D: ConnectionTrait>(db: &D, data: &NewUser) -> Result<User, RepoError> {
    let user = user::ActiveModel::from(data)
        .insert(db)
        .await
        .map_err(map_db_err)?;

    if let Some(bio) = &data.profile_bio {
        profile::ActiveModel::from(&NewProfile::new(user.id, bio.clone()))
            .insert(db)
            .await
            .map_err(map_db_err)?;
    }
    for draft in &data.posts {
        insert_post(db, &draft.clone().by(user.id), domain::now()).await?;
    }

    Ok(user.into())
}

async fn update_user<D: ConnectionTrait>(
    db: &D,
    existing: user::Model,
    data: &UserUpdate,
) -> Result<User, RepoError> {
    if data.is_empty() {
        return Ok(existing.into());
    }
    let mut model = user::ActiveModel::from(data);
    model.id = ActiveValue::Unchanged(existing.id);
    let updated = model.update(db).await.map_err(map_db_err)?;
    Ok(updated.into())
}

#[async_trait]
impl<C: StoreConnection> Repository<User> for PostgresStore<C> {
    async fn create(&self, data: NewUser) -> Result<User, RepoError> {
        User::validate_create(&data)?;
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = insert_user(&txn, &data).await;
        let user = finish(txn, result).await?;

        tracing::debug!(user_id = user.id, email = %mask_email(&user.email), "User created");
        Ok(user)
    }

    async fn create_many(&self, data: Vec<NewUser>) -> Result<u64, RepoError> {
        if data.iter().any(NewUser::has_nested_writes) {
            return Err(nested_writes_rejected(EntityKind::User));
        }
        if data.is_empty() {
            return Ok(0);
        }
        user::Entity::insert_many(data.iter().map(user::ActiveModel::from))
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn find_unique(&self, key: UserKey) -> Result<Option<User>, RepoError> {
        let row = find_one::<user::Entity, _>(&self.db, user_key(&key)).await?;
        Ok(row.map(Into::into))
    }

    async fn find_many(&self, args: FindArgs<User>) -> Result<Vec<User>, RepoError> {
        let rows = with_args(user::Entity::find(), &args, user::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filter: Option<UserFilter>) -> Result<u64, RepoError> {
        filtered(user::Entity::find(), filter.as_ref())
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn update(&self, key: UserKey, data: UserUpdate) -> Result<User, RepoError> {
        User::validate_update(&data)?;
        let existing = find_one::<user::Entity, _>(&self.db, user_key(&key))
            .await?
            .ok_or(RepoError::not_found(EntityKind::User))?;
        update_user(&self.db, existing, &data).await
    }

    async fn update_many(
        &self,
        filter: Option<UserFilter>,
        data: UserUpdate,
    ) -> Result<u64, RepoError> {
        User::validate_update(&data)?;
        if data.is_empty() {
            return Repository::<User>::count(self, filter).await;
        }
        let mut query = user::Entity::update_many().set(user::ActiveModel::from(&data));
        if let Some(filter) = &filter {
            query = query.filter(filter_condition(filter));
        }
        let result = query.exec(&self.db).await.map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn upsert(
        &self,
        key: UserKey,
        update: UserUpdate,
        create: NewUser,
    ) -> Result<User, RepoError> {
        User::validate_update(&update)?;
        User::validate_create(&create)?;
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = match find_one::<user::Entity, _>(&txn, user_key(&key)).await {
            Ok(Some(existing)) => update_user(&txn, existing, &update).await,
            Ok(None) => insert_user(&txn, &create).await,
            Err(e) => Err(e),
        };
        finish(txn, result).await
    }

    async fn delete(&self, key: UserKey) -> Result<User, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = delete_one::<user::Entity, _>(&txn, user_key(&key), EntityKind::User).await;
        finish(txn, result).await.map(Into::into)
    }

    async fn delete_many(
        &self,
        filter: Option<UserFilter>,
    ) -> Result<u64, RepoError> {
        let mut query = user::Entity::delete_many();
        if let Some(filter) = &filter {
            query = query.filter(filter_condition(filter));
        }
        let result = query.exec(&self.db).await.map_err(map_db_err)?;
        tracing::debug!(removed = result.rows_affected, "Users deleted");
        Ok(result.rows_affected)
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

fn profile_key(key: &ProfileKey) -> SimpleExpr {
    match key {
        ProfileKey::Id(id) => profile::Column::Id.eq(*id),
        ProfileKey::UserId(user_id) => profile::Column::UserId.eq(*user_id),
    }
}

async fn insert_profile<D: ConnectionTrait>(
    db: &D,
    data: &NewProfile,
) -> Result<Profile, RepoError> {
    let row = profile::ActiveModel::from(data)
        .insert(db)
        .await
        .map_err(map_db_err)?;
    Ok(row.into())
}

async fn update_profile<D: ConnectionTrait>(
    db: &D,
    existing: profile::Model,
    data: &ProfileUpdate,
) -> Result<Profile, RepoError> {
    if data.is_empty() {
        return Ok(existing.into());
    }
    let mut model = profile::ActiveModel::from(data);
    model.id = ActiveValue::Unchanged(existing.id);
    let updated = model.update(db).await.map_err(map_db_err)?;
    Ok(updated.into())
}

#[async_trait]
impl<C: StoreConnection> Repository<Profile> for PostgresStore<C> {
    async fn create(&self, data: NewProfile) -> Result<Profile, RepoError> {
        Profile::validate_create(&data)?;
        insert_profile(&self.db, &data).await
    }

    async fn create_many(&self, data: Vec<NewProfile>) -> Result<u64, RepoError> {
        if data.is_empty() {
            return Ok(0);
        }
        profile::Entity::insert_many(data.iter().map(profile::ActiveModel::from))
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn find_unique(&self, key: ProfileKey) -> Result<Option<Profile>, RepoError> {
        let row = find_one::<profile::Entity, _>(&self.db, profile_key(&key)).await?;
        Ok(row.map(Into::into))
    }

    async fn find_many(&self, args: FindArgs<Profile>) -> Result<Vec<Profile>, RepoError> {
        let rows = with_args(profile::Entity::find(), &args, profile::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(
        &self,
        filter: Option<ProfileFilter>,
    ) -> Result<u64, RepoError> {
        filtered(profile::Entity::find(), filter.as_ref())
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn update(&self, key: ProfileKey, data: ProfileUpdate) -> Result<Profile, RepoError> {
        let existing = find_one::<profile::Entity, _>(&self.db, profile_key(&key))
            .await?
            .ok_or(RepoError::not_found(EntityKind::Profile))?;
        update_profile(&self.db, existing, &data).await
    }

    async fn update_many(
        &self,
        filter: Option<ProfileFilter>,
        data: ProfileUpdate,
    ) -> Result<u64, RepoError> {
        if data.is_empty() {
            return Repository::<Profile>::count(self, filter).await;
        }
        let mut query = profile::Entity::update_many().set(profile::ActiveModel::from(&data));
        if let Some(filter) = &filter {
            query = query.filter(filter_condition(filter));
        }
        let result = query.exec(&self.db).await.map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn upsert(
        &self,
        key: ProfileKey,
        update: ProfileUpdate,
        create: NewProfile,
    ) -> Result<Profile, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = match find_one::<profile::Entity, _>(&txn, profile_key(&key)).await {
            Ok(Some(existing)) => update_profile(&txn, existing, &update).await,
            Ok(None) => insert_profile(&txn, &create).await,
            Err(e) => Err(e),
        };
        finish(txn, result).await
    }

    async fn delete(&self, key: ProfileKey) -> Result<Profile, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = delete_one::<profile::Entity, _>(&txn, profile_key(&key), EntityKind::Profile).await;
        finish(txn, result).await.map(Into::into)
    }

    async fn delete_many(
        &self,
        filter: Option<ProfileFilter>,
    ) -> Result<u64, RepoError> {
        let mut query = profile::Entity::delete_many();
        if let Some(filter) = &filter {
            query = query.filter(filter_condition(filter));
        }
        let result = query.exec(&self.db).await.map_err(map_db_err)?;
        Ok(result.rows_affected)
    }
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

fn post_key(key: &PostKey) -> SimpleExpr {
    match key {
        PostKey::Id(id) => post::Column::Id.eq(*id),
    }
}

/// Resolves a tag link to a tag id, creating the tag when asked to.
async fn resolve_tag<D: ConnectionTrait>(db: &D, link: &TagLink) -> Result<i32, RepoError> {
    match link {
        TagLink::Create(new) => insert_tag(db, new).await.map(|t| t.id),
        TagLink::Connect(key) => find_one::<tag::Entity, _>(db, tag_key(key))
            .await?
            .map(|t| t.id)
            .ok_or(RepoError::not_found(EntityKind::Tag)),
        TagLink::ConnectOrCreate(new) => {
            let by_name = TagKey::Name(new.name.clone());
            match find_one::<tag::Entity, _>(db, tag_key(&by_name)).await? {
                Some(existing) => Ok(existing.id),
                None => insert_tag(db, new).await.map(|t| t.id),
            }
        }
    }
}

async fn insert_post<D: ConnectionTrait>(
    db: &D,
    data: &NewPost,
    now: DateTime<Utc>,
) -> Result<Post, RepoError> {
    let row = post::ActiveModel::from_new(data, now)
        .insert(db)
        .await
        .map_err(map_db_err)?;

    for link in &data.draft.tags {
        let tag_id = resolve_tag(db, link).await?;
        post_tag::Entity::insert(post_tag::ActiveModel {
            post_id: Set(row.id),
            tag_id: Set(tag_id),
        })
        .exec_without_returning(db)
        .await
        .map_err(map_db_err)?;
    }

    Ok(row.into())
}

/// Applies `data` to the given rows. `updated_at` moves past the latest
/// current value among them, so it strictly increases for every row.
async fn update_posts<D: ConnectionTrait>(
    db: &D,
    rows: &[post::Model],
    data: &PostUpdate,
) -> Result<u64, RepoError> {
    let Some(latest) = rows
        .iter()
        .map(|row| DateTime::<Utc>::from(row.updated_at))
        .max()
    else {
        return Ok(0);
    };
    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let updated_at: DateTimeWithTimeZone = domain::touch(latest).into();

    let mut query = post::Entity::update_many()
        .col_expr(post::Column::UpdatedAt, Expr::value(updated_at));
    if let Some(title) = &data.title {
        query = query.col_expr(post::Column::Title, Expr::value(title.clone()));
    }
    if let Some(published) = data.published {
        query = query.col_expr(post::Column::Published, Expr::value(published));
    }
    if let Some(change) = data.likes {
        let likes = match change {
            IntUpdate::Set(value) => Expr::value(value),
            IntUpdate::Increment(by) => Expr::col(post::Column::Likes).add(by),
            IntUpdate::Decrement(by) => Expr::col(post::Column::Likes).sub(by),
        };
        query = query.col_expr(post::Column::Likes, likes);
    }

    let result = query
        .filter(id_in(post::Column::Id, &ids))
        .exec(db)
        .await
        .map_err(map_db_err)?;
    Ok(result.rows_affected)
}

/// Matching posts, locked against concurrent writers until the
/// surrounding transaction ends.
async fn locked_posts<D: ConnectionTrait>(
    db: &D,
    condition: impl IntoCondition,
) -> Result<Vec<post::Model>, RepoError> {
    post::Entity::find()
        .filter(condition)
        .lock_exclusive()
        .all(db)
        .await
        .map_err(map_db_err)
}

async fn update_post<D: ConnectionTrait>(
    db: &D,
    existing: post::Model,
    data: &PostUpdate,
) -> Result<Post, RepoError> {
    let id = existing.id;
    update_posts(db, &[existing], data).await?;
    find_one::<post::Entity, _>(db, post::Column::Id.eq(id))
        .await?
        .map(Into::into)
        .ok_or(RepoError::not_found(EntityKind::Post))
}

#[async_trait]
impl<C: StoreConnection> Repository<Post> for PostgresStore<C> {
    async fn create(&self, data: NewPost) -> Result<Post, RepoError> {
        Post::validate_create(&data)?;
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = insert_post(&txn, &data, domain::now()).await;
        let post = finish(txn, result).await?;

        tracing::debug!(post_id = post.id, author_id = post.author_id, "Post created");
        Ok(post)
    }

    async fn create_many(&self, data: Vec<NewPost>) -> Result<u64, RepoError> {
        if data.iter().any(NewPost::has_nested_writes) {
            return Err(nested_writes_rejected(EntityKind::Post));
        }
        data.iter().try_for_each(Post::validate_create)?;
        if data.is_empty() {
            return Ok(0);
        }
        let now = domain::now();
        post::Entity::insert_many(data.iter().map(|p| post::ActiveModel::from_new(p, now)))
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn find_unique(&self, key: PostKey) -> Result<Option<Post>, RepoError> {
        let row = find_one::<post::Entity, _>(&self.db, post_key(&key)).await?;
        Ok(row.map(Into::into))
    }

    async fn find_many(&self, args: FindArgs<Post>) -> Result<Vec<Post>, RepoError> {
        let rows = with_args(post::Entity::find(), &args, post::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filter: Option<PostFilter>) -> Result<u64, RepoError> {
        filtered(post::Entity::find(), filter.as_ref())
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn update(&self, key: PostKey, data: PostUpdate) -> Result<Post, RepoError> {
        Post::validate_update(&data)?;
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = match locked_posts(&txn, post_key(&key)).await {
            Ok(mut rows) => match rows.pop() {
                Some(existing) => update_post(&txn, existing, &data).await,
                None => Err(RepoError::not_found(EntityKind::Post)),
            },
            Err(e) => Err(e),
        };
        finish(txn, result).await
    }

    async fn update_many(
        &self,
        filter: Option<PostFilter>,
        data: PostUpdate,
    ) -> Result<u64, RepoError> {
        Post::validate_update(&data)?;
        let condition = match &filter {
            Some(filter) => filter_condition(filter),
            None => Condition::all(),
        };
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = match locked_posts(&txn, condition).await {
            Ok(rows) => update_posts(&txn, &rows, &data).await,
            Err(e) => Err(e),
        };
        finish(txn, result).await
    }

    async fn upsert(
        &self,
        key: PostKey,
        update: PostUpdate,
        create: NewPost,
    ) -> Result<Post, RepoError> {
        Post::validate_update(&update)?;
        Post::validate_create(&create)?;
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = match find_one::<post::Entity, _>(&txn, post_key(&key)).await {
            Ok(Some(existing)) => update_post(&txn, existing, &update).await,
            Ok(None) => insert_post(&txn, &create, domain::now()).await,
            Err(e) => Err(e),
        };
        finish(txn, result).await
    }

    async fn delete(&self, key: PostKey) -> Result<Post, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = delete_one::<post::Entity, _>(&txn, post_key(&key), EntityKind::Post).await;
        finish(txn, result).await.map(Into::into)
    }

    async fn delete_many(
        &self,
        filter: Option<PostFilter>,
    ) -> Result<u64, RepoError> {
        let mut query = post::Entity::delete_many();
        if let Some(filter) = &filter {
            query = query.filter(filter_condition(filter));
        }
        let result = query.exec(&self.db).await.map_err(map_db_err)?;
        tracing::debug!(removed = result.rows_affected, "Posts deleted");
        Ok(result.rows_affected)
    }
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

fn tag_key(key: &TagKey) -> SimpleExpr {
    match key {
        TagKey::Id(id) => tag::Column::Id.eq(*id),
        TagKey::Name(name) => tag::Column::Name.eq(name.as_str()),
    }
}

async fn insert_tag<D: ConnectionTrait>(db: &D, data: &NewTag) -> Result<Tag, RepoError> {
    let row = tag::ActiveModel::from(data)
        .insert(db)
        .await
        .map_err(map_db_err)?;
    Ok(row.into())
}

async fn update_tag<D: ConnectionTrait>(
    db: &D,
    existing: tag::Model,
    data: &TagUpdate,
) -> Result<Tag, RepoError> {
    if data.is_empty() {
        return Ok(existing.into());
    }
    let mut model = tag::ActiveModel::from(data);
    model.id = ActiveValue::Unchanged(existing.id);
    let updated = model.update(db).await.map_err(map_db_err)?;
    Ok(updated.into())
}

#[async_trait]
impl<C: StoreConnection> Repository<Tag> for PostgresStore<C> {
    async fn create(&self, data: NewTag) -> Result<Tag, RepoError> {
        insert_tag(&self.db, &data).await
    }

    async fn create_many(&self, data: Vec<NewTag>) -> Result<u64, RepoError> {
        if data.is_empty() {
            return Ok(0);
        }
        tag::Entity::insert_many(data.iter().map(tag::ActiveModel::from))
            .exec_without_returning(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn find_unique(&self, key: TagKey) -> Result<Option<Tag>, RepoError> {
        let row = find_one::<tag::Entity, _>(&self.db, tag_key(&key)).await?;
        Ok(row.map(Into::into))
    }

    async fn find_many(&self, args: FindArgs<Tag>) -> Result<Vec<Tag>, RepoError> {
        let rows = with_args(tag::Entity::find(), &args, tag::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn count(&self, filter: Option<TagFilter>) -> Result<u64, RepoError> {
        filtered(tag::Entity::find(), filter.as_ref())
            .count(&self.db)
            .await
            .map_err(map_db_err)
    }

    async fn update(&self, key: TagKey, data: TagUpdate) -> Result<Tag, RepoError> {
        let existing = find_one::<tag::Entity, _>(&self.db, tag_key(&key))
            .await?
            .ok_or(RepoError::not_found(EntityKind::Tag))?;
        update_tag(&self.db, existing, &data).await
    }

    async fn update_many(
        &self,
        filter: Option<TagFilter>,
        data: TagUpdate,
    ) -> Result<u64, RepoError> {
        if data.is_empty() {
            return Repository::<Tag>::count(self, filter).await;
        }
        let mut query = tag::Entity::update_many().set(tag::ActiveModel::from(&data));
        if let Some(filter) = &filter {
            query = query.filter(filter_condition(filter));
        }
        let result = query.exec(&self.db).await.map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn upsert(&self, key: TagKey, update: TagUpdate, create: NewTag) -> Result<Tag, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = match find_one::<tag::Entity, _>(&txn, tag_key(&key)).await {
            Ok(Some(existing)) => update_tag(&txn, existing, &update).await,
            Ok(None) => insert_tag(&txn, &create).await,
            Err(e) => Err(e),
        };
        finish(txn, result).await
    }

    async fn delete(&self, key: TagKey) -> Result<Tag, RepoError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        let result = delete_one::<tag::Entity, _>(&txn, tag_key(&key), EntityKind::Tag).await;
        finish(txn, result).await.map(Into::into)
    }

    async fn delete_many(
        &self,
        filter: Option<TagFilter>,
    ) -> Result<u64, RepoError> {
        let mut query = tag::Entity::delete_many();
        if let Some(filter) = &filter {
            query = query.filter(filter_condition(filter));
        }
        let result = query.exec(&self.db).await.map_err(map_db_err)?;
        Ok(result.rows_affected)
    }
}
