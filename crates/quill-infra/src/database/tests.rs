use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseBackend, DbErr, EntityTrait, MockDatabase, MockExecResult, QueryFilter, QueryTrait,
    RuntimeErr, Statement, Value,
};

use quill_core::domain::{
    IntUpdate, NewUser, Post, PostKey, PostUpdate, Role, User, UserKey, UserUpdate,
};
use quill_core::error::RepoError;
use quill_core::ports::{Store, clear_all};
use quill_core::query::{
    Filter, FindArgs, ListFilter, PostPredicate, SortOrder, StringFilter, TagPredicate, UserField,
    UserFilter, UserOrderBy, UserPredicate,
};
use quill_core::schema::EntityKind;

use super::condition::filter_condition;
use super::entity::{post, user};
use super::postgres_base::{map_db_err, with_args};
use super::PostgresStore;

fn alice() -> user::Model {
    user::Model {
        id: 1,
        email: "alice@prisma.io".to_owned(),
        name: "Alice".to_owned(),
        password_hash: "hash".to_owned(),
        role: user::Role::User,
    }
}

fn first_post(likes: i32) -> post::Model {
    let at = DateTime::parse_from_rfc3339("2024-09-29T12:00:00+00:00").unwrap();
    post::Model {
        id: 1,
        created_at: at,
        updated_at: at,
        title: "I need to study Next.js more".to_owned(),
        likes,
        published: false,
        author_id: 1,
    }
}

fn exec_result(rows_affected: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected,
    }
}

fn logged_statements(store: PostgresStore) -> Vec<Statement> {
    store
        .into_inner()
        .into_transaction_log()
        .iter()
        .flat_map(|txn| txn.statements().to_vec())
        .collect()
}

fn user_sql(filter: UserFilter) -> String {
    user::Entity::find()
        .filter(filter_condition(&filter))
        .build(DatabaseBackend::Postgres)
        .to_string()
}

fn post_sql(filter: PostPredicate) -> String {
    post::Entity::find()
        .filter(filter_condition(&Filter::Where(filter)))
        .build(DatabaseBackend::Postgres)
        .to_string()
}

#[tokio::test]
async fn find_many_converts_rows() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![
            alice(),
            user::Model {
                id: 2,
                email: "bob@prisma.io".to_owned(),
                name: "Bob".to_owned(),
                password_hash: "hash".to_owned(),
                role: user::Role::Admin,
            },
        ]])
        .into_connection();
    let store = PostgresStore::new(db);

    let users = store
        .users()
        .find_many(FindArgs::<User>::new())
        .await
        .unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].email, "alice@prisma.io");
    assert_eq!(users[1].role, Role::Admin);
}

#[tokio::test]
async fn find_unique_without_row_is_none() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<user::Model>::new()])
        .into_connection();
    let store = PostgresStore::new(db);

    let found = store
        .users()
        .find_unique(UserKey::email("nobody@prisma.io"))
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn create_user_returns_inserted_row() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![alice()]])
        .into_connection();
    let store = PostgresStore::new(db);

    let user = store
        .users()
        .create(NewUser::new("alice@prisma.io", "Alice", "hash"))
        .await
        .unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.role, Role::User);
}

#[tokio::test]
async fn create_many_with_nothing_to_insert_is_zero() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let store = PostgresStore::new(db);

    let added = store.users().create_many(Vec::new()).await.unwrap();
    assert_eq!(added, 0);

    let err = store
        .users()
        .create_many(vec![NewUser::new("a@prisma.io", "A", "hash").profile("bio")])
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[tokio::test]
async fn delete_of_missing_post_is_not_found() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();
    let store = PostgresStore::new(db);

    let err = store.posts().delete(PostKey::Id(7)).await.unwrap_err();
    assert_eq!(err, RepoError::not_found(EntityKind::Post));
}

#[tokio::test]
async fn increment_locks_the_row_and_refreshes_updated_at() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![first_post(0)]])
        .append_exec_results(vec![exec_result(1)])
        .append_query_results(vec![vec![first_post(1)]])
        .into_connection();
    let store = PostgresStore::new(db);

    let post = store
        .posts()
        .update(
            PostKey::Id(1),
            PostUpdate::default().likes(IntUpdate::Increment(1)),
        )
        .await
        .unwrap();
    assert_eq!(post.likes, 1);

    let statements = logged_statements(store);
    let sql: Vec<&str> = statements.iter().map(|s| s.sql.as_str()).collect();
    assert_eq!(sql.first(), Some(&"BEGIN"), "{sql:?}");
    assert_eq!(sql.last(), Some(&"COMMIT"), "{sql:?}");
    assert!(sql[1].ends_with("FOR UPDATE"), "{sql:?}");

    let update = statements
        .iter()
        .find(|s| s.sql.starts_with("UPDATE"))
        .unwrap();
    assert!(update.sql.contains(r#""likes" = "likes" + $"#), "{}", update.sql);
    assert!(update.sql.contains(r#""updated_at" = $"#), "{}", update.sql);

    let refreshed = update
        .values
        .iter()
        .flat_map(|values| values.0.iter())
        .find_map(|value| match value {
            Value::ChronoDateTimeWithTimeZone(Some(at)) => Some(DateTime::<Utc>::from(**at)),
            _ => None,
        })
        .unwrap();
    assert!(refreshed > DateTime::<Utc>::from(first_post(0).updated_at));
}

#[tokio::test]
async fn update_of_missing_post_is_not_found_and_rolls_back() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![Vec::<post::Model>::new()])
        .into_connection();
    let store = PostgresStore::new(db);

    let err = store
        .posts()
        .update(
            PostKey::Id(7),
            PostUpdate::default().likes(IntUpdate::Increment(1)),
        )
        .await
        .unwrap_err();
    assert_eq!(err, RepoError::not_found(EntityKind::Post));

    let statements = logged_statements(store);
    assert!(statements.iter().all(|s| !s.sql.starts_with("UPDATE")));
    assert_eq!(statements.last().map(|s| s.sql.as_str()), Some("ROLLBACK"));
}

#[tokio::test]
async fn update_many_users_reports_rows_changed() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(vec![exec_result(3)])
        .into_connection();
    let store = PostgresStore::new(db);

    let changed = store
        .users()
        .update_many(
            Some(UserPredicate::Email(StringFilter::contains("example.com")).into()),
            UserUpdate::default().role(Role::Admin),
        )
        .await
        .unwrap();
    assert_eq!(changed, 3);

    let statements = logged_statements(store);
    assert!(statements[0].sql.starts_with(r#"UPDATE "users" SET "role""#), "{}", statements[0].sql);
}

#[tokio::test]
async fn empty_update_many_counts_matches() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results(vec![vec![BTreeMap::from([(
            "num_items",
            Value::BigInt(Some(2)),
        )])]])
        .into_connection();
    let store = PostgresStore::new(db);

    let matched = store
        .users()
        .update_many(None, UserUpdate::default())
        .await
        .unwrap();
    assert_eq!(matched, 2);

    let statements = logged_statements(store);
    assert!(statements.iter().all(|s| !s.sql.starts_with("UPDATE")));
}

#[tokio::test]
async fn transaction_reports_counts_per_step() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_exec_results(
            [3, 5, 2, 3]
                .into_iter()
                .map(|rows_affected| MockExecResult {
                    last_insert_id: 0,
                    rows_affected,
                })
                .collect::<Vec<_>>(),
        )
        .into_connection();
    let store = PostgresStore::new(db);

    let outcomes = store.transaction(clear_all()).await.unwrap();
    let counts: Vec<Option<u64>> = outcomes.iter().map(|o| o.affected()).collect();
    assert_eq!(counts, vec![Some(3), Some(5), Some(2), Some(3)]);
}

#[test]
fn string_filters_use_like() {
    let sql = post_sql(PostPredicate::Title(StringFilter::contains("Next.js")));
    assert!(sql.contains(r#""posts"."title" LIKE '%Next.js%'"#), "{sql}");

    let sql = user_sql(UserPredicate::Email(StringFilter::ends_with("@prisma.io")).into());
    assert!(sql.contains(r#"LIKE '%@prisma.io'"#), "{sql}");
}

#[test]
fn relation_filters_become_subqueries() {
    let some = user_sql(UserPredicate::Posts(ListFilter::some(PostPredicate::Published(true))).into());
    assert!(some.contains(r#""users"."id" IN (SELECT "author_id" FROM "posts""#), "{some}");

    let every =
        user_sql(UserPredicate::Posts(ListFilter::every(PostPredicate::Published(true))).into());
    assert!(every.contains("NOT IN (SELECT"), "{every}");

    let tagged = post_sql(PostPredicate::Tags(ListFilter::some(TagPredicate::Name(
        StringFilter::equals("Prisma"),
    ))));
    assert!(tagged.contains(r#"FROM "post_tags""#), "{tagged}");
    assert!(tagged.contains(r#"FROM "tags""#), "{tagged}");
}

#[test]
fn empty_disjunction_matches_nothing() {
    let sql = user_sql(UserFilter::any(Vec::new()));
    assert!(sql.contains("FALSE"), "{sql}");

    let sql = user_sql(UserFilter::all(Vec::new()));
    assert!(sql.contains("TRUE"), "{sql}");
}

#[test]
fn id_is_the_final_sort_key() {
    let args = FindArgs::<User>::new()
        .order_by(UserOrderBy::PostCount(SortOrder::Desc))
        .order_by(UserField::Name.asc())
        .take(2);
    let sql = with_args(user::Entity::find(), &args, user::Column::Id)
        .build(DatabaseBackend::Postgres)
        .to_string();

    assert!(sql.contains("COUNT("), "{sql}");
    assert!(sql.ends_with(r#""users"."id" ASC LIMIT 2"#), "{sql}");
    let count_at = sql.find("COUNT(").unwrap_or_default();
    let name_at = sql.find(r#""users"."name" ASC"#).unwrap_or_default();
    assert!(count_at < name_at, "{sql}");
}

#[test]
fn post_filters_ignore_unrelated_tables() {
    let args = FindArgs::<Post>::new().filter(PostPredicate::Published(true));
    let sql = with_args(post::Entity::find(), &args, post::Column::Id)
        .build(DatabaseBackend::Postgres)
        .to_string();
    assert!(sql.contains(r#""posts"."published" = TRUE"#), "{sql}");
    assert!(!sql.contains("post_tags"), "{sql}");
}

#[test]
fn connection_errors_are_classified() {
    let err = map_db_err(DbErr::Conn(RuntimeErr::Internal("refused".to_owned())));
    assert!(matches!(err, RepoError::Connection(_)));

    let err = map_db_err(DbErr::Custom(
        r#"new row for relation "posts" violates check constraint "posts_likes_check""#
            .to_owned(),
    ));
    assert!(matches!(err, RepoError::Constraint(_)));

    let err = map_db_err(DbErr::RecordNotFound("users".to_owned()));
    assert!(matches!(err, RepoError::Query(_)));
}
