//! Lookups, filters, ordering, projections and counts over the sample data.

use std::process::ExitCode;

use futures::FutureExt;
use serde_json::{Value, json};

use quill_core::domain::{Role, User, UserKey};
use quill_core::ports::Store;
use quill_core::query::{
    FindArgs, ListFilter, PostPredicate, ProfileField, ProfilePredicate, SortOrder, StringFilter,
    UserField, UserFilter, UserOrderBy, UserPredicate,
};
use quill_core::schema::Relation;
use quill_core::shape::{Shape, render, render_one};
use quill_scripts::output::section;
use quill_scripts::session::{self, Session};

#[tokio::main]
async fn main() -> ExitCode {
    session::run("read", |session| read(session).boxed()).await
}

async fn shaped(store: &dyn Store, user: Option<User>, shape: &Shape) -> anyhow::Result<Value> {
    match user {
        Some(user) => Ok(render_one(store, &user, shape).await?),
        None => Ok(Value::Null),
    }
}

async fn read(session: &Session) -> anyhow::Result<()> {
    session.seed_if_in_memory().await?;
    let store = session.store();
    let users = store.users();

    let all = users.find_many(FindArgs::<User>::new()).await?;
    section("# Find every row", &all)?;

    let alice = users
        .find_unique(UserKey::email("alice@example.com"))
        .await?;
    section("# Find a unique row", &alice)?;

    let first = users
        .find_first(FindArgs::<User>::new().order_by(UserField::Id.asc()))
        .await?;
    section("# Find the first row", &first)?;

    let matched = users
        .find_many(
            FindArgs::<User>::new()
                .filter(UserPredicate::Email(StringFilter::ends_with("b@example.com"))),
        )
        .await?;
    section("# Filter rows", &matched)?;

    let with_profile = Shape::include().with(Relation::UserProfile, Shape::include());
    let loves_prisma = users
        .find_many(FindArgs::<User>::new().filter(UserPredicate::profile(
            ProfilePredicate::Bio(StringFilter::contains("Prisma")),
        )))
        .await?;
    section(
        "### Filter by a related row",
        &render(store, &loves_prisma, &with_profile).await?,
    )?;

    let filter = UserFilter::from(UserPredicate::Name(StringFilter::starts_with("B"))).or(
        UserFilter::all([
            UserPredicate::profile(ProfilePredicate::Bio(StringFilter::contains("Prisma"))).into(),
            UserPredicate::Role(Role::User).into(),
            UserPredicate::Posts(ListFilter::some(PostPredicate::Title(StringFilter::contains(
                "I",
            ))))
            .into(),
        ]),
    );
    let combined = users
        .find_many(
            FindArgs::<User>::new()
                .filter(filter)
                .order_by(UserField::Id.desc()),
        )
        .await?;
    let with_posts_and_profile = Shape::include()
        .with(Relation::UserPosts, Shape::include())
        .with(Relation::UserProfile, Shape::include());
    section(
        "### Combine conditions with logical operators",
        &render(store, &combined, &with_posts_and_profile).await?,
    )?;

    let limited = users
        .find_many(FindArgs::<User>::new().order_by(UserField::Id.asc()).take(1))
        .await?;
    section("### Limit the number of rows", &limited)?;

    let newest_first = users
        .find_many(FindArgs::<User>::new().order_by(UserField::Id.desc()))
        .await?;
    section("# Sort rows", &newest_first)?;

    let by_profile = users
        .find_many(
            FindArgs::<User>::new().order_by(UserOrderBy::Profile(ProfileField::Id, SortOrder::Asc)),
        )
        .await?;
    section(
        "### Sort by a related field",
        &render(store, &by_profile, &with_profile).await?,
    )?;

    let by_post_count = users
        .find_many(FindArgs::<User>::new().order_by(UserOrderBy::PostCount(SortOrder::Desc)))
        .await?;
    let with_posts = Shape::include().with(Relation::UserPosts, Shape::include());
    section(
        "### Sort by a related count",
        &render(store, &by_post_count, &with_posts).await?,
    )?;

    let emails = users.find_many(FindArgs::<User>::new()).await?;
    section(
        "# Select fields",
        &render(store, &emails, &Shape::select(["email"])).await?,
    )?;

    let first = users.find_first(FindArgs::<User>::new()).await?;
    let shape = Shape::include()
        .with(Relation::UserPosts, Shape::include())
        .with(Relation::UserProfile, Shape::select(["bio"]));
    section(
        "### Load related rows",
        &shaped(store, first, &shape).await?,
    )?;

    let total = users.count(None).await?;
    section("# Aggregate", &json!({ "_count": total }))
}
