//! Single-row, filtered and upsert updates, plus an atomic increment.

use std::process::ExitCode;

use futures::FutureExt;
use serde_json::json;

use quill_core::domain::{IntUpdate, Post, PostKey, PostUpdate, Role, UserKey, UserUpdate};
use quill_core::query::{FindArgs, PostField, StringFilter, UserPredicate};
use quill_core::schema::Relation;
use quill_core::shape::{Shape, render_one};
use quill_scripts::fixtures::user;
use quill_scripts::output::section;
use quill_scripts::session::{self, Session};

#[tokio::main]
async fn main() -> ExitCode {
    session::run("update", |session| update(session).boxed()).await
}

async fn update(session: &Session) -> anyhow::Result<()> {
    session.seed_if_in_memory().await?;
    let store = session.store();

    let bob = store
        .users()
        .update(
            UserKey::email("bob@example.com"),
            UserUpdate::default().email("bob_new_email@example.com"),
        )
        .await?;
    section("# Update one row", &bob)?;

    let changed = store
        .users()
        .update_many(
            Some(UserPredicate::Email(StringFilter::contains("example.com")).into()),
            UserUpdate::default().role(Role::Admin),
        )
        .await?;
    section("# Update many rows", &json!({ "count": changed }))?;

    let alice = store
        .users()
        .upsert(
            UserKey::email("alice@example.com"),
            UserUpdate::default().name("Alice Jackson").role(Role::Admin),
            user(
                session.passwords(),
                "alice@example.com",
                "Alice Jackson",
                "alicepass",
                Role::Admin,
            )?,
        )
        .await?;
    let with_profile = Shape::include().with(Relation::UserProfile, Shape::include());
    section(
        "# Update or create (upsert)",
        &render_one(store, &alice, &with_profile).await?,
    )?;

    let first = store
        .posts()
        .find_first(FindArgs::<Post>::new().order_by(PostField::Id.asc()))
        .await?
        .ok_or_else(|| anyhow::anyhow!("no posts to update; run `seed` first"))?;
    let liked = store
        .posts()
        .update(
            PostKey::Id(first.id),
            PostUpdate::default().likes(IntUpdate::Increment(1)),
        )
        .await?;
    section("# Increment a number", &liked)
}
