//! Single, batch and nested inserts. Every section starts from empty tables.

use std::process::ExitCode;

use futures::FutureExt;
use serde_json::json;

use quill_core::domain::{NewUser, PostDraft, Role, TagLink};
use quill_core::ports::PasswordService;
use quill_core::schema::Relation;
use quill_core::shape::{Shape, render_one};
use quill_scripts::fixtures::{clear, user};
use quill_scripts::output::section;
use quill_scripts::session::{self, Session};

#[tokio::main]
async fn main() -> ExitCode {
    session::run("create", |session| create(session).boxed()).await
}

/// Ken with two posts, each creating its own tag.
fn ken_with_tagged_posts(passwords: &dyn PasswordService) -> anyhow::Result<NewUser> {
    Ok(user(passwords, "ken@example.com", "Ken", "kenpass123", Role::User)?
        .post(PostDraft::new("Learn Prisma Client").tag(TagLink::create("Prisma")))
        .post(PostDraft::new("Practice TypeScript").tag(TagLink::create("TypeScript"))))
}

async fn create(session: &Session) -> anyhow::Result<()> {
    let store = session.store();
    let passwords = session.passwords();

    clear(store).await?;
    let alice = store
        .users()
        .create(user(passwords, "alice@example.com", "Alice", "alicepass123", Role::User)?)
        .await?;
    section("# Create one row", &alice)?;

    clear(store).await?;
    let data: NewUser = user(passwords, "bob@example.com", "Bob", "bobpass123", Role::User)?;
    let bob = store.users().create(data).await?;
    section("### Create from a prepared payload", &bob)?;

    clear(store).await?;
    let added = store
        .users()
        .create_many(vec![
            user(passwords, "chris@example.io", "Chris", "chrispass123", Role::User)?,
            user(passwords, "andrew@example.io", "Andrew", "andrewpass123", Role::Admin)?,
        ])
        .await?;
    section("# Create many rows", &json!({ "count": added }))?;

    clear(store).await?;
    let batch: Vec<NewUser> = vec![
        user(passwords, "taro@example.com", "Taro", "taropass123", Role::User)?,
        user(passwords, "hanako@example.com", "Hanako", "hanakopass123", Role::Admin)?,
    ];
    let added = store.users().create_many(batch).await?;
    section("### Create many from a prepared batch", &json!({ "count": added }))?;

    clear(store).await?;
    let ken = store.users().create(ken_with_tagged_posts(passwords)?).await?;
    section("# Write related rows", &ken)?;

    clear(store).await?;
    let ken = store
        .users()
        .create(
            user(passwords, "ken@example.com", "Ken", "kenpass123", Role::User)?
                .post(PostDraft::new("Learn Prisma Client"))
                .post(PostDraft::new("Practice TypeScript")),
        )
        .await?;
    section("### Write several related rows without tags", &ken)?;

    clear(store).await?;
    let ken = store.users().create(ken_with_tagged_posts(passwords)?).await?;
    let shape = Shape::include().with(
        Relation::UserPosts,
        Shape::include().with(Relation::PostTags, Shape::include()),
    );
    section(
        "### Shape the result (include)",
        &render_one(store, &ken, &shape).await?,
    )?;

    clear(store).await?;
    let ken = store.users().create(ken_with_tagged_posts(passwords)?).await?;
    let shape = Shape::select(["id", "email", "name", "password_hash", "role"]).with(
        Relation::UserPosts,
        Shape::select([
            "id",
            "created_at",
            "updated_at",
            "title",
            "likes",
            "published",
            "author_id",
        ])
        .with(Relation::PostTags, Shape::select(["id", "name"])),
    );
    section(
        "### Shape the result (select)",
        &render_one(store, &ken, &shape).await?,
    )
}
