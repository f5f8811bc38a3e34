//! Single-row, filtered and full-table deletes.

use std::process::ExitCode;

use futures::FutureExt;
use serde_json::json;

use quill_core::domain::{Post, PostKey};
use quill_core::ports::Store;
use quill_core::query::{FindArgs, PostField, PostPredicate, StringFilter};
use quill_core::schema::{EntityKind, deletion_order};
use quill_scripts::output::{heading, print_json, section};
use quill_scripts::session::{self, Session};

#[tokio::main]
async fn main() -> ExitCode {
    session::run("delete", |session| delete(session).boxed()).await
}

async fn delete(session: &Session) -> anyhow::Result<()> {
    session.seed_if_in_memory().await?;
    let store = session.store();

    let first = store
        .posts()
        .find_first(FindArgs::<Post>::new().order_by(PostField::Id.asc()))
        .await?
        .ok_or_else(|| anyhow::anyhow!("no posts to delete; run `seed` first"))?;
    let post = store.posts().delete(PostKey::Id(first.id)).await?;
    section("# Delete one row", &post)?;

    let removed = store
        .posts()
        .delete_many(Some(
            PostPredicate::Title(StringFilter::contains("Next.js")).into(),
        ))
        .await?;
    section("# Delete many rows", &json!({ "count": removed }))?;

    heading("# Delete every row");
    for kind in deletion_order() {
        let removed = delete_all(store, kind).await?;
        print_json(&json!({ "count": removed }))?;
    }
    Ok(())
}

async fn delete_all(store: &dyn Store, kind: EntityKind) -> anyhow::Result<u64> {
    let removed = match kind {
        EntityKind::Tag => store.tags().delete_many(None).await?,
        EntityKind::Post => store.posts().delete_many(None).await?,
        EntityKind::Profile => store.profiles().delete_many(None).await?,
        EntityKind::User => store.users().delete_many(None).await?,
    };
    Ok(removed)
}
