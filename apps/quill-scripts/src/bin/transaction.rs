//! Clears every table inside a single transaction.

use std::process::ExitCode;

use futures::FutureExt;

use quill_core::ports::clear_all;
use quill_scripts::output::section;
use quill_scripts::session::{self, Session};

#[tokio::main]
async fn main() -> ExitCode {
    session::run("transaction", |session| transaction(session).boxed()).await
}

async fn transaction(session: &Session) -> anyhow::Result<()> {
    session.seed_if_in_memory().await?;

    let outcomes = session.store().transaction(clear_all()).await?;
    section("# Delete every row in one transaction", &outcomes)
}
