//! Replaces the database contents with the sample data set.

use std::process::ExitCode;

use futures::FutureExt;

use quill_scripts::fixtures;
use quill_scripts::output::section;
use quill_scripts::session::{self, Session};

#[tokio::main]
async fn main() -> ExitCode {
    session::run("seed", |session| seed(session).boxed()).await
}

async fn seed(session: &Session) -> anyhow::Result<()> {
    let summary = fixtures::seed(session.store(), session.passwords()).await?;
    section("# Seed data inserted", &summary)
}
