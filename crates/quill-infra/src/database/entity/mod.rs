//! SeaORM entities mirroring the migrated schema.

pub mod post;
pub mod post_tag;
pub mod profile;
pub mod tag;
pub mod user;
