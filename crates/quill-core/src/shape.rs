//! Projections over read results.
//!
//! A [`Shape`] says which scalar fields of a row to return and which
//! relations to load alongside it, each with its own nested shape.
//! `Shape::include()` keeps every scalar field; `Shape::select(..)` keeps
//! only the listed ones. Rendering loads relations through the [`Store`]
//! one level at a time, so it works the same against every backend.

use std::collections::HashMap;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::{Map, Value};

use crate::domain::{LinkScope, Post, Profile, Tag, User};
use crate::error::RepoError;
use crate::ports::{Record, Store};
use crate::query::{FindArgs, IntFilter, PostPredicate, ProfilePredicate};
use crate::schema::{Cardinality, EntityKind, Relation};

type Document = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Fields {
    #[default]
    All,
    Only(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    fields: Fields,
    relations: Vec<(Relation, Shape)>,
}

impl Shape {
    /// Every scalar field, no relations until added with [`Shape::with`].
    pub fn include() -> Self {
        Self::default()
    }

    /// Only the named scalar fields.
    pub fn select<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: Fields::Only(fields.into_iter().map(Into::into).collect()),
            relations: Vec::new(),
        }
    }

    /// Loads `relation` with the given nested shape.
    pub fn with(mut self, relation: Relation, shape: Shape) -> Self {
        self.relations.retain(|(r, _)| *r != relation);
        self.relations.push((relation, shape));
        self
    }

    /// Checks field and relation names against the schema of `kind`.
    pub fn validate(&self, kind: EntityKind) -> Result<(), RepoError> {
        if let Fields::Only(fields) = &self.fields {
            if let Some(unknown) = fields.iter().find(|f| !kind.has_field(f)) {
                return Err(RepoError::Validation(format!(
                    "{kind} has no field `{unknown}`"
                )));
            }
        }
        for (relation, nested) in &self.relations {
            if relation.source() != kind {
                return Err(RepoError::Validation(format!(
                    "{kind} has no relation `{}`",
                    relation.name()
                )));
            }
            nested.validate(relation.target())?;
        }
        Ok(())
    }

    fn project(&self, doc: Document) -> Document {
        match &self.fields {
            Fields::All => doc,
            Fields::Only(fields) => doc
                .into_iter()
                .filter(|(key, _)| {
                    fields.iter().any(|f| f == key)
                        || self.relations.iter().any(|(r, _)| r.name() == key)
                })
                .collect(),
        }
    }
}

/// Renders `rows` as JSON documents shaped by `shape`.
pub async fn render<R: Record>(
    store: &dyn Store,
    rows: &[R],
    shape: &Shape,
) -> Result<Vec<Value>, RepoError> {
    shape.validate(R::KIND)?;
    render_documents(store, to_documents(rows)?, shape).await
}

/// Renders a single row.
pub async fn render_one<R: Record>(
    store: &dyn Store,
    row: &R,
    shape: &Shape,
) -> Result<Value, RepoError> {
    let mut docs = render(store, std::slice::from_ref(row), shape).await?;
    Ok(docs.pop().unwrap_or(Value::Null))
}

fn render_documents<'a>(
    store: &'a dyn Store,
    mut docs: Vec<Document>,
    shape: &'a Shape,
) -> BoxFuture<'a, Result<Vec<Value>, RepoError>> {
    async move {
        if !docs.is_empty() {
            for (relation, nested) in &shape.relations {
                attach(store, *relation, &mut docs, nested).await?;
            }
        }
        Ok(docs
            .into_iter()
            .map(|doc| Value::Object(shape.project(doc)))
            .collect())
    }
    .boxed()
}

async fn attach(
    store: &dyn Store,
    relation: Relation,
    docs: &mut [Document],
    shape: &Shape,
) -> Result<(), RepoError> {
    let (key_field, keys, rendered) = match relation {
        Relation::UserProfile => {
            let profiles = store
                .profiles()
                .find_many(
                    FindArgs::<Profile>::new()
                        .filter(ProfilePredicate::UserId(IntFilter::In(keys_of(docs, "id"))))
                        .order_by(Profile::id_ascending()),
                )
                .await?;
            let keys = profiles.iter().map(|p| p.user_id).collect();
            ("id", keys, render_rows(store, &profiles, shape).await?)
        }
        Relation::UserPosts => {
            let posts = store
                .posts()
                .find_many(
                    FindArgs::<Post>::new()
                        .filter(PostPredicate::AuthorId(IntFilter::In(keys_of(docs, "id"))))
                        .order_by(Post::id_ascending()),
                )
                .await?;
            let keys = posts.iter().map(|p| p.author_id).collect();
            ("id", keys, render_rows(store, &posts, shape).await?)
        }
        Relation::ProfileUser | Relation::PostAuthor => {
            let key_field = if relation == Relation::ProfileUser {
                "user_id"
            } else {
                "author_id"
            };
            let users = store
                .users()
                .find_many(FindArgs::<User>::new().filter(User::id_in(keys_of(docs, key_field))))
                .await?;
            let keys = users.iter().map(|u| u.id).collect();
            (key_field, keys, render_rows(store, &users, shape).await?)
        }
        Relation::PostTags => {
            let links = store.links(LinkScope::Posts(keys_of(docs, "id"))).await?;
            let tags = store
                .tags()
                .find_many(
                    FindArgs::<Tag>::new()
                        .filter(Tag::id_in(unique(links.iter().map(|l| l.tag_id))))
                        .order_by(Tag::id_ascending()),
                )
                .await?;
            let rendered = render_rows(store, &tags, shape).await?;
            let by_id: HashMap<i32, Value> = tags.iter().map(|t| t.id).zip(rendered).collect();
            let (keys, values) = linked(links.iter().map(|l| (l.post_id, l.tag_id)), &by_id);
            ("id", keys, values)
        }
        Relation::TagPosts => {
            let links = store.links(LinkScope::Tags(keys_of(docs, "id"))).await?;
            let posts = store
                .posts()
                .find_many(
                    FindArgs::<Post>::new()
                        .filter(Post::id_in(unique(links.iter().map(|l| l.post_id))))
                        .order_by(Post::id_ascending()),
                )
                .await?;
            let rendered = render_rows(store, &posts, shape).await?;
            let by_id: HashMap<i32, Value> = posts.iter().map(|p| p.id).zip(rendered).collect();
            let (keys, values) = linked(links.iter().map(|l| (l.tag_id, l.post_id)), &by_id);
            ("id", keys, values)
        }
    };

    let name = relation.name();
    match relation.cardinality() {
        Cardinality::One => attach_one(docs, key_field, name, keys, rendered),
        Cardinality::Many => attach_many(docs, key_field, name, keys, rendered),
    }
    Ok(())
}

async fn render_rows<R: Record>(
    store: &dyn Store,
    rows: &[R],
    shape: &Shape,
) -> Result<Vec<Value>, RepoError> {
    render_documents(store, to_documents(rows)?, shape).await
}

fn to_documents<R: Record>(rows: &[R]) -> Result<Vec<Document>, RepoError> {
    rows.iter()
        .map(|row| match serde_json::to_value(row) {
            Ok(Value::Object(doc)) => Ok(doc),
            Ok(other) => Err(RepoError::Query(format!(
                "{} rendered as non-object {other}",
                R::KIND
            ))),
            Err(e) => Err(RepoError::Query(e.to_string())),
        })
        .collect()
}

fn key_of(doc: &Document, field: &str) -> Option<i32> {
    doc.get(field)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

fn keys_of(docs: &[Document], field: &str) -> Vec<i32> {
    unique(docs.iter().filter_map(|doc| key_of(doc, field)))
}

fn unique(ids: impl Iterator<Item = i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Resolves `(parent, child)` link pairs against rendered children,
/// ordered by child id. Returns parent keys alongside child documents.
fn linked(
    pairs: impl Iterator<Item = (i32, i32)>,
    children: &HashMap<i32, Value>,
) -> (Vec<i32>, Vec<Value>) {
    let mut resolved: Vec<(i32, i32, Value)> = pairs
        .filter_map(|(parent, child)| {
            children
                .get(&child)
                .map(|value| (child, parent, value.clone()))
        })
        .collect();
    resolved.sort_by_key(|(child, parent, _)| (*child, *parent));
    resolved
        .into_iter()
        .map(|(_, parent, value)| (parent, value))
        .unzip()
}

fn attach_one(
    docs: &mut [Document],
    key_field: &str,
    name: &str,
    keys: Vec<i32>,
    rendered: Vec<Value>,
) {
    let related: HashMap<i32, Value> = keys.into_iter().zip(rendered).collect();
    for doc in docs.iter_mut() {
        let value = key_of(doc, key_field)
            .and_then(|key| related.get(&key).cloned())
            .unwrap_or(Value::Null);
        doc.insert(name.to_string(), value);
    }
}

fn attach_many(
    docs: &mut [Document],
    key_field: &str,
    name: &str,
    keys: Vec<i32>,
    rendered: Vec<Value>,
) {
    let mut related: HashMap<i32, Vec<Value>> = HashMap::new();
    for (key, value) in keys.into_iter().zip(rendered) {
        related.entry(key).or_default().push(value);
    }
    for doc in docs.iter_mut() {
        let values = key_of(doc, key_field)
            .and_then(|key| related.remove(&key))
            .unwrap_or_default();
        doc.insert(name.to_string(), Value::Array(values));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn validate_rejects_unknown_names() {
        let bad_field = Shape::select(["email", "age"]);
        assert!(matches!(
            bad_field.validate(EntityKind::User),
            Err(RepoError::Validation(_))
        ));

        let bad_relation = Shape::include().with(Relation::PostTags, Shape::include());
        assert!(bad_relation.validate(EntityKind::User).is_err());

        let nested = Shape::include().with(
            Relation::UserPosts,
            Shape::select(["title"]).with(Relation::PostTags, Shape::select(["name"])),
        );
        assert!(nested.validate(EntityKind::User).is_ok());
    }

    #[test]
    fn select_keeps_listed_fields_and_relations() {
        let shape = Shape::select(["email"]).with(Relation::UserProfile, Shape::include());
        let doc = json!({
            "id": 1,
            "email": "alice@example.com",
            "name": "Alice",
            "profile": null
        });
        let Value::Object(doc) = doc else {
            unreachable!()
        };
        let projected = shape.project(doc);
        assert_eq!(
            Value::Object(projected),
            json!({ "email": "alice@example.com", "profile": null })
        );
    }

    #[test]
    fn attach_many_defaults_to_empty() {
        let mut docs = vec![
            json!({ "id": 1 }).as_object().cloned().unwrap(),
            json!({ "id": 2 }).as_object().cloned().unwrap(),
        ];
        attach_many(
            &mut docs,
            "id",
            "posts",
            vec![1, 1],
            vec![json!({ "id": 10 }), json!({ "id": 11 })],
        );
        assert_eq!(docs[0]["posts"], json!([{ "id": 10 }, { "id": 11 }]));
        assert_eq!(docs[1]["posts"], json!([]));
    }
}
