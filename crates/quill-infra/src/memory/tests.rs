use quill_core::domain::{
    IntUpdate, LinkScope, NewPost, NewProfile, NewTag, NewUser, Post, PostDraft, PostKey,
    PostUpdate, Profile, Role, TagKey, TagLink, User, UserKey, UserUpdate,
};
use quill_core::error::RepoError;
use quill_core::ports::{Mutation, MutationOutcome, Outcome, Store, Write, clear_all};
use quill_core::query::{
    FindArgs, ListFilter, PostField, PostPredicate, ProfileField, ProfilePredicate, SortOrder,
    StringFilter, TagPredicate, UserField, UserFilter, UserOrderBy, UserPredicate,
};
use quill_core::schema::{EntityKind, Relation, deletion_order};
use quill_core::shape::{Shape, render, render_one};
use serde_json::json;

use super::InMemoryStore;

/// Alice (with profile, two posts), Bob (admin, one post), Charlie
/// (with profile, no posts).
async fn seeded() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .users()
        .create(
            NewUser::new("alice@prisma.io", "Alice", "hash")
                .profile("I love Prisma!")
                .post(
                    PostDraft::new("Prisma makes databases easy")
                        .published(true)
                        .tag(TagLink::create("Prisma")),
                )
                .post(PostDraft::new("Next.js and Prisma").tag(TagLink::create("Next.js"))),
        )
        .await
        .unwrap();
    store
        .users()
        .create(
            NewUser::new("bob@prisma.io", "Bob", "hash")
                .role(Role::Admin)
                .post(
                    PostDraft::new("Typed queries")
                        .published(true)
                        .tag(TagLink::connect_or_create("Prisma"))
                        .tag(TagLink::create("TypeScript")),
                ),
        )
        .await
        .unwrap();
    store
        .users()
        .create(NewUser::new("charlie@prisma.io", "Charlie", "hash").profile("Next.js is awesome!"))
        .await
        .unwrap();
    store
}

async fn counts(store: &InMemoryStore) -> [u64; 4] {
    [
        store.users().count(None).await.unwrap(),
        store.profiles().count(None).await.unwrap(),
        store.posts().count(None).await.unwrap(),
        store.tags().count(None).await.unwrap(),
    ]
}

fn names(users: &[User]) -> Vec<&str> {
    users.iter().map(|u| u.name.as_str()).collect()
}

#[tokio::test]
async fn nested_create_writes_related_rows() {
    let store = seeded().await;
    assert_eq!(counts(&store).await, [3, 2, 3, 3]);

    let links = store
        .links(LinkScope::Posts(vec![3]))
        .await
        .unwrap();
    // connect_or_create reused the existing "Prisma" tag
    let tag_ids: Vec<i32> = links.iter().map(|l| l.tag_id).collect();
    assert_eq!(tag_ids, vec![1, 3]);
}

#[tokio::test]
async fn find_unique_returns_one_row_or_none() {
    let store = seeded().await;

    let bob = store
        .users()
        .find_unique(UserKey::email("bob@prisma.io"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bob.name, "Bob");
    assert_eq!(bob.role, Role::Admin);

    let missing = store
        .users()
        .find_unique(UserKey::email("nobody@prisma.io"))
        .await
        .unwrap();
    assert!(missing.is_none());

    let tag = store.tags().find_unique(TagKey::name("Next.js")).await.unwrap();
    assert_eq!(tag.map(|t| t.id), Some(2));
}

#[tokio::test]
async fn clearing_in_dependency_order_empties_every_table() {
    let store = seeded().await;
    let before = counts(&store).await;

    let mut removed = Vec::new();
    for kind in deletion_order() {
        let count = match kind {
            EntityKind::Tag => store.tags().delete_many(None).await,
            EntityKind::Post => store.posts().delete_many(None).await,
            EntityKind::Profile => store.profiles().delete_many(None).await,
            EntityKind::User => store.users().delete_many(None).await,
        };
        removed.push(count.unwrap());
    }

    assert_eq!(removed, vec![before[3], before[2], before[1], before[0]]);
    assert_eq!(counts(&store).await, [0, 0, 0, 0]);
    assert!(
        store
            .links(LinkScope::Posts(vec![1, 2, 3]))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn create_many_is_all_or_nothing() {
    let store = InMemoryStore::new();
    let added = store
        .users()
        .create_many(vec![
            NewUser::new("a@prisma.io", "A", "hash"),
            NewUser::new("b@prisma.io", "B", "hash"),
        ])
        .await
        .unwrap();
    assert_eq!(added, 2);

    let err = store
        .users()
        .create_many(vec![
            NewUser::new("c@prisma.io", "C", "hash"),
            NewUser::new("a@prisma.io", "A again", "hash"),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));
    assert_eq!(store.users().count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn create_many_rejects_nested_writes() {
    let store = InMemoryStore::new();
    let err = store
        .users()
        .create_many(vec![NewUser::new("a@prisma.io", "A", "hash").profile("bio")])
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(store.users().count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn connect_to_missing_tag_fails_without_side_effects() {
    let store = seeded().await;
    let before = counts(&store).await;

    let err = store
        .posts()
        .create(NewPost::new(1, "Dangling").tag(TagLink::connect(99)))
        .await
        .unwrap_err();
    assert_eq!(err, RepoError::not_found(EntityKind::Tag));
    assert_eq!(counts(&store).await, before);
}

#[tokio::test]
async fn unique_and_referential_constraints() {
    let store = seeded().await;

    let duplicate = store
        .users()
        .create(NewUser::new("alice@prisma.io", "Other Alice", "hash"))
        .await
        .unwrap_err();
    assert!(matches!(duplicate, RepoError::Constraint(_)));

    let second_profile = store
        .profiles()
        .create(NewProfile::new(1, "again"))
        .await
        .unwrap_err();
    assert!(matches!(second_profile, RepoError::Constraint(_)));

    let orphan = store
        .posts()
        .create(NewPost::new(42, "No author"))
        .await
        .unwrap_err();
    assert!(matches!(orphan, RepoError::ForeignKey(_)));

    let tag = store
        .tags()
        .create(NewTag::new("TypeScript"))
        .await
        .unwrap_err();
    assert!(matches!(tag, RepoError::Constraint(_)));
}

#[tokio::test]
async fn deleting_referenced_user_is_restricted() {
    let store = seeded().await;

    let err = store
        .users()
        .delete(UserKey::email("bob@prisma.io"))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::ForeignKey(_)));

    let err = store.users().delete_many(None).await.unwrap_err();
    assert!(matches!(err, RepoError::ForeignKey(_)));
    assert_eq!(store.users().count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn deleting_a_post_removes_its_tag_links() {
    let store = seeded().await;
    let removed = store.posts().delete(PostKey::Id(1)).await.unwrap();
    assert_eq!(removed.title, "Prisma makes databases easy");

    let links = store
        .links(LinkScope::Tags(vec![1]))
        .await
        .unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].post_id, 3);

    let err = store.posts().delete(PostKey::Id(1)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn increments_refresh_updated_at() {
    let store = seeded().await;
    let original = store.posts().find_unique(PostKey::Id(2)).await.unwrap().unwrap();
    assert_eq!(original.likes, 0);

    let once = store
        .posts()
        .update(
            PostKey::Id(2),
            PostUpdate::default().likes(IntUpdate::Increment(1)),
        )
        .await
        .unwrap();
    let twice = store
        .posts()
        .update(
            PostKey::Id(2),
            PostUpdate::default().likes(IntUpdate::Increment(1)),
        )
        .await
        .unwrap();

    assert_eq!(twice.likes, 2);
    assert!(once.updated_at > original.updated_at);
    assert!(twice.updated_at > once.updated_at);
    assert_eq!(twice.created_at, original.created_at);
}

#[tokio::test]
async fn likes_cannot_go_negative() {
    let store = seeded().await;
    let err = store
        .posts()
        .update(
            PostKey::Id(2),
            PostUpdate::default().likes(IntUpdate::Decrement(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)));

    let err = store
        .posts()
        .update(PostKey::Id(2), PostUpdate::default().likes(IntUpdate::Set(-5)))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[tokio::test]
async fn update_missing_row_is_not_found() {
    let store = seeded().await;
    let err = store
        .users()
        .update(UserKey::Id(99), UserUpdate::default().name("Ghost"))
        .await
        .unwrap_err();
    assert_eq!(err, RepoError::not_found(EntityKind::User));
}

#[tokio::test]
async fn update_many_counts_matches() {
    let store = seeded().await;
    let changed = store
        .users()
        .update_many(
            Some(UserPredicate::Email(StringFilter::ends_with("@prisma.io")).into()),
            UserUpdate::default().role(Role::Admin),
        )
        .await
        .unwrap();
    assert_eq!(changed, 3);

    let none = store
        .users()
        .update_many(
            Some(UserPredicate::Name(StringFilter::equals("Nobody")).into()),
            UserUpdate::default().role(Role::User),
        )
        .await
        .unwrap();
    assert_eq!(none, 0);
}

#[tokio::test]
async fn upsert_inserts_then_updates() {
    let store = InMemoryStore::new();
    let key = UserKey::email("dave@prisma.io");

    let created = store
        .users()
        .upsert(
            key.clone(),
            UserUpdate::default().name("Dave (updated)"),
            NewUser::new("dave@prisma.io", "Dave", "hash"),
        )
        .await
        .unwrap();
    assert_eq!(created.name, "Dave");

    let updated = store
        .users()
        .upsert(
            key,
            UserUpdate::default().name("Dave (updated)"),
            NewUser::new("dave@prisma.io", "Dave", "hash"),
        )
        .await
        .unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "Dave (updated)");
    assert_eq!(store.users().count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn composite_filters() {
    let store = seeded().await;

    // name starts with "A" OR (role ADMIN AND some post published)
    let filter: UserFilter = UserFilter::from(UserPredicate::Name(StringFilter::starts_with("A")))
        .or(UserFilter::all(vec![
            UserPredicate::Role(Role::Admin).into(),
            UserPredicate::Posts(ListFilter::some(PostPredicate::Published(true))).into(),
        ]));
    let users = store
        .users()
        .find_many(
            FindArgs::<User>::new()
                .filter(filter)
                .order_by(UserField::Id.desc()),
        )
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Bob", "Alice"]);

    // every post published is vacuously true for Charlie
    let users = store
        .users()
        .find_many(
            FindArgs::<User>::new().filter(UserPredicate::Posts(ListFilter::every(
                PostPredicate::Published(true),
            ))),
        )
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Bob", "Charlie"]);

    let users = store
        .users()
        .find_many(FindArgs::<User>::new().filter(!UserFilter::from(UserPredicate::Posts(
            ListFilter::none(PostPredicate::Title(StringFilter::contains("Prisma"))),
        ))))
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Alice"]);
}

#[tokio::test]
async fn relation_filters_cross_the_link_table() {
    let store = seeded().await;

    let posts = store
        .posts()
        .find_many(FindArgs::<Post>::new().filter(PostPredicate::Tags(ListFilter::some(
            TagPredicate::Name(StringFilter::equals("Prisma")),
        ))))
        .await
        .unwrap();
    let ids: Vec<i32> = posts.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![1, 3]);

    let profiles = store
        .profiles()
        .find_many(FindArgs::<Profile>::new().filter(ProfilePredicate::user(UserPredicate::Posts(
            ListFilter::some(PostPredicate::Published(true)),
        ))))
        .await
        .unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0].bio, "I love Prisma!");

    let with_profile = store
        .users()
        .count(Some(
            UserPredicate::profile(ProfilePredicate::Bio(StringFilter::contains("Prisma"))).into(),
        ))
        .await
        .unwrap();
    assert_eq!(with_profile, 1);
}

#[tokio::test]
async fn orders_by_post_count_descending() {
    let store = seeded().await;
    let users = store
        .users()
        .find_many(FindArgs::<User>::new().order_by(UserOrderBy::PostCount(SortOrder::Desc)))
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Alice", "Bob", "Charlie"]);
}

#[tokio::test]
async fn names_sort_byte_wise() {
    let store = seeded().await;
    store
        .users()
        .create(NewUser::new("adam@prisma.io", "adam", "hash"))
        .await
        .unwrap();
    let users = store
        .users()
        .find_many(FindArgs::<User>::new().order_by(UserField::Name.asc()))
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Alice", "Bob", "Charlie", "adam"]);
}

#[tokio::test]
async fn orders_by_related_field_with_missing_values_last() {
    let store = seeded().await;
    let users = store
        .users()
        .find_many(FindArgs::<User>::new().order_by(UserOrderBy::Profile(ProfileField::Bio, SortOrder::Asc)))
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Alice", "Charlie", "Bob"]);

    let users = store
        .users()
        .find_many(
            FindArgs::<User>::new().order_by(UserOrderBy::Profile(ProfileField::Bio, SortOrder::Desc)),
        )
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Bob", "Charlie", "Alice"]);
}

#[tokio::test]
async fn skip_and_take_page_through_results() {
    let store = seeded().await;
    let page = store
        .posts()
        .find_many(FindArgs::<Post>::new().order_by(PostField::Id.desc()).skip(1).take(1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, 2);

    let first = store
        .posts()
        .find_first(FindArgs::<Post>::new().order_by(PostField::Title.asc()))
        .await
        .unwrap();
    assert_eq!(first.map(|p| p.title), Some("Next.js and Prisma".to_string()));
}

#[tokio::test]
async fn delete_many_by_title() {
    let store = seeded().await;
    let removed = store
        .posts()
        .delete_many(Some(PostPredicate::Title(StringFilter::contains("Next.js")).into()))
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(store.posts().count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn transaction_applies_in_order() {
    let store = seeded().await;
    let outcomes = store.transaction(clear_all()).await.unwrap();

    let affected: Vec<Option<u64>> = outcomes.iter().map(|o| o.affected()).collect();
    assert_eq!(affected, vec![Some(3), Some(3), Some(2), Some(3)]);
    assert_eq!(counts(&store).await, [0, 0, 0, 0]);
}

#[tokio::test]
async fn failed_transaction_leaves_store_unchanged() {
    let store = seeded().await;
    let before = counts(&store).await;

    let err = store
        .transaction(vec![
            Mutation::delete_all(EntityKind::Tag),
            Write::<User>::Create(NewUser::new("eve@prisma.io", "Eve", "hash")).into(),
            // users still own posts and profiles
            Mutation::delete_all(EntityKind::User),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::ForeignKey(_)));
    assert_eq!(counts(&store).await, before);
    assert!(
        store
            .users()
            .find_unique(UserKey::email("eve@prisma.io"))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn transaction_returns_rows_for_single_row_writes() {
    let store = InMemoryStore::new();
    let outcomes = store
        .transaction(vec![
            Write::<User>::Create(NewUser::new("a@prisma.io", "A", "hash")).into(),
            Write::<User>::DeleteMany(None).into(),
        ])
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&outcomes).unwrap(),
        json!([
            { "id": 1, "email": "a@prisma.io", "name": "A", "password_hash": "hash", "role": "USER" },
            { "count": 1 }
        ])
    );
    assert!(matches!(
        outcomes[0],
        MutationOutcome::User(Outcome::Record(_))
    ));
}

#[tokio::test]
async fn renders_nested_shapes() {
    let store = seeded().await;
    let users = store
        .users()
        .find_many(FindArgs::<User>::new().filter(UserPredicate::Email(StringFilter::equals(
            "alice@prisma.io",
        ))))
        .await
        .unwrap();

    let shape = Shape::select(["name"])
        .with(Relation::UserProfile, Shape::select(["bio"]))
        .with(
            Relation::UserPosts,
            Shape::select(["title"]).with(Relation::PostTags, Shape::select(["name"])),
        );
    let rendered = render(&store, &users, &shape).await.unwrap();
    assert_eq!(
        rendered,
        vec![json!({
            "name": "Alice",
            "profile": { "bio": "I love Prisma!" },
            "posts": [
                { "title": "Prisma makes databases easy", "tags": [{ "name": "Prisma" }] },
                { "title": "Next.js and Prisma", "tags": [{ "name": "Next.js" }] }
            ]
        })]
    );

    let bob = store
        .users()
        .find_unique(UserKey::email("bob@prisma.io"))
        .await
        .unwrap()
        .unwrap();
    let rendered = render_one(
        &store,
        &bob,
        &Shape::include().with(Relation::UserProfile, Shape::include()),
    )
    .await
    .unwrap();
    assert_eq!(rendered["profile"], serde_json::Value::Null);
    assert_eq!(rendered["email"], "bob@prisma.io");
}

#[tokio::test]
async fn unknown_shape_fields_are_rejected() {
    let store = seeded().await;
    let users = store.users().find_many(FindArgs::<User>::new()).await.unwrap();
    let err = render(&store, &users, &Shape::select(["age"]))
        .await
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}
