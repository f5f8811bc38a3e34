//! Sample data shared by the scripts.

use serde::Serialize;

use quill_core::domain::{NewPost, NewProfile, NewTag, NewUser, Role, TagLink, User};
use quill_core::ports::{PasswordService, Store, clear_all};

/// Rows written by [`seed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: u64,
    pub profiles: u64,
    pub posts: u64,
    pub tags: u64,
}

/// Empties every table in dependency order, one transaction for all four.
pub async fn clear(store: &dyn Store) -> anyhow::Result<()> {
    store.transaction(clear_all()).await?;
    Ok(())
}

/// A new user whose password is hashed with `passwords`.
pub fn user(
    passwords: &dyn PasswordService,
    email: &str,
    name: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<NewUser> {
    let hash = passwords.hash(password)?;
    Ok(NewUser::new(email, name, hash).role(role))
}

/// Replaces the contents of `store` with three users, two profiles,
/// three tags and five tagged posts.
pub async fn seed(
    store: &dyn Store,
    passwords: &dyn PasswordService,
) -> anyhow::Result<SeedSummary> {
    clear(store).await?;

    let users = store.users();
    let alice = users
        .create(user(passwords, "alice@example.com", "Alice", "alicepass123", Role::User)?)
        .await?;
    let bob = users
        .create(user(passwords, "bob@example.com", "Bob", "bobpass456", Role::Admin)?)
        .await?;
    let charlie = users
        .create(user(
            passwords,
            "charlie@example.com",
            "Charlie",
            "charliepass789",
            Role::User,
        )?)
        .await?;

    let profiles = [(&alice, "I love Prisma!"), (&charlie, "Next.js is awesome!")];
    for (owner, bio) in profiles {
        store
            .profiles()
            .create(NewProfile::new(owner.id, bio))
            .await?;
    }

    let mut tag_ids = Vec::new();
    for name in ["Prisma", "Next.js", "TypeScript"] {
        tag_ids.push(store.tags().create(NewTag::new(name)).await?.id);
    }
    let [prisma, nextjs, typescript] = tag_ids[..] else {
        anyhow::bail!("expected three tags, created {}", tag_ids.len());
    };

    let posts: [(&User, &str, Vec<i32>); 5] = [
        (
            &alice,
            "I started using Prisma with TypeScript Project!",
            vec![prisma, typescript],
        ),
        (&alice, "I need to study Next.js more", vec![nextjs]),
        (&charlie, "I cannot wait for Next.js Conference", vec![nextjs]),
        (&charlie, "I am planning to use Prisma", vec![prisma]),
        (
            &charlie,
            "I am doing 100 Days' TypeScript Challenge",
            vec![typescript],
        ),
    ];
    for (author, title, tags) in posts {
        let post = tags
            .into_iter()
            .fold(NewPost::new(author.id, title), |post, id| {
                post.tag(TagLink::connect(id))
            });
        store.posts().create(post).await?;
    }

    tracing::info!(alice = alice.id, bob = bob.id, charlie = charlie.id, "Seed data inserted");

    Ok(SeedSummary {
        users: store.users().count(None).await?,
        profiles: store.profiles().count(None).await?,
        posts: store.posts().count(None).await?,
        tags: store.tags().count(None).await?,
    })
}

#[cfg(test)]
mod tests {
    use quill_core::ports::AuthError;
    use quill_core::query::{FindArgs, PostField};
    use quill_infra::InMemoryStore;

    use super::*;

    /// Stand-in hasher so tests do not pay for Argon2.
    struct Reversed;

    impl PasswordService for Reversed {
        fn hash(&self, password: &str) -> Result<String, AuthError> {
            Ok(password.chars().rev().collect())
        }

        fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
            Ok(self.hash(password)? == hash)
        }
    }

    #[tokio::test]
    async fn seed_is_repeatable() {
        let store = InMemoryStore::new();
        let expected = SeedSummary {
            users: 3,
            profiles: 2,
            posts: 5,
            tags: 3,
        };

        assert_eq!(seed(&store, &Reversed).await.unwrap(), expected);
        assert_eq!(seed(&store, &Reversed).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn seeded_passwords_are_hashed() {
        let store = InMemoryStore::new();
        seed(&store, &Reversed).await.unwrap();

        let bob = store
            .users()
            .find_unique(quill_core::domain::UserKey::email("bob@example.com"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bob.role, Role::Admin);
        assert_ne!(bob.password_hash, "bobpass456");
        assert!(Reversed.verify("bobpass456", &bob.password_hash).unwrap());
    }

    #[tokio::test]
    async fn first_post_carries_two_tags() {
        let store = InMemoryStore::new();
        seed(&store, &Reversed).await.unwrap();

        let first = store
            .posts()
            .find_first(FindArgs::<quill_core::domain::Post>::new().order_by(PostField::Id.asc()))
            .await
            .unwrap()
            .unwrap();
        let links = store
            .links(quill_core::domain::LinkScope::Posts(vec![first.id]))
            .await
            .unwrap();
        assert_eq!(links.len(), 2);
    }
}
