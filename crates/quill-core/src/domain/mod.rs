//! Domain records and their write payloads.

mod post;
mod profile;
mod tag;
mod user;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

pub use post::{IntUpdate, NewPost, Post, PostDraft, PostKey, PostUpdate};
pub use profile::{NewProfile, Profile, ProfileKey, ProfileUpdate};
pub use tag::{LinkScope, NewTag, PostTag, Tag, TagKey, TagLink, TagUpdate};
pub use user::{NewUser, Role, User, UserKey, UserUpdate};

/// Current time at the precision the database stores (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Timestamp for a row being modified. Always later than `previous`,
/// even when the clock has not advanced past it.
pub fn touch(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + TimeDelta::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touch_is_strictly_increasing() {
        let future = now() + TimeDelta::seconds(60);
        assert!(touch(future) > future);

        let past = now() - TimeDelta::seconds(60);
        assert!(touch(past) > past);
    }
}
