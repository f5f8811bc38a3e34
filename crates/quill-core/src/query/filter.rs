//! Filter expressions.
//!
//! A [`Filter`] is a boolean tree over per-entity predicates. Predicates
//! either test an own scalar field or descend into a relation, where the
//! nested filter is expressed over the related entity's predicates.

use std::ops::Not;

use crate::domain::Role;

/// Boolean composition of predicates of type `P`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter<P> {
    Where(P),
    And(Vec<Filter<P>>),
    Or(Vec<Filter<P>>),
    Not(Box<Filter<P>>),
}

impl<P> Filter<P> {
    /// Matches rows satisfying every filter. An empty conjunction matches all rows.
    pub fn all(filters: impl IntoIterator<Item = Filter<P>>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    /// Matches rows satisfying at least one filter. An empty disjunction matches nothing.
    pub fn any(filters: impl IntoIterator<Item = Filter<P>>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    pub fn and(self, other: impl Into<Filter<P>>) -> Self {
        match self {
            Self::And(mut filters) => {
                filters.push(other.into());
                Self::And(filters)
            }
            filter => Self::And(vec![filter, other.into()]),
        }
    }

    pub fn or(self, other: impl Into<Filter<P>>) -> Self {
        match self {
            Self::Or(mut filters) => {
                filters.push(other.into());
                Self::Or(filters)
            }
            filter => Self::Or(vec![filter, other.into()]),
        }
    }

    /// Evaluates the tree with `test` deciding each leaf predicate.
    pub fn evaluate(&self, test: &mut impl FnMut(&P) -> bool) -> bool {
        match self {
            Self::Where(predicate) => test(predicate),
            Self::And(filters) => filters.iter().all(|f| f.evaluate(test)),
            Self::Or(filters) => filters.iter().any(|f| f.evaluate(test)),
            Self::Not(filter) => !filter.evaluate(test),
        }
    }
}

impl<P> From<P> for Filter<P> {
    fn from(predicate: P) -> Self {
        Self::Where(predicate)
    }
}

impl<P> Not for Filter<P> {
    type Output = Self;

    fn not(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// String comparisons. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringFilter {
    Equals(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
}

impl StringFilter {
    pub fn equals(value: impl Into<String>) -> Self {
        Self::Equals(value.into())
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::Contains(value.into())
    }

    pub fn starts_with(value: impl Into<String>) -> Self {
        Self::StartsWith(value.into())
    }

    pub fn ends_with(value: impl Into<String>) -> Self {
        Self::EndsWith(value.into())
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Equals(s) => value == s,
            Self::Contains(s) => value.contains(s.as_str()),
            Self::StartsWith(s) => value.starts_with(s.as_str()),
            Self::EndsWith(s) => value.ends_with(s.as_str()),
        }
    }
}

/// Integer comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntFilter {
    Equals(i32),
    Gt(i32),
    Gte(i32),
    Lt(i32),
    Lte(i32),
    In(Vec<i32>),
}

impl IntFilter {
    pub fn matches(&self, value: i32) -> bool {
        match self {
            Self::Equals(n) => value == *n,
            Self::Gt(n) => value > *n,
            Self::Gte(n) => value >= *n,
            Self::Lt(n) => value < *n,
            Self::Lte(n) => value <= *n,
            Self::In(values) => values.contains(&value),
        }
    }
}

/// Quantified filter over a related collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ListFilter<P> {
    /// At least one related row matches.
    Some(Box<Filter<P>>),
    /// Every related row matches (vacuously true for an empty collection).
    Every(Box<Filter<P>>),
    /// No related row matches.
    None(Box<Filter<P>>),
}

impl<P> ListFilter<P> {
    pub fn some(filter: impl Into<Filter<P>>) -> Self {
        Self::Some(Box::new(filter.into()))
    }

    pub fn every(filter: impl Into<Filter<P>>) -> Self {
        Self::Every(Box::new(filter.into()))
    }

    pub fn none(filter: impl Into<Filter<P>>) -> Self {
        Self::None(Box::new(filter.into()))
    }

    /// Evaluates the quantifier over `items`, with `test` deciding whether
    /// one related row satisfies the nested filter.
    pub fn matches<T>(
        &self,
        items: impl IntoIterator<Item = T>,
        mut test: impl FnMut(T, &Filter<P>) -> bool,
    ) -> bool {
        let mut items = items.into_iter();
        match self {
            Self::Some(filter) => items.any(|item| test(item, &**filter)),
            Self::Every(filter) => items.all(|item| test(item, &**filter)),
            Self::None(filter) => !items.any(|item| test(item, &**filter)),
        }
    }
}

/// Predicates over users.
#[derive(Debug, Clone, PartialEq)]
pub enum UserPredicate {
    Id(IntFilter),
    Email(StringFilter),
    Name(StringFilter),
    Role(Role),
    /// The user's profile exists and matches.
    Profile(Box<ProfileFilter>),
    Posts(ListFilter<PostPredicate>),
}

/// Predicates over profiles.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfilePredicate {
    Id(IntFilter),
    Bio(StringFilter),
    UserId(IntFilter),
    User(Box<UserFilter>),
}

/// Predicates over posts.
#[derive(Debug, Clone, PartialEq)]
pub enum PostPredicate {
    Id(IntFilter),
    Title(StringFilter),
    Likes(IntFilter),
    Published(bool),
    AuthorId(IntFilter),
    Author(Box<UserFilter>),
    Tags(ListFilter<TagPredicate>),
}

/// Predicates over tags.
#[derive(Debug, Clone, PartialEq)]
pub enum TagPredicate {
    Id(IntFilter),
    Name(StringFilter),
    Posts(ListFilter<PostPredicate>),
}

pub type UserFilter = Filter<UserPredicate>;
pub type ProfileFilter = Filter<ProfilePredicate>;
pub type PostFilter = Filter<PostPredicate>;
pub type TagFilter = Filter<TagPredicate>;

impl UserPredicate {
    pub fn profile(filter: impl Into<ProfileFilter>) -> Self {
        Self::Profile(Box::new(filter.into()))
    }
}

impl ProfilePredicate {
    pub fn user(filter: impl Into<UserFilter>) -> Self {
        Self::User(Box::new(filter.into()))
    }
}

impl PostPredicate {
    pub fn author(filter: impl Into<UserFilter>) -> Self {
        Self::Author(Box::new(filter.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_filters_are_case_sensitive() {
        assert!(StringFilter::contains("Prisma").matches("I love Prisma!"));
        assert!(!StringFilter::contains("prisma").matches("I love Prisma!"));
        assert!(StringFilter::ends_with("b@example.com").matches("bob@example.com"));
        assert!(!StringFilter::starts_with("B").matches("alice"));
    }

    #[test]
    fn empty_compositions() {
        let all: Filter<bool> = Filter::all(Vec::new());
        let any: Filter<bool> = Filter::any(Vec::new());
        assert!(all.evaluate(&mut |p| *p));
        assert!(!any.evaluate(&mut |p| *p));
    }

    #[test]
    fn nested_composition() {
        // true OR (false AND NOT false)
        let filter: Filter<bool> = Filter::Where(false)
            .or(Filter::And(vec![Filter::Where(false), !Filter::Where(false)]))
            .or(Filter::Where(true));
        assert!(filter.evaluate(&mut |p| *p));

        let filter: Filter<bool> = Filter::Where(true).and(!Filter::Where(true));
        assert!(!filter.evaluate(&mut |p| *p));
    }

    #[test]
    fn list_quantifiers() {
        fn test(n: &i32, f: &Filter<IntFilter>) -> bool {
            f.evaluate(&mut |p: &IntFilter| p.matches(*n))
        }
        let values = vec![1, 2];
        let empty: Vec<i32> = Vec::new();
        let gt_one: ListFilter<IntFilter> = ListFilter::some(IntFilter::Gt(1));

        assert!(gt_one.matches(values.iter(), test));
        assert!(!gt_one.matches(empty.iter(), test));
        assert!(ListFilter::every(IntFilter::Gt(1)).matches(empty.iter(), test));
        assert!(!ListFilter::every(IntFilter::Gt(1)).matches(values.iter(), test));
        assert!(ListFilter::none(IntFilter::Gt(5)).matches(values.iter(), test));
    }
}
