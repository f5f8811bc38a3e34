//! Translation of filter trees into SQL conditions.
//!
//! Relation predicates become uncorrelated sub-selects over the related
//! table (through `post_tags` for the many-to-many side). `every` is
//! expressed as "no related row fails the nested filter".

use sea_orm::ColumnTrait;
use sea_orm::sea_query::{Condition, Query, SelectStatement, SimpleExpr};

use quill_core::query::{
    Filter, IntFilter, ListFilter, PostPredicate, ProfilePredicate, StringFilter, TagPredicate,
    UserPredicate,
};

use super::entity::{post, post_tag, profile, tag, user};
use super::postgres_base::{constant, escape_like};

/// A leaf predicate that can be rendered as a SQL expression.
pub(crate) trait PredicateSql {
    fn expr(&self) -> SimpleExpr;
}

pub(crate) fn filter_condition<P: PredicateSql>(filter: &Filter<P>) -> Condition {
    match filter {
        Filter::Where(predicate) => Condition::all().add(predicate.expr()),
        Filter::And(filters) if filters.is_empty() => Condition::all().add(constant(true)),
        Filter::And(filters) => filters
            .iter()
            .fold(Condition::all(), |cond, f| cond.add(filter_condition(f))),
        Filter::Or(filters) if filters.is_empty() => Condition::all().add(constant(false)),
        Filter::Or(filters) => filters
            .iter()
            .fold(Condition::any(), |cond, f| cond.add(filter_condition(f))),
        Filter::Not(filter) => filter_condition(&**filter).not(),
    }
}

fn string_expr<C: ColumnTrait>(column: C, filter: &StringFilter) -> SimpleExpr {
    match filter {
        StringFilter::Equals(value) => column.eq(value.as_str()),
        StringFilter::Contains(value) => column.like(format!("%{}%", escape_like(value))),
        StringFilter::StartsWith(value) => column.like(format!("{}%", escape_like(value))),
        StringFilter::EndsWith(value) => column.like(format!("%{}", escape_like(value))),
    }
}

fn int_expr<C: ColumnTrait>(column: C, filter: &IntFilter) -> SimpleExpr {
    match filter {
        IntFilter::Equals(n) => column.eq(*n),
        IntFilter::Gt(n) => column.gt(*n),
        IntFilter::Gte(n) => column.gte(*n),
        IntFilter::Lt(n) => column.lt(*n),
        IntFilter::Lte(n) => column.lte(*n),
        IntFilter::In(values) => column.is_in(values.iter().copied()),
    }
}

/// `SELECT <column> FROM <table> WHERE <filter>`
fn keys_where<C, P>(column: C, filter: &Filter<P>) -> SelectStatement
where
    C: ColumnTrait,
    P: PredicateSql,
{
    Query::select()
        .column(column)
        .from(C::EntityName::default())
        .cond_where(filter_condition(filter))
        .to_owned()
}

/// `<key> [NOT] IN (SELECT <fk> FROM <related> WHERE ...)` for a quantified
/// one-to-many relation.
fn quantified<K, F, P>(key: K, foreign_key: F, list: &ListFilter<P>) -> SimpleExpr
where
    K: ColumnTrait,
    F: ColumnTrait,
    P: PredicateSql + Clone,
{
    match list {
        ListFilter::Some(filter) => key.in_subquery(keys_where(foreign_key, &**filter)),
        ListFilter::None(filter) => key.not_in_subquery(keys_where(foreign_key, &**filter)),
        ListFilter::Every(filter) => {
            let failing = !(**filter).clone();
            key.not_in_subquery(keys_where(foreign_key, &failing))
        }
    }
}

/// Like [`quantified`], across the link table: the link rows whose far
/// side matches are selected first.
fn quantified_via_links<K, P>(
    key: K,
    near: post_tag::Column,
    far: post_tag::Column,
    far_key: impl ColumnTrait,
    list: &ListFilter<P>,
) -> SimpleExpr
where
    K: ColumnTrait,
    P: PredicateSql + Clone,
{
    let links = |filter: &Filter<P>| {
        Query::select()
            .column(near)
            .from(post_tag::Entity)
            .and_where(far.in_subquery(keys_where(far_key, filter)))
            .to_owned()
    };
    match list {
        ListFilter::Some(filter) => key.in_subquery(links(&**filter)),
        ListFilter::None(filter) => key.not_in_subquery(links(&**filter)),
        ListFilter::Every(filter) => {
            let failing = !(**filter).clone();
            key.not_in_subquery(links(&failing))
        }
    }
}

impl PredicateSql for UserPredicate {
    fn expr(&self) -> SimpleExpr {
        match self {
            Self::Id(f) => int_expr(user::Column::Id, f),
            Self::Email(f) => string_expr(user::Column::Email, f),
            Self::Name(f) => string_expr(user::Column::Name, f),
            Self::Role(role) => user::Column::Role.eq(user::Role::from(*role)),
            Self::Profile(filter) => {
                user::Column::Id.in_subquery(keys_where(profile::Column::UserId, &**filter))
            }
            Self::Posts(list) => quantified(user::Column::Id, post::Column::AuthorId, list),
        }
    }
}

impl PredicateSql for ProfilePredicate {
    fn expr(&self) -> SimpleExpr {
        match self {
            Self::Id(f) => int_expr(profile::Column::Id, f),
            Self::Bio(f) => string_expr(profile::Column::Bio, f),
            Self::UserId(f) => int_expr(profile::Column::UserId, f),
            Self::User(filter) => {
                profile::Column::UserId.in_subquery(keys_where(user::Column::Id, &**filter))
            }
        }
    }
}

impl PredicateSql for PostPredicate {
    fn expr(&self) -> SimpleExpr {
        match self {
            Self::Id(f) => int_expr(post::Column::Id, f),
            Self::Title(f) => string_expr(post::Column::Title, f),
            Self::Likes(f) => int_expr(post::Column::Likes, f),
            Self::Published(value) => post::Column::Published.eq(*value),
            Self::AuthorId(f) => int_expr(post::Column::AuthorId, f),
            Self::Author(filter) => {
                post::Column::AuthorId.in_subquery(keys_where(user::Column::Id, &**filter))
            }
            Self::Tags(list) => quantified_via_links(
                post::Column::Id,
                post_tag::Column::PostId,
                post_tag::Column::TagId,
                tag::Column::Id,
                list,
            ),
        }
    }
}

impl PredicateSql for TagPredicate {
    fn expr(&self) -> SimpleExpr {
        match self {
            Self::Id(f) => int_expr(tag::Column::Id, f),
            Self::Name(f) => string_expr(tag::Column::Name, f),
            Self::Posts(list) => quantified_via_links(
                tag::Column::Id,
                post_tag::Column::TagId,
                post_tag::Column::PostId,
                post::Column::Id,
                list,
            ),
        }
    }
}
