//! Translation of sort keys into SQL order expressions.
//!
//! Sorting by a related row's column or by the size of a related
//! collection uses a correlated scalar sub-select. Postgres places NULLs
//! last in ascending and first in descending order, which is the
//! convention the in-memory store follows too.

use sea_orm::sea_query::{Expr, Func, Query, SelectStatement, SimpleExpr, SubQueryStatement};
use sea_orm::Order;

use quill_core::query::{
    PostField, PostOrderBy, ProfileField, ProfileOrderBy, SortOrder, TagField, TagOrderBy,
    UserField, UserOrderBy,
};

use super::entity::{post, post_tag, profile, tag, user};

/// A sort key that can be rendered as an `ORDER BY` term.
pub(crate) trait OrderSql {
    fn order(&self) -> (SimpleExpr, Order);
}

fn direction(order: SortOrder) -> Order {
    match order {
        SortOrder::Asc => Order::Asc,
        SortOrder::Desc => Order::Desc,
    }
}

fn scalar(select: SelectStatement) -> SimpleExpr {
    SimpleExpr::SubQuery(None, Box::new(SubQueryStatement::SelectStatement(select)))
}

pub(crate) fn user_column(field: UserField) -> user::Column {
    match field {
        UserField::Id => user::Column::Id,
        UserField::Email => user::Column::Email,
        UserField::Name => user::Column::Name,
        UserField::Role => user::Column::Role,
    }
}

pub(crate) fn profile_column(field: ProfileField) -> profile::Column {
    match field {
        ProfileField::Id => profile::Column::Id,
        ProfileField::Bio => profile::Column::Bio,
        ProfileField::UserId => profile::Column::UserId,
    }
}

pub(crate) fn post_column(field: PostField) -> post::Column {
    match field {
        PostField::Id => post::Column::Id,
        PostField::CreatedAt => post::Column::CreatedAt,
        PostField::UpdatedAt => post::Column::UpdatedAt,
        PostField::Title => post::Column::Title,
        PostField::Likes => post::Column::Likes,
        PostField::Published => post::Column::Published,
        PostField::AuthorId => post::Column::AuthorId,
    }
}

pub(crate) fn tag_column(field: TagField) -> tag::Column {
    match field {
        TagField::Id => tag::Column::Id,
        TagField::Name => tag::Column::Name,
    }
}

impl OrderSql for UserOrderBy {
    fn order(&self) -> (SimpleExpr, Order) {
        match *self {
            Self::Field(field, order) => (
                Expr::col((user::Entity, user_column(field))).into(),
                direction(order),
            ),
            Self::Profile(field, order) => {
                let select = Query::select()
                    .column((profile::Entity, profile_column(field)))
                    .from(profile::Entity)
                    .and_where(
                        Expr::col((profile::Entity, profile::Column::UserId))
                            .equals((user::Entity, user::Column::Id)),
                    )
                    .to_owned();
                (scalar(select), direction(order))
            }
            Self::PostCount(order) => {
                let select = Query::select()
                    .expr(Func::count(Expr::col((post::Entity, post::Column::Id))))
                    .from(post::Entity)
                    .and_where(
                        Expr::col((post::Entity, post::Column::AuthorId))
                            .equals((user::Entity, user::Column::Id)),
                    )
                    .to_owned();
                (scalar(select), direction(order))
            }
        }
    }
}

impl OrderSql for ProfileOrderBy {
    fn order(&self) -> (SimpleExpr, Order) {
        match *self {
            Self::Field(field, order) => (
                Expr::col((profile::Entity, profile_column(field))).into(),
                direction(order),
            ),
            Self::User(field, order) => {
                let select = Query::select()
                    .column((user::Entity, user_column(field)))
                    .from(user::Entity)
                    .and_where(
                        Expr::col((user::Entity, user::Column::Id))
                            .equals((profile::Entity, profile::Column::UserId)),
                    )
                    .to_owned();
                (scalar(select), direction(order))
            }
        }
    }
}

impl OrderSql for PostOrderBy {
    fn order(&self) -> (SimpleExpr, Order) {
        match *self {
            Self::Field(field, order) => (
                Expr::col((post::Entity, post_column(field))).into(),
                direction(order),
            ),
            Self::Author(field, order) => {
                let select = Query::select()
                    .column((user::Entity, user_column(field)))
                    .from(user::Entity)
                    .and_where(
                        Expr::col((user::Entity, user::Column::Id))
                            .equals((post::Entity, post::Column::AuthorId)),
                    )
                    .to_owned();
                (scalar(select), direction(order))
            }
            Self::TagCount(order) => {
                let select = Query::select()
                    .expr(Func::count(Expr::col((
                        post_tag::Entity,
                        post_tag::Column::TagId,
                    ))))
                    .from(post_tag::Entity)
                    .and_where(
                        Expr::col((post_tag::Entity, post_tag::Column::PostId))
                            .equals((post::Entity, post::Column::Id)),
                    )
                    .to_owned();
                (scalar(select), direction(order))
            }
        }
    }
}

impl OrderSql for TagOrderBy {
    fn order(&self) -> (SimpleExpr, Order) {
        match *self {
            Self::Field(field, order) => (
                Expr::col((tag::Entity, tag_column(field))).into(),
                direction(order),
            ),
            Self::PostCount(order) => {
                let select = Query::select()
                    .expr(Func::count(Expr::col((
                        post_tag::Entity,
                        post_tag::Column::PostId,
                    ))))
                    .from(post_tag::Entity)
                    .and_where(
                        Expr::col((post_tag::Entity, post_tag::Column::TagId))
                            .equals((tag::Entity, tag::Column::Id)),
                    )
                    .to_owned();
                (scalar(select), direction(order))
            }
        }
    }
}
