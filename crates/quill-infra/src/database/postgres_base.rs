//! Shared plumbing for the PostgreSQL repositories: error classification,
//! transaction completion and common query arguments.

use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, DatabaseTransaction, DbErr, EntityTrait, Order, QueryFilter, QueryOrder,
    QuerySelect, Select, SqlErr,
};

use quill_core::error::RepoError;
use quill_core::ports::Record;
use quill_core::query::{Filter, FindArgs};

use super::condition::{PredicateSql, filter_condition};
use super::order::OrderSql;

/// Classifies a database error into the repository taxonomy.
pub(crate) fn map_db_err(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            return RepoError::Constraint(message);
        }
        Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
            return RepoError::ForeignKey(message);
        }
        _ => {}
    }
    match err {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        other => {
            let message = other.to_string();
            if message.contains("check constraint") {
                RepoError::Constraint(message)
            } else {
                RepoError::Query(message)
            }
        }
    }
}

/// Commits `txn` when `result` is a success, rolls it back otherwise.
pub(crate) async fn finish<T>(
    txn: DatabaseTransaction,
    result: Result<T, RepoError>,
) -> Result<T, RepoError> {
    match result {
        Ok(value) => {
            txn.commit().await.map_err(map_db_err)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::warn!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Applies filter, ordering and paging to a select. Rows always end up
/// ordered by `id` after the requested keys.
pub(crate) fn with_args<E, R>(query: Select<E>, args: &FindArgs<R>, id: E::Column) -> Select<E>
where
    E: EntityTrait,
    R: Record,
    R::Predicate: PredicateSql,
    R::OrderBy: OrderSql,
{
    let mut query = query;
    if let Some(filter) = &args.filter {
        query = query.filter(filter_condition(filter));
    }
    for key in &args.order_by {
        let (expr, order) = key.order();
        query = query.order_by(expr, order);
    }
    query = query.order_by(id, Order::Asc);
    if let Some(skip) = args.skip {
        query = query.offset(skip);
    }
    if let Some(take) = args.take {
        query = query.limit(take);
    }
    query
}

/// Narrows a select by an optional filter.
pub(crate) fn filtered<E, P>(query: Select<E>, filter: Option<&Filter<P>>) -> Select<E>
where
    E: EntityTrait,
    P: PredicateSql,
{
    match filter {
        Some(filter) => query.filter(filter_condition(filter)),
        None => query,
    }
}

/// Escapes `%`, `_` and `\` for use inside a `LIKE` pattern.
pub(crate) fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `column IN (ids)` as a plain expression.
pub(crate) fn id_in<C: ColumnTrait>(column: C, ids: &[i32]) -> SimpleExpr {
    column.is_in(ids.iter().copied())
}

/// Constant truth value, used for empty conjunctions and disjunctions.
pub(crate) fn constant(value: bool) -> SimpleExpr {
    Expr::cust(if value { "TRUE" } else { "FALSE" })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("Next.js"), "Next.js");
    }
}
