//! Query expressions: filters, orderings and read arguments.

mod filter;
mod order;

pub use filter::{
    Filter, IntFilter, ListFilter, PostFilter, PostPredicate, ProfileFilter, ProfilePredicate,
    StringFilter, TagFilter, TagPredicate, UserFilter, UserPredicate,
};
pub use order::{
    PostField, PostOrderBy, ProfileField, ProfileOrderBy, SortOrder, TagField, TagOrderBy,
    UserField, UserOrderBy,
};

use crate::ports::Record;

/// Arguments of `find_first` / `find_many`.
#[derive(Debug, Clone)]
pub struct FindArgs<R: Record> {
    pub filter: Option<Filter<R::Predicate>>,
    pub order_by: Vec<R::OrderBy>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl<R: Record> Default for FindArgs<R> {
    fn default() -> Self {
        Self {
            filter: None,
            order_by: Vec::new(),
            skip: None,
            take: None,
        }
    }
}

impl<R: Record> FindArgs<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrows the result; repeated calls are combined with AND.
    pub fn filter(mut self, filter: impl Into<Filter<R::Predicate>>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter.into(),
        });
        self
    }

    /// Appends a sort key; earlier keys take precedence.
    pub fn order_by(mut self, order: R::OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn take(mut self, n: u64) -> Self {
        self.take = Some(n);
        self
    }
}
