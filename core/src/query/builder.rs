//! The query descriptor and its chainable builder methods.

use compact_str::CompactString;

use crate::record::Fields;
use crate::sql::Fragment;

use super::condition::{Condition, Filter};

/// Projection requested by `select`.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Declared fields (or columns) of the model, qualified on render.
    Fields(Vec<CompactString>),
    /// Backend-native projection, e.g. `calendar_id, sum(length)`.
    Raw(Fragment),
}

/// Generates `<kind>_join(table, on)` helpers.
macro_rules! join_impl {
    ($($kind:ident => $keyword:literal),+ $(,)?) => {
        paste::paste! {
            $(
                #[doc = concat!("Appends `", $keyword, " <table> ON <on>`.")]
                pub fn [<$kind _join>](self, table: &str, on: impl Into<Fragment>) -> Self {
                    let on = on.into();
                    let text = format!("{} {} ON {}", $keyword, table, on.text());
                    let mut join = Fragment::new(text);
                    for param in on.params() {
                        join = join.bind(param.clone());
                    }
                    self.joins(join)
                }
            )+
        }
    };
}

/// An accumulated, not yet executed query against one record type.
///
/// Every builder method consumes the descriptor and returns the extended one;
/// clone first to branch:
///
/// ```
/// use quarry_core::{Query, raw};
///
/// let base = Query::model("User").r#where(raw!("first_name = ?", "Arthur"));
/// let ordered = base.clone().order("last_name");
/// let limited = base.limit(1);
/// assert_ne!(ordered, limited);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub(crate) model: CompactString,
    pub(crate) condition: Option<Condition>,
    pub(crate) order: Option<Fragment>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) selection: Option<Selection>,
    pub(crate) group: Option<Fragment>,
    pub(crate) having: Option<Condition>,
    pub(crate) joins: Vec<Fragment>,
    pub(crate) preloads: Vec<CompactString>,
    pub(crate) attrs: Fields,
    pub(crate) assign: Fields,
    pub(crate) unscoped: bool,
}

impl Query {
    pub fn model(record_type: impl Into<CompactString>) -> Self {
        Self {
            model: record_type.into(),
            condition: None,
            order: None,
            limit: None,
            offset: None,
            selection: None,
            group: None,
            having: None,
            joins: Vec::new(),
            preloads: Vec::new(),
            attrs: Fields::new(),
            assign: Fields::new(),
            unscoped: false,
        }
    }

    /// ANDs a filter into everything accumulated so far.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.condition = Some(Condition::and(self.condition.take(), Condition::Leaf(filter)));
        }
        self
    }

    /// ORs a filter with everything accumulated so far.
    pub fn or(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.condition = Some(Condition::or(self.condition.take(), Condition::Leaf(filter)));
        }
        self
    }

    /// ANDs the negation of a filter.
    pub fn not(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            let negated = Condition::Not(Box::new(Condition::Leaf(filter)));
            self.condition = Some(Condition::and(self.condition.take(), negated));
        }
        self
    }

    /// Sets the ORDER BY clause, replacing any earlier one.
    pub fn order(mut self, order: impl Into<Fragment>) -> Self {
        let order = order.into();
        self.order = (!order.is_empty()).then_some(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Restricts the projection to the given fields.
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        self.selection = Some(Selection::Fields(fields.into_iter().map(Into::into).collect()));
        self
    }

    /// Uses a raw projection, required for aggregates.
    pub fn select_raw(mut self, projection: impl Into<Fragment>) -> Self {
        self.selection = Some(Selection::Raw(projection.into()));
        self
    }

    pub fn group(mut self, group: impl Into<Fragment>) -> Self {
        let group = group.into();
        self.group = (!group.is_empty()).then_some(group);
        self
    }

    /// ANDs a HAVING condition.
    pub fn having(mut self, filter: impl Into<Filter>) -> Self {
        let filter = filter.into();
        if !filter.is_empty() {
            self.having = Some(Condition::and(self.having.take(), Condition::Leaf(filter)));
        }
        self
    }

    /// Appends a raw join clause, e.g. `left join calendars on ...`.
    pub fn joins(mut self, join: impl Into<Fragment>) -> Self {
        let join = join.into();
        if !join.is_empty() {
            self.joins.push(join);
        }
        self
    }

    join_impl!(
        inner => "INNER JOIN",
        left => "LEFT JOIN",
        right => "RIGHT JOIN",
        full => "FULL JOIN",
    );

    pub fn cross_join(self, table: &str) -> Self {
        self.joins(format!("CROSS JOIN {}", table))
    }

    /// Records a dot-separated relation path to load after the base fetch.
    pub fn preload(mut self, path: impl Into<CompactString>) -> Self {
        let path = path.into();
        if !self.preloads.contains(&path) {
            self.preloads.push(path);
        }
        self
    }

    /// Applies a reusable transformation.
    pub fn scope<F>(self, scope: F) -> Self
    where
        F: FnOnce(Query) -> Query,
    {
        scope(self)
    }

    /// Applies several transformations in order.
    pub fn scopes<I>(self, scopes: I) -> Self
    where
        I: IntoIterator<Item = fn(Query) -> Query>,
    {
        scopes.into_iter().fold(self, |query, scope| scope(query))
    }

    /// Defaults used only when `first_or_init`/`first_or_create` builds a new
    /// record.
    pub fn attrs(mut self, defaults: impl Into<Fields>) -> Self {
        self.attrs.merge(&defaults.into());
        self
    }

    /// Values written onto the returned record whether it was found or not.
    pub fn assign(mut self, values: impl Into<Fields>) -> Self {
        self.assign.merge(&values.into());
        self
    }

    /// Includes soft-deleted rows, which are otherwise filtered out of every
    /// read on a type that declares a deletion marker.
    pub fn unscoped(mut self) -> Self {
        self.unscoped = true;
        self
    }

    pub fn is_unscoped(&self) -> bool {
        self.unscoped
    }

    pub fn record_type(&self) -> &str {
        &self.model
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn preloads(&self) -> &[CompactString] {
        &self.preloads
    }

    pub fn has_order(&self) -> bool {
        self.order.is_some()
    }
}
