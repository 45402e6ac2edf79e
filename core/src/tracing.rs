//! Tracing utilities for statement and preload observability.
//!
//! Enable the `tracing` feature to emit events via the `tracing` crate.
//! These macros no-op when the feature is disabled, avoiding `#[cfg]` boilerplate
//! at every call site.

/// Emit a tracing event with the SQL text and parameter count.
///
/// Debug level by default; info level when the second form's `$loud` is true
/// (set by [`Config::debug`](crate::Config::debug)).
///
/// ```ignore
/// quarry_trace_query!(&stmt.sql, stmt.params.len());
/// quarry_trace_query!(&stmt.sql, stmt.params.len(), config.debug);
/// ```
#[macro_export]
macro_rules! quarry_trace_query {
    ($sql:expr, $param_count:expr) => {
        #[cfg(feature = "tracing")]
        $crate::__tracing::debug!(sql = %$sql, params = $param_count, "quarry.query");
    };
    ($sql:expr, $param_count:expr, $loud:expr) => {
        #[cfg(feature = "tracing")]
        {
            if $loud {
                $crate::__tracing::info!(sql = %$sql, params = $param_count, "quarry.query");
            } else {
                $crate::__tracing::debug!(sql = %$sql, params = $param_count, "quarry.query");
            }
        }
    };
}

/// Emit a debug-level event after a relation has been attached to its owners.
///
/// ```ignore
/// quarry_trace_preload!("Calendar", "appointments", owners.len(), children.len());
/// ```
#[macro_export]
macro_rules! quarry_trace_preload {
    ($record:expr, $relation:expr, $owners:expr, $children:expr) => {
        #[cfg(feature = "tracing")]
        $crate::__tracing::debug!(
            record = %$record,
            relation = %$relation,
            owners = $owners,
            children = $children,
            "quarry.preload"
        );
    };
}

/// Emit a debug-level event after `create`/`save` has written the records
/// attached under one relation.
#[macro_export]
macro_rules! quarry_trace_cascade {
    ($record:expr, $relation:expr, $written:expr) => {
        #[cfg(feature = "tracing")]
        $crate::__tracing::debug!(
            record = %$record,
            relation = %$relation,
            written = $written,
            "quarry.cascade"
        );
    };
}
