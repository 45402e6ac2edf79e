//! Query descriptors: filters, clause accumulation and statement rendering.

mod builder;
pub(crate) mod compile;
mod condition;

pub use builder::{Query, Selection};
pub use condition::{Condition, Filter};
