//! Query derivation: boolean clauses, facets, boosters, and the builder.

pub mod booster;
pub mod builder;
pub mod clause;
pub mod facet;

pub use self::booster::{Booster, Origin};
pub use self::builder::SearchQuery;
pub use self::clause::{BoolClause, Occur};
pub use self::facet::Facet;
