/// Data layer: core types, loading, and row filtering.
///
/// Architecture:
/// ```text
///     uploaded .csv bytes
///            │
///            ▼
///      ┌──────────┐
///      │  loader   │  parse + infer column types → Dataset
///      └──────────┘
///            │
///            ▼
///      ┌──────────┐
///      │  Dataset  │  named typed columns, uniform row count
///      └──────────┘
///            │
///            ▼
///      ┌──────────┐
///      │  query    │  boolean row predicate → filtered Dataset
///      └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod query;
