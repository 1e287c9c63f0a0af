//! Filter-and-aggregate core of the complaints and assessment dashboards.
//!
//! Every user interaction becomes a [`FilterSpec`]; the filter engine turns the
//! immutable [`RecordStore`] into a [`FilteredView`], each aggregation reduces
//! that view to one chart's data, and the geo-join lays per-region results over
//! a [`GeometryTable`]. All of it is recomputed from scratch per request.
//!
//! Module layout follows the Explicit Module Boundary Pattern (EMBP): siblings
//! import each other through `crate::<module>` paths, and the types a caller
//! needs are re-exported here.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod filter;
pub mod geojoin;
pub mod geometry;
pub mod levels;
pub mod models;
pub mod normalize;
pub mod routes;
pub mod store;
pub mod text;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use dashboard::{
    Aggregate, AssessmentsDashboard, AssessmentsRequest, ChartId, Charts, ComplaintsDashboard,
    ComplaintsRequest, Dashboard,
};
pub use filter::{FilterSpec, FilteredView};
pub use geometry::GeometryTable;
pub use models::{AssessmentRecord, CategoricalField, ComplaintRecord, NumericField};
pub use normalize::RegionAliases;
pub use routes::AppState;
pub use store::RecordStore;
