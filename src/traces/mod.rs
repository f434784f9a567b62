//! Decision traces: an append-only, embedding-searchable ledger of the
//! decisions made while working on a project.

pub mod ledger;
pub mod record;
pub mod store;

pub use ledger::{InitReport, TraceLedger};
pub use record::{
    generate_trace_id, DecisionTrace, Outcome, TraceCollection, TraceMetadata, FEATURE_CATEGORY,
};
pub use store::{
    QueryHit, QueryOptions, QueryResult, StoreRequest, TraceContext, TraceStore,
    DEFAULT_CATEGORY, DEFAULT_QUERY_LIMIT, EMPTY_COLLECTION_HINT,
};
