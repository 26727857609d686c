//! Search orchestrator: cache lookup, concurrent marketplace fan-out,
//! merge, price sort, cache write.
//!
//! Both marketplaces are queried concurrently and always awaited to
//! completion; one failing marketplace degrades the result instead of
//! failing the search.

pub mod ranking;
pub mod search;

pub use search::Orchestrator;
