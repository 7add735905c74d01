//! Duplicate marking of paired-end data through single-end proxies.
//!
//! Single-end duplicate callers look at one read per fragment. [`project`] turns each
//! paired-end fragment into one single-end proxy record named with a [`ProxyId`]; after the
//! proxies have been deduplicated, [`propagate`] joins the verdicts back onto every record of
//! the original fragments through the same identifier.

pub mod identifier;
pub mod project;
pub mod propagate;

pub use identifier::{Pairing, ProxyId, Segment, is_representative, original_name, strip_proxy_suffix};
pub use project::{
    ProjectionOptions, Projector, SingleEndProxies, convert_paired_end_to_single_end, project_bam,
    to_proxy,
};
pub use propagate::{
    MarkedRecords, PropagationOptions, ProxyIndex, Verdict, load_proxy_index,
    mark_duplicates_by_proxy, propagate_bam,
};
