pub mod discovery;
pub mod error;
pub mod prober;
pub mod result;

pub use discovery::{Candidate, SearchClient, FLS_QUERY};
pub use error::ScanError;
pub use prober::Prober;
pub use result::{ProbeOutcome, ProbeResult};
