pub mod discovery;
pub mod filing;
pub mod index;
pub mod parsing;
pub mod rate_limiter;
pub mod report;
pub mod utils;

pub use filing::{DocumentLocation, FilingReference, LocationResolver, ReportingPeriod};
pub use index::{read_index, IndexRecord};
pub use report::ReportType;
