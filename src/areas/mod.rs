//! Infrastructure the diff engine runs against
//!
//! - `mirror`: local bare mirrors of remote repositories, reused across runs
//! - `publish`: delivery of the rendered report (stdout/pager, file, gist)

pub mod mirror;
pub mod publish;
