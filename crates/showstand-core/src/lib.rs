// Library root: league configuration and the ingestion-and-reconciliation
// pipeline stages, from raw game records to standings and game listings.

pub mod cache;
pub mod config;
pub mod dedup;
pub mod diagnostics;
pub mod eligibility;
pub mod identity;
pub mod record;
pub mod report;
pub mod standings;
