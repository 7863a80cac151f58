// Library root: the fetcher and the run pipeline, exposed so the binary and
// the integration tests share one code path.

pub mod fetcher;
pub mod pipeline;
