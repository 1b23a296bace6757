//! Tokio runtime construction for the command-line entry points

use tokio::runtime::Runtime;

/// Build a multi-threaded runtime sized for `parallelism` concurrent workers
///
/// Reads run on the blocking pool, so the async workers only need enough
/// threads to keep their part uploads in flight.
pub fn build_runtime(parallelism: usize) -> std::io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(parallelism.clamp(2, 64))
        .enable_all()
        .thread_name("multiput-worker")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_runs_tasks() {
        let runtime = build_runtime(1).unwrap();
        let value = runtime.block_on(async { tokio::spawn(async { 21 * 2 }).await.unwrap() });
        assert_eq!(value, 42);
    }
}
