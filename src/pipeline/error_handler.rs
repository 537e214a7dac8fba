use log::{info, warn};

use crate::FailureKind;

use super::context::FailureLog;

/// Summarize failures absorbed during a run. Call after the threads are joined.
/// Iteration already ended normally; this is the only place a crash shows up unless the
/// caller inspects `failures()` itself.
pub fn report_failures(failures: &FailureLog, verbose: bool) {
    let failures = failures.snapshot();
    if failures.is_empty() {
        return;
    }
    let transform = failures
        .iter()
        .filter(|f| f.kind == FailureKind::Transform)
        .count();
    let source = failures.len() - transform;
    warn!(
        "run ended with {} transform failure(s) and {} source failure(s); results may be incomplete",
        transform, source
    );
    if verbose {
        for f in &failures {
            match f.worker {
                Some(w) => info!("  failed ({:?}, worker {}): {}", f.kind, w, f.message),
                None => info!("  failed ({:?}): {}", f.kind, f.message),
            }
        }
    }
}
