// 8.0.1: bounded retry for transient store failures. business errors pass straight through.

use crate::error::LedgerResult;

pub(crate) fn with_retries<T>(
    retries: u32,
    operation: &'static str,
    mut op: impl FnMut() -> LedgerResult<T>,
) -> LedgerResult<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Err(e) if e.is_transient() && attempt < retries => {
                attempt += 1;
                tracing::warn!(operation, attempt, error = %e, "transient store failure, retrying");
            }
            result => return result,
        }
    }
}
