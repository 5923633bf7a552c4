//! Recovery boundary for unexpected faults.
//!
//! Project resolution, per-file loading, per-permutation generation and
//! transform hooks must not let a panic in one unit take down the batch.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run `f`, converting a panic into its message.
pub(crate) fn catch_fault<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_value_when_no_fault() {
        assert_eq!(catch_fault(|| 41 + 1), Ok(42));
    }

    #[test]
    fn converts_panic_into_message() {
        let result: Result<(), String> = catch_fault(|| panic!("boom {}", 7));
        assert_eq!(result, Err("boom 7".to_string()));
    }
}
