//! Named fault injection (feature: `failpoints`).
//!
//! `fail_point!(stage, name)` expands to nothing unless the feature is
//! enabled. When enabled, a point that has been `arm`ed makes the enclosing
//! task return a TaskFailure for `stage`.

#[doc(hidden)]
pub use tiersort_core::Error as __FailError;

#[cfg(feature = "failpoints")]
mod registry {
    use once_cell::sync::Lazy;
    use std::collections::HashSet;
    use std::sync::Mutex;

    static ARMED: Lazy<Mutex<HashSet<String>>> = Lazy::new(|| Mutex::new(HashSet::new()));

    pub fn arm(name: &str) {
        if let Ok(mut set) = ARMED.lock() {
            set.insert(name.to_string());
        }
    }

    pub fn disarm(name: &str) {
        if let Ok(mut set) = ARMED.lock() {
            set.remove(name);
        }
    }

    pub fn is_armed(name: &str) -> bool {
        ARMED.lock().map(|set| set.contains(name)).unwrap_or(false)
    }
}

#[cfg(feature = "failpoints")]
pub use registry::{arm, disarm, is_armed};

#[cfg(feature = "failpoints")]
#[macro_export]
macro_rules! fail_point {
    ($stage:expr, $name:expr) => {{
        if $crate::failpoints::is_armed($name) {
            return Err($crate::failpoints::__FailError::task(
                $stage,
                format!("failpoint triggered: {}", $name),
            ));
        }
    }};
}

#[cfg(not(feature = "failpoints"))]
#[macro_export]
macro_rules! fail_point {
    ($stage:expr, $name:expr) => {{
        let _ = (&$stage, $name);
    }};
}
