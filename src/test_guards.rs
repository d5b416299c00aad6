//! Scoped environment overrides for tests.
//!
//! Every variable touched through an [`EnvGuard`] is snapshotted first and put
//! back, in reverse order, when the guard drops. The environment is
//! process-global, so tests holding a guard are `#[serial]`.

use std::env;
use std::ffi::{OsStr, OsString};

#[derive(Default)]
#[must_use = "the overrides are undone as soon as the guard drops"]
pub struct EnvGuard {
    saved: Vec<(&'static str, Option<OsString>)>,
}

impl EnvGuard {
    /// # Safety
    /// Mutates the process environment. Callers must be `#[serial]`.
    pub unsafe fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        unsafe { Self::default().and_set(key, value) }
    }

    /// # Safety
    /// Mutates the process environment. Callers must be `#[serial]`.
    pub unsafe fn remove(key: &'static str) -> Self {
        unsafe { Self::default().and_remove(key) }
    }

    /// # Safety
    /// Mutates the process environment. Callers must be `#[serial]`.
    pub unsafe fn and_set(mut self, key: &'static str, value: impl AsRef<OsStr>) -> Self {
        self.saved.push((key, env::var_os(key)));
        unsafe { env::set_var(key, value) };
        self
    }

    /// # Safety
    /// Mutates the process environment. Callers must be `#[serial]`.
    pub unsafe fn and_remove(mut self, key: &'static str) -> Self {
        self.saved.push((key, env::var_os(key)));
        unsafe { env::remove_var(key) };
        self
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.saved.drain(..).rev() {
            // SAFETY: guards only live inside #[serial] tests
            match original {
                Some(value) => unsafe { env::set_var(key, value) },
                None => unsafe { env::remove_var(key) },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const PAGE: &str = "BIBKEEPER_TEST_GUARD_PAGE";
    const HOST: &str = "BIBKEEPER_TEST_GUARD_HOST";

    #[test]
    #[serial]
    fn test_overrides_are_undone_on_drop() {
        unsafe { env::set_var(PAGE, "20") };
        unsafe { env::remove_var(HOST) };
        {
            let _env = unsafe { EnvGuard::remove(PAGE).and_set(HOST, "localhost") };
            assert!(env::var(PAGE).is_err());
            assert_eq!(env::var(HOST).unwrap(), "localhost");
        }
        assert_eq!(env::var(PAGE).unwrap(), "20");
        assert!(env::var(HOST).is_err());
        unsafe { env::remove_var(PAGE) };
    }

    #[test]
    #[serial]
    fn test_same_key_twice_restores_the_first_snapshot() {
        unsafe { env::set_var(PAGE, "20") };
        {
            let _env = unsafe { EnvGuard::set(PAGE, "50").and_set(PAGE, "100") };
            assert_eq!(env::var(PAGE).unwrap(), "100");
        }
        assert_eq!(env::var(PAGE).unwrap(), "20");
        unsafe { env::remove_var(PAGE) };
    }
}
