use parking_lot::Mutex;
use std::sync::OnceLock;

/// A string fetched from the engine at most once.
///
/// Readers take the lock-free path once the value is published. Until then a
/// fetch runs under `guard`, and the value is checked again after the guard is
/// taken so callers that raced to the first check do not fetch twice. A failed
/// fetch publishes nothing; the next caller tries again.
pub(crate) struct LazyValue {
    value: OnceLock<String>,
    guard: Mutex<()>,
}

impl LazyValue {
    pub(crate) const fn new() -> Self {
        Self {
            value: OnceLock::new(),
            guard: parking_lot::const_mutex(()),
        }
    }

    pub(crate) fn get(&self) -> Option<&str> {
        self.value.get().map(String::as_str)
    }

    pub(crate) fn get_or_try_fetch<E, F>(&self, fetch: F) -> Result<&str, E>
    where
        F: FnOnce() -> Result<String, E>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let _guard = self.guard.lock();
        if let Some(value) = self.get() {
            return Ok(value);
        }

        let fetched = fetch()?;
        Ok(self.value.get_or_init(|| fetched).as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_empty_string_is_a_resolved_value() {
        let lazy = LazyValue::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = lazy
                .get_or_try_fetch(|| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ()>(String::new())
                })
                .unwrap();
            assert_eq!(value, "");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_fetch_is_retried() {
        let lazy = LazyValue::new();

        assert_eq!(lazy.get_or_try_fetch(|| Err::<String, _>("down")), Err("down"));
        assert!(lazy.get().is_none());
        assert_eq!(lazy.get_or_try_fetch(|| Ok::<_, &str>("up".to_string())), Ok("up"));
        assert_eq!(lazy.get(), Some("up"));
    }

    #[test]
    fn test_concurrent_callers_fetch_once() {
        let lazy = Arc::new(LazyValue::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(16));

        let workers: Vec<_> = (0..16)
            .map(|_| {
                let lazy = Arc::clone(&lazy);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    lazy.get_or_try_fetch(|| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(20));
                        Ok::<_, ()>("4.1.7".to_string())
                    })
                    .map(str::to_string)
                })
            })
            .collect();

        for worker in workers {
            assert_eq!(worker.join().unwrap().unwrap(), "4.1.7");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
