use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Advisory lock manager keyed by opaque strings.
///
/// `acquire` grants at most one holder per key at a time; waiting past the
/// timeout yields `None` rather than an error. The guard releases on drop,
/// so every exit path of a critical section releases the key. No fairness or
/// re-entrancy guarantees.
#[derive(Default)]
pub struct LockManager {
    entries: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

pub struct LockGuard {
    _held: OwnedMutexGuard<()>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: &str, wait: Duration) -> Option<LockGuard> {
        let entry = {
            let mut entries = self.entries.lock().await;
            entries.entry(key.to_owned()).or_default().clone()
        };

        match tokio::time::timeout(wait, entry.lock_owned()).await {
            Ok(held) => Some(LockGuard { _held: held }),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use super::LockManager;

    #[tokio::test]
    async fn second_acquire_times_out_while_held() {
        let locks = LockManager::new();

        let held = locks.acquire("view-1", Duration::from_millis(50)).await;
        assert!(held.is_some());

        let contender = locks.acquire("view-1", Duration::from_millis(20)).await;
        assert!(contender.is_none(), "held key should report busy");

        drop(held);
        let retry = locks.acquire("view-1", Duration::from_millis(50)).await;
        assert!(retry.is_some(), "released key should be acquirable again");
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let locks = LockManager::new();

        let first = locks.acquire("view-1", Duration::from_millis(20)).await;
        let second = locks.acquire("view-2", Duration::from_millis(20)).await;

        assert!(first.is_some());
        assert!(second.is_some());
    }

    #[tokio::test]
    async fn critical_sections_for_one_key_never_overlap() {
        let locks = Arc::new(LockManager::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = active.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let guard = locks.acquire("view-1", Duration::from_secs(5)).await;
                assert!(guard.is_some());

                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for task in tasks {
            task.await.expect("task");
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1, "at most one holder per key");
    }
}
