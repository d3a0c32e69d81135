//! Optimistic State Overlay
//!
//! Pending quantities shown in place of the computed ones while an edit is
//! on its way to the backend. Entries are removed once the reconciliation
//! settles; the aggregate then falls back to authoritative data on its own.
//!
//! Every `set` stamps the entry with a fresh generation. A settling run only
//! clears the entry it wrote, so a newer edit made meanwhile stays visible.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::variant::VariantKey;

#[derive(Debug, Clone, Copy)]
struct OverlayEntry {
    quantity: u32,
    generation: u64,
    set_at: Instant,
}

/// 乐观覆盖层 (共享句柄, clone 开销小)
#[derive(Debug, Clone, Default)]
pub struct OptimisticOverlay {
    entries: Arc<Mutex<HashMap<VariantKey, OverlayEntry>>>,
    generation: Arc<AtomicU64>,
}

impl OptimisticOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<VariantKey, OverlayEntry>> {
        // 覆盖层只是显示缓存, 中毒后继续使用
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Show `quantity` for `key`; returns the generation of the new entry
    pub fn set(&self, key: VariantKey, quantity: u32) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.lock().insert(
            key,
            OverlayEntry {
                quantity,
                generation,
                set_at: Instant::now(),
            },
        );
        generation
    }

    pub fn get(&self, key: &VariantKey) -> Option<u32> {
        self.lock().get(key).map(|e| e.quantity)
    }

    pub fn clear(&self, key: &VariantKey) {
        self.lock().remove(key);
    }

    /// Remove the entry only if it is still the one stamped `generation`
    pub fn clear_if(&self, key: &VariantKey, generation: u64) -> bool {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.generation == generation => {
                entries.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Drop entries set more than `max_age` ago; returns how many were dropped
    pub fn clear_stale(&self, max_age: Duration) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|key, entry| {
            let keep = entry.set_at.elapsed() <= max_age;
            if !keep {
                tracing::warn!(variant = %key, "Dropping stale overlay entry");
            }
            keep
        });
        before - entries.len()
    }

    /// Pending quantities, in the shape the aggregator takes
    pub fn snapshot(&self) -> HashMap<VariantKey, u32> {
        self.lock()
            .iter()
            .map(|(k, e)| (k.clone(), e.quantity))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

/// 数量编辑防抖
///
/// Every edit updates the overlay at once and restarts the window for its
/// key. When a window elapses untouched the action runs once with the latest
/// target. Keys are independent of each other. An action that has started is
/// never aborted by a later edit; that edit opens a new window instead.
#[derive(Debug, Clone)]
pub struct EditDebouncer {
    window: Duration,
    overlay: OptimisticOverlay,
    pending: Arc<Mutex<HashMap<VariantKey, (u64, JoinHandle<()>)>>>,
}

/// The edit a debounce window settled on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledEdit {
    pub key: VariantKey,
    pub target: u32,
    /// Overlay generation written by this edit
    pub generation: u64,
}

impl EditDebouncer {
    pub fn new(overlay: OptimisticOverlay, window: Duration) -> Self {
        Self {
            window,
            overlay,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn overlay(&self) -> &OptimisticOverlay {
        &self.overlay
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<VariantKey, (u64, JoinHandle<()>)>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an edit and (re)start its window
    pub fn schedule<F, Fut>(&self, key: VariantKey, target: u32, action: F)
    where
        F: FnOnce(SettledEdit) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.overlay.set(key.clone(), target);
        let window = self.window;
        let pending = self.pending.clone();
        let task_key = key.clone();

        let mut map = self.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            {
                let mut map = pending.lock().unwrap_or_else(|e| e.into_inner());
                match map.get(&task_key) {
                    Some((current, _)) if *current == generation => {
                        map.remove(&task_key);
                    }
                    // 已被更新的编辑取代
                    _ => return,
                }
            }
            action(SettledEdit {
                key: task_key,
                target,
                generation,
            })
            .await;
        });
        if let Some((_, previous)) = map.insert(key, (generation, handle)) {
            previous.abort();
        }
    }

    /// Drop a pending window without running it
    pub fn cancel(&self, key: &VariantKey) {
        if let Some((_, handle)) = self.lock().remove(key) {
            handle.abort();
        }
    }

    /// Keys whose window has not elapsed yet
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key(id: &str) -> VariantKey {
        VariantKey::new(id, None, Vec::<String>::new())
    }

    #[test]
    fn test_overlay_set_get_clear() {
        let overlay = OptimisticOverlay::new();
        overlay.set(key("m-1"), 3);
        assert_eq!(overlay.get(&key("m-1")), Some(3));
        assert_eq!(overlay.snapshot().len(), 1);

        let shared = overlay.clone();
        shared.clear(&key("m-1"));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_overlay_clear_if_keeps_newer_edit() {
        let overlay = OptimisticOverlay::new();
        let first = overlay.set(key("m-1"), 3);
        let second = overlay.set(key("m-1"), 5);
        assert!(second > first);

        assert!(!overlay.clear_if(&key("m-1"), first));
        assert_eq!(overlay.get(&key("m-1")), Some(5));
        assert!(overlay.clear_if(&key("m-1"), second));
        assert!(overlay.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlay_clear_stale() {
        let overlay = OptimisticOverlay::new();
        overlay.set(key("old"), 1);
        tokio::time::advance(Duration::from_secs(30)).await;
        overlay.set(key("new"), 2);

        assert_eq!(overlay.clear_stale(Duration::from_secs(20)), 1);
        assert_eq!(overlay.get(&key("old")), None);
        assert_eq!(overlay.get(&key("new")), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_to_latest() {
        let debouncer = EditDebouncer::new(OptimisticOverlay::new(), Duration::from_millis(400));
        let runs = Arc::new(AtomicU32::new(0));
        let last = Arc::new(AtomicU32::new(0));

        for target in [2, 3, 5] {
            let (runs, last) = (runs.clone(), last.clone());
            debouncer.schedule(key("m-1"), target, move |edit| async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(edit.target, Ordering::SeqCst);
            });
            assert_eq!(debouncer.overlay().get(&key("m-1")), Some(target));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 5);
        assert_eq!(debouncer.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keys_are_independent() {
        let debouncer = EditDebouncer::new(OptimisticOverlay::new(), Duration::from_millis(400));
        let runs = Arc::new(AtomicU32::new(0));

        for id in ["m-1", "m-2"] {
            let runs = runs.clone();
            debouncer.schedule(key(id), 1, move |_| async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        debouncer.cancel(&key("m-2"));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
