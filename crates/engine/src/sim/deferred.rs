#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeferredHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredAction {
    AdvanceStage { next_stage: u32 },
}

#[derive(Debug, Clone, PartialEq)]
struct DeferredEntry {
    handle: DeferredHandle,
    remaining_ms: f64,
    action: DeferredAction,
}

/// Wall-clock delayed actions owned by the engine. Nothing fires after
/// `cancel_all`.
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    entries: Vec<DeferredEntry>,
    next_handle: u64,
}

impl DeferredQueue {
    pub fn schedule(&mut self, delay_ms: u32, action: DeferredAction) -> DeferredHandle {
        let handle = DeferredHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);
        self.entries.push(DeferredEntry {
            handle,
            remaining_ms: f64::from(delay_ms),
            action,
        });
        handle
    }

    pub fn cancel(&mut self, handle: DeferredHandle) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.handle != handle);
        self.entries.len() != before
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.entries.len();
        self.entries.clear();
        cancelled
    }

    /// Advances every entry and returns due actions in scheduling order.
    pub fn advance(&mut self, elapsed_ms: f32) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        for entry in &mut self.entries {
            entry.remaining_ms -= f64::from(elapsed_ms.max(0.0));
            if entry.remaining_ms <= 0.0 {
                due.push(entry.action);
            }
        }
        self.entries.retain(|entry| entry.remaining_ms > 0.0);
        due
    }

    pub fn pending(&self) -> usize {
        self.entries.len()
    }
}
