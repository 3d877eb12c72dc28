use std::collections::{HashMap, HashSet};

/// Host-assigned identity of one live dialogue object.
pub type InstanceId = u64;

/// The only mutable state of an engine: sequential-block cursors and processed identities.
#[derive(Debug, Default)]
pub struct ReconciliationState {
    cursors: HashMap<String, usize>,
    processed: HashSet<InstanceId>,
}

impl ReconciliationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id`; false when it was already reconciled.
    pub fn mark_processed(&mut self, id: InstanceId) -> bool {
        self.processed.insert(id)
    }

    #[must_use]
    pub fn is_processed(&self, id: InstanceId) -> bool {
        self.processed.contains(&id)
    }

    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    #[must_use]
    pub fn cursor(&self, object_base: &str) -> usize {
        self.cursors.get(object_base).copied().unwrap_or(0)
    }

    /// Hands out the block under the cursor for `object_base` and advances past it. Exhausted
    /// cursors stay exhausted.
    pub fn take_block<'b>(
        &mut self,
        object_base: &str,
        blocks: &'b [Vec<String>],
    ) -> Option<(usize, &'b [String])> {
        let cursor = self.cursors.entry(object_base.to_string()).or_insert(0);
        let idx = *cursor;
        let block = blocks.get(idx)?;
        *cursor = idx.saturating_add(1);
        Some((idx, block.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_ids_are_recorded_once() {
        let mut state = ReconciliationState::new();
        assert!(state.mark_processed(7));
        assert!(!state.mark_processed(7));
        assert!(state.mark_processed(8));
        assert!(state.is_processed(7));
        assert_eq!(state.processed_count(), 2);
    }

    #[test]
    fn cursor_is_monotonic_and_exhaustible() {
        let blocks = vec![vec!["a".to_string()], vec!["b".to_string()]];
        let mut state = ReconciliationState::new();
        assert_eq!(state.take_block("x", &blocks).map(|(i, _)| i), Some(0));
        assert_eq!(state.take_block("x", &blocks).map(|(i, b)| (i, b[0].as_str())), Some((1, "b")));
        assert!(state.take_block("x", &blocks).is_none());
        assert!(state.take_block("x", &blocks).is_none());
        assert_eq!(state.cursor("x"), 2);
        assert_eq!(state.cursor("y"), 0);
    }
}
