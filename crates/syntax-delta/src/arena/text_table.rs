//! Leaf text interning.

use crate::access::TextSlot;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Interner that gives every distinct leaf text one [`TextSlot`].
///
/// Slots are never released; a tree keeps every text it has seen until it is
/// [compacted](crate::SyntaxTree::compacted).
#[derive(Debug, Clone, Default)]
pub struct TextTable {
    texts: Vec<Arc<str>>,
    lookup: FxHashMap<Arc<str>, TextSlot>,
}

impl TextTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `text`, allocating one on first use.
    pub fn intern(&mut self, text: &str) -> TextSlot {
        if let Some(slot) = self.lookup.get(text) {
            return *slot;
        }
        let slot = TextSlot(self.texts.len() as u32);
        let shared: Arc<str> = Arc::from(text);
        self.texts.push(shared.clone());
        self.lookup.insert(shared, slot);
        slot
    }

    /// Text stored in `slot`.
    pub fn get(&self, slot: TextSlot) -> Option<&str> {
        self.texts.get(slot.0 as usize).map(|text| &**text)
    }

    /// Number of distinct texts.
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Returns `true` if nothing was interned yet.
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_shares_slot() {
        let mut table = TextTable::new();
        let a = table.intern("fn");
        let b = table.intern("main");
        let c = table.intern("fn");
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(b), Some("main"));
        assert_eq!(table.get(TextSlot(9)), None);
    }
}
