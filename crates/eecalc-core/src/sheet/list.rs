use super::cell::{CellId, CellRecord};

/// Largest number of cells a sheet may hold. Remote edits addressed past it
/// are dropped rather than grown into.
pub const MAX_CELLS: usize = 1024;

/// Change notifications for whoever renders the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetSignal {
    Added(CellId),
    Removed(CellId),
    Focused(usize),
    /// The whole list was rebuilt from a snapshot.
    Reset,
}

/// Ordered, never-empty list of cells addressed by position.
///
/// Invariants, holding after every public call returns:
/// - `len() >= 1`
/// - `cells()[i].index == i`
/// - `focused()` is `None` or a valid index
#[derive(Debug, Clone)]
pub struct CellList {
    cells: Vec<CellRecord>,
    focused: Option<usize>,
    next_id: u64,
    signals: Vec<SheetSignal>,
}

impl CellList {
    /// A list holding one blank, focused cell.
    pub fn new() -> Self {
        let mut list = CellList {
            cells: Vec::new(),
            focused: None,
            next_id: 0,
            signals: Vec::new(),
        };
        list.append("");
        list.focus(0);
        list
    }

    fn alloc_id(&mut self) -> CellId {
        let id = CellId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false at rest; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells not currently being removed.
    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.deleting).count()
    }

    pub fn cells(&self) -> &[CellRecord] {
        &self.cells
    }

    pub fn get(&self, index: usize) -> Option<&CellRecord> {
        self.cells.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut CellRecord> {
        self.cells.get_mut(index)
    }

    pub fn last_index(&self) -> usize {
        self.cells.len().saturating_sub(1)
    }

    pub fn position_of(&self, id: CellId) -> Option<usize> {
        self.cells.iter().position(|c| c.id == id)
    }

    /// Snapshot form: the texts in order.
    pub fn texts(&self) -> Vec<String> {
        self.cells.iter().map(|c| c.text.clone()).collect()
    }

    /// Add a cell at the end and return its index. Focus is left alone.
    pub fn append(&mut self, text: &str) -> usize {
        let id = self.alloc_id();
        let index = self.cells.len();
        self.cells.push(CellRecord::new(id, index, text));
        self.signals.push(SheetSignal::Added(id));
        index
    }

    /// Replace the text of an existing cell. Returns false when out of range.
    pub fn set_text(&mut self, index: usize, text: &str) -> bool {
        match self.cells.get_mut(index) {
            Some(cell) => {
                cell.text = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Append blank cells until `index` exists, up to [`MAX_CELLS`].
    pub fn grow_to(&mut self, index: usize) {
        let target = index.min(MAX_CELLS - 1);
        while self.cells.len() <= target {
            self.append("");
        }
    }

    /// Whether another cell may be added.
    pub fn has_room(&self) -> bool {
        self.cells.len() < MAX_CELLS
    }

    /// Edit the cell at `index`, materialising blank cells for any gap first.
    ///
    /// Returns false, changing nothing, when `index` is at or past
    /// [`MAX_CELLS`].
    pub fn insert_at_or_grow(&mut self, index: usize, text: &str) -> bool {
        if index >= MAX_CELLS {
            tracing::warn!(index, max = MAX_CELLS, "edit past the cell limit dropped");
            return false;
        }
        if index >= self.cells.len() {
            tracing::debug!(from = self.cells.len(), to = index, "growing sheet");
            self.grow_to(index);
        }
        self.set_text(index, text)
    }

    /// Start removing the cell at `index`.
    ///
    /// Returns the record's id when the removal was accepted. Requests for a
    /// missing index, a cell already being removed, or the last live cell are
    /// ignored.
    pub fn begin_delete(&mut self, index: usize) -> Option<CellId> {
        let live = self.live_count();
        let cell = self.cells.get_mut(index)?;
        if cell.deleting || live <= 1 {
            return None;
        }
        cell.deleting = true;
        Some(cell.id)
    }

    /// Complete a removal started by [`begin_delete`](Self::begin_delete).
    ///
    /// Renumbers the survivors and focuses the cell now at `index - 1`
    /// (clamped to 0). Returns the index the record had when it was removed.
    pub fn finish_delete(&mut self, id: CellId) -> Option<usize> {
        let index = self.position_of(id)?;
        self.cells.remove(index);
        self.renumber();
        self.signals.push(SheetSignal::Removed(id));
        self.focus(index.saturating_sub(1));
        Some(index)
    }

    /// Remove the cell at `index` without an in-flight phase.
    pub fn delete_now(&mut self, index: usize) -> bool {
        match self.begin_delete(index) {
            Some(id) => self.finish_delete(id).is_some(),
            None => false,
        }
    }

    /// Recompute every cell's index from its position.
    pub fn renumber(&mut self) {
        for (i, cell) in self.cells.iter_mut().enumerate() {
            cell.index = i;
        }
        if let Some(f) = self.focused
            && f >= self.cells.len()
        {
            self.focused = None;
        }
    }

    /// Rebuild the list from snapshot texts. An empty snapshot yields one blank
    /// cell; texts past [`MAX_CELLS`] are dropped.
    pub fn full_replace<I, S>(&mut self, texts: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cells.clear();
        self.focused = None;
        self.signals.push(SheetSignal::Reset);
        for text in texts.into_iter().take(MAX_CELLS) {
            self.append(text.as_ref());
        }
        if self.cells.is_empty() {
            self.append("");
        }
        self.renumber();
        self.focus(self.last_index());
    }

    /// Focus the cell at `index`; out-of-range requests are ignored.
    pub fn focus(&mut self, index: usize) -> bool {
        if index >= self.cells.len() {
            return false;
        }
        self.focused = Some(index);
        self.signals.push(SheetSignal::Focused(index));
        true
    }

    /// Move focus by `delta`, ignoring moves that would leave `[0, len-1]`.
    pub fn move_focus(&mut self, delta: isize) -> bool {
        let Some(current) = self.focused else {
            return false;
        };
        match current.checked_add_signed(delta) {
            Some(target) => self.focus(target),
            None => false,
        }
    }

    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    pub fn focused_cell(&self) -> Option<&CellRecord> {
        self.focused.and_then(|i| self.cells.get(i))
    }

    pub fn drain_signals(&mut self) -> Vec<SheetSignal> {
        std::mem::take(&mut self.signals)
    }
}

impl Default for CellList {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn list_of(texts: &[&str]) -> CellList {
        let mut list = CellList::new();
        list.full_replace(texts.iter().copied());
        list
    }

    fn assert_contiguous(list: &CellList) {
        assert!(list.len() >= 1);
        for (i, cell) in list.cells().iter().enumerate() {
            assert_eq!(cell.index, i);
        }
    }

    #[test]
    fn test_new_list_has_one_focused_blank_cell() {
        let list = CellList::new();
        assert_eq!(list.len(), 1);
        assert_eq!(list.focused(), Some(0));
        assert!(list.get(0).unwrap().is_blank());
    }

    #[test]
    fn test_append_returns_index() {
        let mut list = CellList::new();
        assert_eq!(list.append("1"), 1);
        assert_eq!(list.append("2"), 2);
        assert_contiguous(&list);
        assert_eq!(list.focused(), Some(0));
    }

    #[test]
    fn test_insert_at_or_grow_edits_in_bounds() {
        let mut list = list_of(&["a", "b"]);
        list.insert_at_or_grow(1, "x");
        assert_eq!(list.texts(), vec!["a", "x"]);
    }

    #[test]
    fn test_insert_at_or_grow_fills_gap() {
        let mut list = list_of(&["a", "b"]);
        list.insert_at_or_grow(5, "x");
        assert_eq!(list.len(), 6);
        assert_eq!(list.texts(), vec!["a", "b", "", "", "", "x"]);
        assert_contiguous(&list);
    }

    #[test]
    fn test_delete_renumbers_and_moves_focus() {
        let mut list = list_of(&["a", "b", "c", "d"]);
        assert!(list.delete_now(2));
        assert_eq!(list.texts(), vec!["a", "b", "d"]);
        assert_contiguous(&list);
        assert_eq!(list.focused(), Some(1));
    }

    #[test]
    fn test_delete_first_clamps_focus() {
        let mut list = list_of(&["a", "b"]);
        assert!(list.delete_now(0));
        assert_eq!(list.focused(), Some(0));
    }

    #[test]
    fn test_delete_sole_cell_is_noop() {
        let mut list = CellList::new();
        assert!(!list.delete_now(0));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_delete_out_of_range_is_noop() {
        let mut list = list_of(&["a", "b"]);
        assert!(!list.delete_now(7));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_duplicate_delete_while_in_flight_is_absorbed() {
        let mut list = list_of(&["a", "b", "c"]);
        let id = list.begin_delete(1).unwrap();
        assert!(list.begin_delete(1).is_none());
        assert_eq!(list.finish_delete(id), Some(1));
        assert_eq!(list.texts(), vec!["a", "c"]);
        assert!(list.finish_delete(id).is_none());
    }

    #[test]
    fn test_floor_counts_in_flight_removals() {
        let mut list = list_of(&["a", "b"]);
        let first = list.begin_delete(1).unwrap();
        assert!(list.begin_delete(0).is_none());
        list.finish_delete(first);
        assert_eq!(list.texts(), vec!["a"]);
    }

    #[test]
    fn test_full_replace_empty_bootstraps_blank() {
        let mut list = list_of(&["a", "b"]);
        list.full_replace(Vec::<String>::new());
        assert_eq!(list.len(), 1);
        assert!(list.get(0).unwrap().is_blank());
        assert_eq!(list.focused(), Some(0));
    }

    #[test]
    fn test_move_focus_clamps() {
        let mut list = list_of(&["a", "b", "c"]);
        list.focus(0);
        assert!(!list.move_focus(-1));
        assert_eq!(list.focused(), Some(0));
        assert!(list.move_focus(1));
        assert!(list.move_focus(1));
        assert!(!list.move_focus(1));
        assert_eq!(list.focused(), Some(2));
    }

    #[test]
    fn test_signals_track_changes() {
        let mut list = CellList::new();
        list.drain_signals();
        let idx = list.append("x");
        let id = list.get(idx).unwrap().id();
        list.delete_now(idx);
        let signals = list.drain_signals();
        assert_eq!(
            signals,
            vec![SheetSignal::Added(id), SheetSignal::Removed(id), SheetSignal::Focused(0)]
        );
    }

    #[test]
    fn test_edit_past_limit_is_dropped() {
        let mut list = list_of(&["a"]);
        assert!(!list.insert_at_or_grow(MAX_CELLS, "x"));
        assert!(!list.insert_at_or_grow(usize::MAX, "x"));
        assert_eq!(list.texts(), vec!["a"]);

        assert!(list.insert_at_or_grow(MAX_CELLS - 1, "last"));
        assert_eq!(list.len(), MAX_CELLS);
        assert!(!list.has_room());
    }

    #[test]
    fn test_full_replace_truncates_at_limit() {
        let mut list = CellList::new();
        list.full_replace(std::iter::repeat_n("1", MAX_CELLS + 10));
        assert_eq!(list.len(), MAX_CELLS);
        assert_eq!(list.focused(), Some(MAX_CELLS - 1));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append,
        Grow(usize),
        DeleteNow(usize),
        BeginDelete(usize),
        FinishDelete,
        MoveFocus(isize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Append),
            (0usize..16).prop_map(Op::Grow),
            (0usize..16).prop_map(Op::DeleteNow),
            (0usize..16).prop_map(Op::BeginDelete),
            Just(Op::FinishDelete),
            prop_oneof![Just(-1isize), Just(1isize)].prop_map(Op::MoveFocus),
        ]
    }

    proptest! {
        #[test]
        fn prop_operation_sequences_keep_invariants(
            ops in proptest::collection::vec(op_strategy(), 0..200)
        ) {
            let mut list = CellList::new();
            let mut pending = Vec::new();
            for op in ops {
                match op {
                    Op::Append => {
                        list.append("a");
                    }
                    Op::Grow(index) => {
                        list.insert_at_or_grow(index, "g");
                    }
                    Op::DeleteNow(index) => {
                        list.delete_now(index);
                    }
                    Op::BeginDelete(index) => {
                        if let Some(id) = list.begin_delete(index) {
                            pending.push(id);
                        }
                    }
                    Op::FinishDelete => {
                        if let Some(id) = pending.pop() {
                            list.finish_delete(id);
                        }
                    }
                    Op::MoveFocus(delta) => {
                        list.move_focus(delta);
                    }
                }
                prop_assert!(!list.is_empty());
                prop_assert!(list.live_count() >= 1);
                for (i, cell) in list.cells().iter().enumerate() {
                    prop_assert_eq!(cell.index, i);
                }
                if let Some(f) = list.focused() {
                    prop_assert!(f < list.len());
                }
            }
        }
    }
}
