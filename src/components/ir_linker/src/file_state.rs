use crate::SignatureDecoder;
use indexmap::{IndexMap, IndexSet};
use ir_tree::{FileRef, IdSignature, SymbolRef};
use std::collections::HashMap;

/// Materialization bookkeeping for one file of a library-backed module.
#[derive(Debug)]
pub struct FileState {
    pub file: FileRef,
    /// Position of the file inside its library.
    pub library_index: u32,
    signature_index: IndexMap<IdSignature, u32>,
    reachable: IndexSet<IdSignature>,
    in_progress: Option<IdSignature>,
    pub(crate) local_symbols: HashMap<IdSignature, SymbolRef>,
    pub(crate) signatures: SignatureDecoder,
    pub(crate) pending_annotations: Option<Vec<u32>>,
}

impl FileState {
    pub fn new(
        file: FileRef,
        library_index: u32,
        signature_index: IndexMap<IdSignature, u32>,
        signatures: SignatureDecoder,
        annotations: Vec<u32>,
    ) -> Self {
        Self {
            file,
            library_index,
            signature_index,
            reachable: IndexSet::new(),
            in_progress: None,
            local_symbols: HashMap::new(),
            signatures,
            pending_annotations: (!annotations.is_empty()).then_some(annotations),
        }
    }

    pub fn declaration_index(&self, signature: &IdSignature) -> Option<u32> {
        self.signature_index.get(signature).copied()
    }

    /// Adds `signature` to the work-list unless it is being materialized
    /// right now. Callers skip keys that are already bound.
    pub fn enqueue(&mut self, signature: IdSignature) -> bool {
        if self.in_progress.as_ref() == Some(&signature) {
            return false;
        }

        self.reachable.insert(signature)
    }

    pub fn enqueue_all(&mut self) {
        self.reachable
            .extend(self.signature_index.keys().cloned());
    }

    pub fn has_reachable(&self) -> bool {
        !self.reachable.is_empty()
    }

    pub fn pop_reachable(&mut self) -> Option<IdSignature> {
        self.reachable.shift_remove_index(0)
    }

    pub fn begin(&mut self, signature: IdSignature) {
        self.in_progress = Some(signature);
    }

    pub fn finish(&mut self) {
        self.in_progress = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena::{Id, Idx};

    fn state() -> FileState {
        let signature_index = IndexMap::from_iter([
            (IdSignature::public("p", "foo"), 0),
            (IdSignature::public("p", "bar"), 1),
        ]);

        FileState::new(
            Idx::from_raw(Id::from_usize(0)),
            0,
            signature_index,
            SignatureDecoder::default(),
            vec![],
        )
    }

    #[test]
    fn work_list_is_fifo_and_deduplicated() {
        let mut state = state();
        let foo = IdSignature::public("p", "foo");
        let bar = IdSignature::public("p", "bar");

        assert!(state.enqueue(bar.clone()));
        assert!(state.enqueue(foo.clone()));
        assert!(!state.enqueue(bar.clone()));

        assert_eq!(state.pop_reachable(), Some(bar));
        assert_eq!(state.pop_reachable(), Some(foo));
        assert_eq!(state.pop_reachable(), None);
    }

    #[test]
    fn key_in_progress_is_not_enqueued() {
        let mut state = state();
        let foo = IdSignature::public("p", "foo");

        state.begin(foo.clone());
        assert!(!state.enqueue(foo.clone()));
        state.finish();
        assert!(state.enqueue(foo));
    }

    #[test]
    fn enqueue_all_uses_index_order() {
        let mut state = state();
        state.enqueue_all();

        assert_eq!(state.declaration_index(&IdSignature::public("p", "bar")), Some(1));
        assert_eq!(state.pop_reachable(), Some(IdSignature::public("p", "foo")));
        assert!(state.has_reachable());
    }
}
