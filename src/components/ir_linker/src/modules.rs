use crate::ModuleDeserializer;
use arena::{Arena, Idx};
use ir_tree::ModuleId;
use std::ops::{Index, IndexMut};

/// Every module of a session, addressed by the ids declarations refer to.
#[derive(Debug, Default)]
pub struct Modules {
    arena: Arena<ModuleId, ModuleDeserializer>,
}

impl Modules {
    pub fn alloc(&mut self, deserializer: ModuleDeserializer) -> ModuleId {
        self.arena.alloc(deserializer).into_raw()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModuleId, &ModuleDeserializer)> {
        self.arena
            .iter()
            .map(|(module, deserializer)| (module.into_raw(), deserializer))
    }
}

impl Index<ModuleId> for Modules {
    type Output = ModuleDeserializer;

    fn index(&self, module: ModuleId) -> &Self::Output {
        &self.arena[Idx::from_raw(module)]
    }
}

impl IndexMut<ModuleId> for Modules {
    fn index_mut(&mut self, module: ModuleId) -> &mut Self::Output {
        &mut self.arena[Idx::from_raw(module)]
    }
}
