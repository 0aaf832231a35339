use indexmap::IndexMap;
use ir_tree::{IdSignature, ModuleId, SymbolRef};
use std::collections::{HashMap, HashSet};

/// Correlates expect declarations with the actuals that implement them.
#[derive(Debug, Default)]
pub struct ExpectActualTable {
    mapping: IndexMap<IdSignature, IdSignature>,
    actuals: HashSet<IdSignature>,
    /// Module that declares each top-level actual.
    actual_modules: HashMap<IdSignature, ModuleId>,
    pub(crate) expect_symbols: HashMap<IdSignature, SymbolRef>,
    pub(crate) actual_symbols: HashMap<IdSignature, SymbolRef>,
}

impl ExpectActualTable {
    /// Records a pair announced by `module`. Returns `false` when the expect
    /// already had an actual, in which case the first one is kept.
    pub fn register(&mut self, expect: IdSignature, actual: IdSignature, module: ModuleId) -> bool {
        if let Some(existing) = self.mapping.get(&expect) {
            log::warn!(
                "Expect '{}' already has actual '{}', ignoring '{}'",
                expect,
                existing,
                actual
            );
            return false;
        }

        self.actual_modules.insert(actual.top_level(), module);
        self.actuals.insert(actual.clone());
        self.mapping.insert(expect, actual);
        true
    }

    pub fn actual_of(&self, expect: &IdSignature) -> Option<&IdSignature> {
        self.mapping.get(expect)
    }

    pub fn is_actual(&self, signature: &IdSignature) -> bool {
        self.actuals.contains(signature)
    }

    pub fn module_of_actual(&self, actual: &IdSignature) -> Option<ModuleId> {
        self.actual_modules.get(&actual.top_level()).copied()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&IdSignature, &IdSignature)> {
        self.mapping.iter()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena::Id;

    #[test]
    fn test_first_actual_wins() {
        let mut table = ExpectActualTable::default();
        let module = ModuleId::from_usize(0);
        let expect = IdSignature::public("mpp", "Platform");
        let jvm = IdSignature::public("mpp.jvm", "Platform");
        let js = IdSignature::public("mpp.js", "Platform");

        assert!(table.register(expect.clone(), jvm.clone(), module));
        assert!(!table.register(expect.clone(), js.clone(), ModuleId::from_usize(1)));

        assert_eq!(table.actual_of(&expect), Some(&jvm));
        assert!(table.is_actual(&jvm));
        assert!(!table.is_actual(&js));
        assert_eq!(table.module_of_actual(&jvm), Some(module));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_members_share_the_module_of_their_class() {
        let mut table = ExpectActualTable::default();
        let module = ModuleId::from_usize(3);

        table.register(
            IdSignature::public("mpp", "Platform.name"),
            IdSignature::public("mpp", "JvmPlatform.name"),
            module,
        );

        let sibling = IdSignature::public("mpp", "JvmPlatform.version");
        assert_eq!(table.module_of_actual(&sibling), Some(module));
        assert!(!table.is_actual(&sibling));
    }
}
