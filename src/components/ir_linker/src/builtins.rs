use crate::SymbolTable;
use indexmap::IndexMap;
use ir_tree::{
    Callable, DeclHandle, DeclKind, DeclOrigin, DeclParent, Declaration, IdSignature, IrFile,
    IrType, ModuleFragment, ModuleId, SymbolKind, SymbolRef,
};

pub const BUILTINS_PACKAGE: &str = "builtins.ir";

/// Operators every compiled body may call without importing anything.
const OPERATORS: &[(&str, &[Operand], Operand)] = &[
    ("EQEQ", &[Operand::AnyN, Operand::AnyN], Operand::Boolean),
    ("EQEQEQ", &[Operand::AnyN, Operand::AnyN], Operand::Boolean),
    ("THROW_NPE", &[], Operand::Nothing),
    ("noWhenBranchMatchedException", &[], Operand::Nothing),
    ("CHECK_NOT_NULL", &[Operand::AnyN], Operand::Any),
    ("less", &[Operand::Int, Operand::Int], Operand::Boolean),
    ("lessOrEqual", &[Operand::Int, Operand::Int], Operand::Boolean),
    ("greater", &[Operand::Int, Operand::Int], Operand::Boolean),
    ("greaterOrEqual", &[Operand::Int, Operand::Int], Operand::Boolean),
    ("ieee754equals", &[Operand::DoubleN, Operand::DoubleN], Operand::Boolean),
];

#[derive(Copy, Clone, Debug)]
enum Operand {
    Any,
    AnyN,
    Boolean,
    DoubleN,
    Int,
    Nothing,
}

impl Operand {
    fn class_and_nullability(self) -> (&'static str, bool) {
        match self {
            Self::Any => ("Any", false),
            Self::AnyN => ("Any", true),
            Self::Boolean => ("Boolean", false),
            Self::DoubleN => ("Double", true),
            Self::Int => ("Int", false),
            Self::Nothing => ("Nothing", false),
        }
    }
}

/// Well-known keys served by the builtins module without any search.
#[derive(Debug, Default)]
pub struct BuiltIns {
    symbols: IndexMap<IdSignature, SymbolRef>,
}

impl BuiltIns {
    pub fn signature(name: &str) -> IdSignature {
        IdSignature::public(BUILTINS_PACKAGE, name)
    }

    /// Declares every builtin operator in `fragment` and binds its symbol.
    pub fn install(
        module: ModuleId,
        fragment: &mut ModuleFragment,
        symbols: &mut SymbolTable,
    ) -> Self {
        let file = fragment
            .files
            .alloc(IrFile::new("<builtins>", BUILTINS_PACKAGE, vec![]));
        let mut operand_types = IndexMap::new();
        let mut builtins = Self::default();

        let mut operand_type = |operand: Operand, symbols: &mut SymbolTable| {
            let (class, nullable) = operand.class_and_nullability();
            let signature = IdSignature::public("kotlin", class);

            let classifier = *operand_types
                .entry(class)
                .or_insert_with(|| match symbols.public(&signature) {
                    Some(symbol) => symbol,
                    None => symbols.create(signature.clone(), SymbolKind::Class, None),
                });

            IrType {
                classifier,
                arguments: vec![],
                nullable,
            }
        };

        for (name, params, return_type) in OPERATORS {
            let signature = Self::signature(name);
            let symbol = match symbols.public(&signature) {
                Some(symbol) => symbol,
                None => symbols.create(signature.clone(), SymbolKind::Function, None),
            };

            let kind = DeclKind::Function(Callable {
                params: params.iter().map(|param| operand_type(*param, symbols)).collect(),
                return_type: operand_type(*return_type, symbols),
                is_inline: false,
                body: None,
            });

            let decl = fragment.decls.alloc(Declaration {
                symbol,
                name: name.to_string(),
                kind,
                origin: DeclOrigin::BuiltIn,
                is_expect: false,
                file,
                parent: DeclParent::File(file),
                members: vec![],
                debug_info: None,
            });

            fragment.files[file].declarations.push(decl);

            if let Err(error) = symbols.bind(symbol, DeclHandle::new(module, decl)) {
                log::warn!("Builtin '{}' was already bound: {}", name, error);
            }

            builtins.symbols.insert(signature, symbol);
        }

        builtins
    }

    pub fn contains(&self, signature: &IdSignature) -> bool {
        self.symbols.contains_key(signature)
    }

    pub fn get(&self, signature: &IdSignature) -> Option<SymbolRef> {
        self.symbols.get(signature).copied()
    }
}
