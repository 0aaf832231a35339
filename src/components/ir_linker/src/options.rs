use derive_more::IsVariant;

/// How much of a module is materialized up front, and whether bodies are read.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, IsVariant)]
pub enum DeserializationStrategy {
    /// Exported declarations, then only what somebody asks for.
    #[default]
    OnlyReferenced,
    /// Every indexed declaration.
    Everything,
    /// Declarations the producer marked as exported, plus what they reach.
    OnlyExported,
    /// Declarations without any bodies.
    HeadersOnly,
    /// Declarations with bodies for inline functions only.
    HeadersWithInlineBodies,
}

impl DeserializationStrategy {
    pub fn need_bodies(self) -> bool {
        matches!(
            self,
            Self::OnlyReferenced | Self::Everything | Self::OnlyExported
        )
    }

    pub fn explicitly_exported(self) -> bool {
        matches!(
            self,
            Self::OnlyReferenced | Self::Everything | Self::OnlyExported
        )
    }

    pub fn whole_world(self) -> bool {
        matches!(self, Self::Everything)
    }

    pub fn inline_bodies(self) -> bool {
        !matches!(self, Self::HeadersOnly)
    }
}

/// What to do when more than one dependency declares the same public key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, IsVariant)]
pub enum AmbiguityPolicy {
    /// Report a warning and use the first dependency in declared order.
    #[default]
    Warn,
    /// Fail the session.
    Error,
}

#[derive(Clone, Debug, Default)]
pub struct LinkOptions {
    /// Module that also serves the well-known builtin functions.
    pub builtins_module: Option<String>,
    pub ambiguity: AmbiguityPolicy,
    /// Modules that [`crate::Linker::deserialize_module_header`] reads in full.
    pub exported_dependencies: Vec<String>,
}
