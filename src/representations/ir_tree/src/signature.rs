use std::fmt::Display;

/// Name-based part of a public identity key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommonSignature {
    /// Dot-separated package name, e.g. `kotlin.collections`.
    pub package: String,
    /// Dot-separated path inside the package, e.g. `Outer.inner`.
    /// Empty for the package itself.
    pub declaration: String,
    /// Disambiguates overloads.
    pub id: Option<u64>,
    pub is_expect: bool,
}

impl CommonSignature {
    pub fn new(package: impl Into<String>, declaration: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            declaration: declaration.into(),
            id: None,
            is_expect: false,
        }
    }

    pub fn with_id(self, id: u64) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }

    pub fn expect(self) -> Self {
        Self {
            is_expect: true,
            ..self
        }
    }

    pub fn short_name(&self) -> &str {
        self.declaration
            .rsplit_once('.')
            .map_or(self.declaration.as_str(), |(_, name)| name)
    }

    pub fn is_package(&self) -> bool {
        self.declaration.is_empty()
    }

    pub fn is_top_level(&self) -> bool {
        !self.is_package() && !self.declaration.contains('.')
    }

    pub fn top_level(&self) -> Self {
        match self.declaration.split_once('.') {
            Some((first, _)) => Self {
                package: self.package.clone(),
                declaration: first.into(),
                id: None,
                is_expect: self.is_expect,
            },
            None => self.clone(),
        }
    }

    pub fn member(&self, name: &str) -> Self {
        let declaration = if self.declaration.is_empty() {
            name.into()
        } else {
            format!("{}.{}", self.declaration, name)
        };

        Self {
            package: self.package.clone(),
            declaration,
            id: None,
            is_expect: self.is_expect,
        }
    }
}

impl Display for CommonSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.package, self.declaration)?;

        if let Some(id) = self.id {
            write!(f, "|{}", id)?;
        }

        if self.is_expect {
            write!(f, "[expect]")?;
        }

        Ok(())
    }
}

/// Identity key of a declaration.
///
/// Public keys are equal across libraries exactly when they name the same
/// declaration. The other forms only mean something inside one file of one
/// module.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdSignature {
    Public(CommonSignature),
    Accessor {
        property: Box<IdSignature>,
        accessor: CommonSignature,
    },
    FileLocal {
        container: Option<Box<IdSignature>>,
        id: u64,
    },
    Scoped {
        id: u32,
    },
}

impl IdSignature {
    pub fn public(package: impl Into<String>, declaration: impl Into<String>) -> Self {
        Self::Public(CommonSignature::new(package, declaration))
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Self::Public(_) | Self::Accessor { .. })
    }

    pub fn is_local(&self) -> bool {
        !self.is_public()
    }

    /// Keys of declarations that only exist inside a body.
    pub fn is_scoped(&self) -> bool {
        matches!(self, Self::Scoped { .. })
    }

    pub fn is_expect(&self) -> bool {
        match self {
            Self::Public(common) => common.is_expect,
            Self::Accessor { accessor, .. } => accessor.is_expect,
            Self::FileLocal { .. } | Self::Scoped { .. } => false,
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, Self::Public(common) if common.is_package())
    }

    pub fn package(&self) -> Option<&str> {
        match self {
            Self::Public(common) => Some(&common.package),
            Self::Accessor { property, .. } => property.package(),
            Self::FileLocal {
                container: Some(container),
                ..
            } => container.package(),
            Self::FileLocal {
                container: None, ..
            }
            | Self::Scoped { .. } => None,
        }
    }

    /// Key of the top-level declaration this key is nested in.
    ///
    /// Top-level keys are their own top level. A private top-level key has no
    /// container and is its own top level too.
    pub fn top_level(&self) -> IdSignature {
        match self {
            Self::Public(common) => Self::Public(common.top_level()),
            Self::Accessor { property, .. } => property.top_level(),
            Self::FileLocal {
                container: Some(container),
                ..
            } => container.top_level(),
            Self::FileLocal {
                container: None, ..
            }
            | Self::Scoped { .. } => self.clone(),
        }
    }

    pub fn is_top_level(&self) -> bool {
        match self {
            Self::Public(common) => common.is_top_level(),
            Self::FileLocal { container, .. } => container.is_none(),
            Self::Accessor { .. } | Self::Scoped { .. } => false,
        }
    }

    /// Public key of a member named `name`, when this key can have members.
    pub fn member(&self, name: &str) -> Option<IdSignature> {
        match self {
            Self::Public(common) => Some(Self::Public(common.member(name))),
            _ => None,
        }
    }
}

impl From<CommonSignature> for IdSignature {
    fn from(common: CommonSignature) -> Self {
        Self::Public(common)
    }
}

impl Display for IdSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Public(common) => write!(f, "{}", common),
            Self::Accessor { property, accessor } => {
                write!(f, "{}:{}", property, accessor.short_name())
            }
            Self::FileLocal {
                container: Some(container),
                id,
            } => write!(f, "{}#{}", container, id),
            Self::FileLocal {
                container: None,
                id,
            } => write!(f, "<private>#{}", id),
            Self::Scoped { id } => write!(f, "<scoped>#{}", id),
        }
    }
}
