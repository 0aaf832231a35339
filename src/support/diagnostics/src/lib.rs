/*
    ====================  support/diagnostics/src/lib.rs  =====================
    Collects errors and warnings raised while linking
    ---------------------------------------------------------------------------
*/

mod error;
mod show;
mod warning;

use core::fmt::Debug;
pub use error::ErrorDiagnostic;
pub use show::{Show, into_show};
use std::sync::{
    Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};
pub use warning::WarningDiagnostic;

pub trait Diagnostic: Show + Send + Sync {
    fn is_error(&self) -> bool {
        false
    }
}

#[derive(Clone, Debug)]
pub struct DiagnosticFlags {
    pub print_without_collecting: bool,
    pub warnings_as_errors: bool,
}

impl Default for DiagnosticFlags {
    fn default() -> Self {
        Self {
            print_without_collecting: true,
            warnings_as_errors: false,
        }
    }
}

pub struct Diagnostics {
    diagnostics: Mutex<Vec<Box<dyn Diagnostic>>>,
    errors: AtomicUsize,
    flags: DiagnosticFlags,
}

impl Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("errors", &self.error_count())
            .finish_non_exhaustive()
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DiagnosticFlags::default())
    }
}

impl Diagnostics {
    pub fn new(flags: DiagnosticFlags) -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            errors: AtomicUsize::new(0),
            flags,
        }
    }

    /// Sink that keeps everything instead of printing, for inspection.
    pub fn collecting() -> Self {
        Self::new(DiagnosticFlags {
            print_without_collecting: false,
            ..Default::default()
        })
    }

    pub fn flags(&self) -> &DiagnosticFlags {
        &self.flags
    }

    pub fn push(&self, diagnostic: impl Diagnostic + 'static) {
        if diagnostic.is_error() || self.flags.warnings_as_errors {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        if self.flags.print_without_collecting {
            self.print(&diagnostic);
        } else {
            self.diagnostics
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(Box::new(diagnostic));
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() != 0
    }

    /// Rendered text of every collected diagnostic, in push order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|diagnostic| {
                let mut message = String::new();
                diagnostic.show(&mut message).ok().map(|_| message)
            })
            .collect()
    }

    pub fn print_all(&self) {
        for diagnostic in self
            .diagnostics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
        {
            self.print(&**diagnostic);
        }
    }

    pub fn print(&self, diagnostic: &dyn Diagnostic) {
        diagnostic.eprintln();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_when_asked() {
        let diagnostics = Diagnostics::collecting();
        diagnostics.push(WarningDiagnostic::plain("shadowed dependency"));
        diagnostics.push(ErrorDiagnostic::new("missing symbol", "app"));

        let messages = diagnostics.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("shadowed dependency"));
        assert!(messages[1].starts_with("app: "));
        assert!(messages[1].contains("missing symbol"));
        assert_eq!(diagnostics.error_count(), 1);
    }

    #[test]
    fn warnings_can_count_as_errors() {
        let diagnostics = Diagnostics::new(DiagnosticFlags {
            print_without_collecting: false,
            warnings_as_errors: true,
        });

        assert!(!diagnostics.has_errors());
        diagnostics.push(WarningDiagnostic::new("ambiguous", "lib"));
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn errors_sort_by_module_then_message() {
        let a = ErrorDiagnostic::new("b", "alpha");
        let b = ErrorDiagnostic::new("a", "beta");
        let c = ErrorDiagnostic::plain("z");

        assert!(a.cmp_with(&b).is_lt());
        assert!(c.cmp_with(&a).is_lt());
    }
}
