use crate::{Diagnostic, Show};
use colored::Colorize;
use std::cmp::Ordering;

#[derive(Debug)]
pub struct ErrorDiagnostic {
    message: String,
    module: Option<String>,
}

impl ErrorDiagnostic {
    pub fn new(message: impl ToString, module: impl ToString) -> Self {
        Self {
            message: message.to_string(),
            module: Some(module.to_string()),
        }
    }

    pub fn plain(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
            module: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn cmp_with(&self, other: &Self) -> Ordering {
        self.module
            .cmp(&other.module)
            .then_with(|| self.message.cmp(&other.message))
    }
}

impl Show for ErrorDiagnostic {
    fn show(&self, w: &mut dyn std::fmt::Write) -> std::fmt::Result {
        if let Some(module) = &self.module {
            write!(w, "{}: {} {}", module, "error:".red().bold(), self.message)
        } else {
            write!(w, "{} {}", "error:".red().bold(), self.message)
        }
    }
}

impl Diagnostic for ErrorDiagnostic {
    fn is_error(&self) -> bool {
        true
    }
}
