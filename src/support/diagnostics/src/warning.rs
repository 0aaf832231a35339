use crate::{Diagnostic, show::Show};
use colored::Colorize;

#[derive(Debug)]
pub struct WarningDiagnostic {
    message: String,
    module: Option<String>,
}

impl WarningDiagnostic {
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
}

impl Show for WarningDiagnostic {
    fn show(&self, w: &mut dyn std::fmt::Write) -> std::fmt::Result {
        if let Some(module) = &self.module {
            write!(
                w,
                "{}: {} {}",
                module,
                "warning:".yellow().bold(),
                self.message
            )
        } else {
            write!(w, "{} {}", "warning:".yellow().bold(), self.message)
        }
    }
}

impl Diagnostic for WarningDiagnostic {}
