//! Template error types with suggestions for misspelled variables

use thiserror::Error;

/// Prompt rendering errors
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Referenced variable doesn't exist
    #[error("undefined variable '{name}'{}", .suggestion.as_ref().map(|s| format!(", did you mean '{}'?", s)).unwrap_or_default())]
    UndefinedVariable {
        name: String,
        suggestion: Option<String>,
    },

    /// Template syntax error
    #[error("syntax error on line {line}: {message}")]
    Syntax { message: String, line: usize },

    /// Any other failure while rendering (bad filter argument, non-iterable loop target, ...)
    #[error("render failed: {message}")]
    Render { message: String },
}

impl TemplateError {
    /// Create an undefined variable error, suggesting the closest known name
    pub fn undefined_variable(name: impl Into<String>, known: &[&str]) -> Self {
        let name = name.into();
        let suggestion = suggest_correction(&name, known);
        Self::UndefinedVariable { name, suggestion }
    }

    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            line,
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }
}

/// Closest candidate within half the typo's length in edits (at least two)
pub fn suggest_correction(typo: &str, candidates: &[&str]) -> Option<String> {
    let max_distance = (typo.chars().count() / 2).max(2);

    candidates
        .iter()
        .map(|candidate| (edit_distance(typo, candidate), *candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, candidate)| candidate.to_string())
}

/// Levenshtein distance over chars, two rows at a time
fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}
