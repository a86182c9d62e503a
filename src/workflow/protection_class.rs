//! Protection class heuristic
//!
//! The location page renders one radio option per protection class, labelled
//! with a parenthesized code such as `(3)`. Placeholder codes containing an
//! `x` (e.g. `(1x)`) are never chosen. Among the numeric codes the lowest
//! wins; on ties the first rendered one.

use regex::Regex;
use std::fmt;

const NUMBERED: &str = r"\(\s*(\d+)\s*\)";
const PLACEHOLDER: &str = r"(?i)\(\s*\d*x\d*\s*\)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtectionClassChoice {
    /// Only one option is rendered; the portal pre-selects it
    AlreadySelected,
    /// Click the option at `index`
    Select { index: usize, label: String, code: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoProtectionClass {
    NoOptions,
    OnlyPlaceholders(usize),
    BadPattern(String),
}

impl fmt::Display for NoProtectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoProtectionClass::NoOptions => write!(f, "no protection class options rendered"),
            NoProtectionClass::OnlyPlaceholders(n) => {
                write!(f, "none of the {} options carries a numeric class code", n)
            }
            NoProtectionClass::BadPattern(e) => write!(f, "label pattern error: {}", e),
        }
    }
}

pub fn choose_protection_class(
    labels: &[String],
) -> Result<ProtectionClassChoice, NoProtectionClass> {
    match labels.len() {
        0 => return Err(NoProtectionClass::NoOptions),
        1 => return Ok(ProtectionClassChoice::AlreadySelected),
        _ => {}
    }

    let numbered = Regex::new(NUMBERED).map_err(|e| NoProtectionClass::BadPattern(e.to_string()))?;
    let placeholder =
        Regex::new(PLACEHOLDER).map_err(|e| NoProtectionClass::BadPattern(e.to_string()))?;

    let mut best: Option<(usize, u32)> = None;
    for (index, label) in labels.iter().enumerate() {
        if placeholder.is_match(label) {
            continue;
        }
        let code = numbered
            .captures(label)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        if let Some(code) = code {
            // strict `<` keeps the first minimum
            if best.map_or(true, |(_, current)| code < current) {
                best = Some((index, code));
            }
        }
    }

    match best {
        Some((index, code)) => Ok(ProtectionClassChoice::Select {
            index,
            label: labels[index].clone(),
            code,
        }),
        None => Err(NoProtectionClass::OnlyPlaceholders(labels.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn picks_lowest_numeric_code_ignoring_placeholders() {
        let choice = choose_protection_class(&labels(&["(2)", "(1x)", "(1)"])).unwrap();
        assert_eq!(
            choice,
            ProtectionClassChoice::Select {
                index: 2,
                label: "(1)".into(),
                code: 1
            }
        );
    }

    #[test]
    fn single_option_needs_no_action() {
        assert_eq!(
            choose_protection_class(&labels(&["(3)"])).unwrap(),
            ProtectionClassChoice::AlreadySelected
        );
    }

    #[test]
    fn placeholders_only_is_an_error() {
        assert_eq!(
            choose_protection_class(&labels(&["(5x)", "(9X)"])),
            Err(NoProtectionClass::OnlyPlaceholders(2))
        );
    }

    #[test]
    fn empty_group_is_an_error() {
        assert_eq!(
            choose_protection_class(&[]),
            Err(NoProtectionClass::NoOptions)
        );
    }

    #[test]
    fn ties_keep_the_first_and_surrounding_text_is_ignored() {
        let choice = choose_protection_class(&labels(&[
            "Class 4 (04)",
            "Class 4 (4) alt",
            "Unprotected (10)",
        ]))
        .unwrap();
        match choice {
            ProtectionClassChoice::Select { index, code, .. } => {
                assert_eq!(index, 0);
                assert_eq!(code, 4);
            }
            other => panic!("unexpected choice: {:?}", other),
        }
    }

    #[test]
    fn labels_without_codes_are_skipped() {
        let choice = choose_protection_class(&labels(&["Select one", "(7)"])).unwrap();
        assert!(matches!(choice, ProtectionClassChoice::Select { index: 1, code: 7, .. }));
    }
}
