use std::collections::HashSet;
use derive_more::Display;
use serde::{Serialize, Serializer};
use strum_macros::IntoStaticStr;

use crate::consts::{DEFAULT_MIN_DISTINCT_CHARS, DEFAULT_MIN_LENGTH};

/// A strength rule that a password broke, along with the advice shown for it.
#[derive(Display, IntoStaticStr, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StrengthRule {
    #[display("The password should include at least {min_length} characters")]
    TooShort { min_length: usize },
    #[display("The password should include at least {min_distinct} different characters")]
    TooMonotonous { min_distinct: usize },
    #[display("The password should not consist only of digits")]
    OnlyDigits,
    #[display("The password should not consist only of lowercase Latin letters")]
    OnlyLowercase,
    #[display("The password should not consist only of uppercase Latin letters")]
    OnlyUppercase,
}

impl StrengthRule {
    /// Stable identifier, e.g. `TOO_SHORT`.
    pub fn id(&self) -> &'static str {
        self.into()
    }
}

impl Serialize for StrengthRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

#[derive(Serialize, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    #[display("weak")]
    Weak,
    #[display("strong")]
    Strong,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StrengthVerdict {
    strength: Strength,
    violated_rules: Vec<StrengthRule>, // in the order they fired
}

impl StrengthVerdict {
    fn new(violated_rules: Vec<StrengthRule>) -> Self {
        let strength = if violated_rules.is_empty() { Strength::Strong } else { Strength::Weak };
        Self { strength, violated_rules }
    }

    pub fn is_weak(&self) -> bool {
        self.strength == Strength::Weak
    }

    pub fn strength(&self) -> Strength {
        self.strength
    }

    pub fn violated_rules(&self) -> &[StrengthRule] {
        &self.violated_rules
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrengthPolicy {
    pub min_length: usize,
    pub min_distinct: usize,
}

impl Default for StrengthPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_LENGTH,
            min_distinct: DEFAULT_MIN_DISTINCT_CHARS,
        }
    }
}

impl StrengthPolicy {
    /// Rules are tried in a fixed order: length, then diversity, then composition.
    /// A length or diversity violation stops the evaluation, so a password gets at most
    /// one of those two pieces of advice. The composition rules are all evaluated.
    pub fn classify(&self, password: &str) -> StrengthVerdict {
        let mut violated = Vec::new();

        if password.chars().count() < self.min_length {
            violated.push(StrengthRule::TooShort { min_length: self.min_length });
        } else if password.chars().collect::<HashSet<_>>().len() < self.min_distinct {
            violated.push(StrengthRule::TooMonotonous { min_distinct: self.min_distinct });
        } else if !password.is_empty() {
            if password.chars().all(|c| c.is_ascii_digit()) {
                violated.push(StrengthRule::OnlyDigits);
            }
            if password.chars().all(|c| c.is_ascii_lowercase()) {
                violated.push(StrengthRule::OnlyLowercase);
            }
            if password.chars().all(|c| c.is_ascii_uppercase()) {
                violated.push(StrengthRule::OnlyUppercase);
            }
        }

        StrengthVerdict::new(violated)
    }
}
