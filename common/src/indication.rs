use derive_more::Display;
use serde::Serialize;

use crate::{
    consts::DEFAULT_CRITICAL_LEAK_THRESHOLD,
    range::Exposure,
    strength::{StrengthRule, StrengthVerdict},
};

#[derive(Serialize, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IndicationState {
    /// Nothing typed. Never the outcome of a check.
    #[display("neutral")]
    Neutral,
    #[display("success")]
    Success,
    #[display("warning")]
    Warning,
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureAdvice {
    #[display("Error: Unable to check the password for leaks")]
    UnableToCheck,
    #[display("No leaks detected")]
    NoLeaks,
    #[display("A few leaks detected")]
    FewLeaks,
    #[display("A lot of leaks detected")]
    ManyLeaks,
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    #[display("{_0}")]
    Exposure(ExposureAdvice),
    #[display("{_0}")]
    Strength(StrengthRule),
}

/// What the user gets to see: one signal and the advice that goes with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indication {
    pub state: IndicationState,
    pub advisories: Vec<Advisory>,
}

impl Indication {
    pub fn neutral() -> Self {
        Self {
            state: IndicationState::Neutral,
            advisories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presenter {
    /// From this many leaks on, it's "a lot".
    pub critical_leak_threshold: u64,
}

impl Default for Presenter {
    fn default() -> Self {
        Self { critical_leak_threshold: DEFAULT_CRITICAL_LEAK_THRESHOLD }
    }
}

impl Presenter {
    pub fn present(&self, exposure: Exposure, verdict: &StrengthVerdict) -> Indication {
        let state = if exposure.is_clean() && !verdict.is_weak() {
            IndicationState::Success
        } else {
            IndicationState::Warning
        };

        let mut advisories = Vec::with_capacity(1 + verdict.violated_rules().len());
        advisories.push(Advisory::Exposure(self.exposure_advice(exposure)));
        advisories.extend(verdict.violated_rules().iter().copied().map(Advisory::Strength));

        Indication { state, advisories }
    }

    fn exposure_advice(&self, exposure: Exposure) -> ExposureAdvice {
        match exposure {
            Exposure::Unknown => ExposureAdvice::UnableToCheck,
            Exposure::Count(0) => ExposureAdvice::NoLeaks,
            Exposure::Count(n) if n < self.critical_leak_threshold => ExposureAdvice::FewLeaks,
            Exposure::Count(_) => ExposureAdvice::ManyLeaks,
        }
    }
}
