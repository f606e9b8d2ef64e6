//! Expression and gesture classification.
//!
//! Classification is a pure function of the current features and the
//! baseline; all temporal behaviour lives in [`crate::debounce`].
//!
//! The multi-class expression rules overlap (a wink with raised brows and
//! an open mouth also scores as surprised), so they are evaluated in the
//! fixed order of [`PRIORITY`] and the first match wins.

use crate::{calibration::Baseline, constants::FULL_MATCH_SCORE, geometry::FeatureVector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expression vocabulary of the matching game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    Neutral,
    Happy,
    Surprised,
    Wink,
}

impl Expression {
    /// Every expression, in the order targets are drawn from
    pub const ALL: [Self; 4] = [Self::Neutral, Self::Happy, Self::Surprised, Self::Wink];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Neutral => "Neutral",
            Self::Happy => "Happy",
            Self::Surprised => "Surprised",
            Self::Wink => "Wink",
        }
    }

    #[must_use]
    pub const fn emoji(self) -> &'static str {
        match self {
            Self::Neutral => "😐",
            Self::Happy => "😊",
            Self::Surprised => "😮",
            Self::Wink => "😉",
        }
    }

    /// Instruction shown to the player
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Neutral => "Keep a relaxed, neutral face",
            Self::Happy => "Smile wide!",
            Self::Surprised => "Open your eyes and mouth wide!",
            Self::Wink => "Close one eye and smile",
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tunable constants of the expression rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionThresholds {
    /// Minimum |EAR left - EAR right| for a wink
    pub wink_asymmetry: f64,
    /// The closed eye must be below this fraction of baseline EAR
    pub wink_closed_fraction: f64,
    /// Surprised criteria, as ratios to baseline
    pub surprised_ear_ratio: f64,
    pub surprised_ebr_ratio: f64,
    pub surprised_mar_ratio: f64,
    /// Surprised criteria that must hold
    pub surprised_min_score: u8,
    /// Happy criteria
    pub happy_smile_ratio: f64,
    pub happy_mar_ratio: f64,
    pub happy_min_smile: f64,
    /// Ratio band counted as "at baseline"
    pub neutral_low: f64,
    pub neutral_high: f64,
    /// Features inside the band needed for a scored neutral
    pub neutral_min_score: u8,
}

impl Default for ExpressionThresholds {
    fn default() -> Self {
        Self {
            wink_asymmetry: 0.08,
            wink_closed_fraction: 0.6,
            surprised_ear_ratio: 1.10,
            surprised_ebr_ratio: 1.10,
            surprised_mar_ratio: 1.2,
            surprised_min_score: 2,
            happy_smile_ratio: 1.15,
            happy_mar_ratio: 1.1,
            happy_min_smile: 0.05,
            neutral_low: 0.85,
            neutral_high: 1.15,
            neutral_min_score: 2,
        }
    }
}

/// Feature ratios against the baseline, 1.0 where the baseline is unset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ratios {
    pub ear: f64,
    pub ebr: f64,
    pub mar: f64,
    pub smile: f64,
}

impl Ratios {
    #[must_use]
    pub fn new(features: &FeatureVector, baseline: &Baseline) -> Self {
        Self {
            ear: baseline.ear_ratio(features.ear),
            ebr: baseline.ebr_ratio(features.ebr),
            mar: baseline.mar_ratio(features.mar),
            smile: baseline.smile_ratio(features.smile),
        }
    }
}

/// One classification rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Wink,
    Surprised,
    Happy,
    /// Neutral by score: enough features inside the neutral band
    ScoredNeutral,
    /// Nothing matched; neutral by default
    UncertainNeutral,
}

/// Rules in evaluation order. Do not reorder.
pub const PRIORITY: [Rule; 4] = [Rule::Wink, Rule::Surprised, Rule::Happy, Rule::ScoredNeutral];

impl Rule {
    /// Expression produced when this rule matches
    #[must_use]
    pub const fn expression(self) -> Expression {
        match self {
            Self::Wink => Expression::Wink,
            Self::Surprised => Expression::Surprised,
            Self::Happy => Expression::Happy,
            Self::ScoredNeutral | Self::UncertainNeutral => Expression::Neutral,
        }
    }

    fn matches(
        self,
        features: &FeatureVector,
        baseline: &Baseline,
        ratios: &Ratios,
        t: &ExpressionThresholds,
    ) -> bool {
        match self {
            Self::Wink => {
                let closed = features.ear_left.min(features.ear_right);
                (features.ear_left - features.ear_right).abs() > t.wink_asymmetry
                    && closed < baseline.ear * t.wink_closed_fraction
            }
            Self::Surprised => {
                let score = count([
                    ratios.ear > t.surprised_ear_ratio,
                    ratios.ebr > t.surprised_ebr_ratio,
                    ratios.mar > t.surprised_mar_ratio,
                ]);
                score >= t.surprised_min_score
            }
            Self::Happy => {
                (ratios.smile > t.happy_smile_ratio || ratios.mar > t.happy_mar_ratio)
                    && features.smile > t.happy_min_smile
            }
            Self::ScoredNeutral => {
                let band = t.neutral_low..=t.neutral_high;
                let score = count([
                    band.contains(&ratios.ear),
                    band.contains(&ratios.ebr),
                    band.contains(&ratios.mar),
                ]);
                score >= t.neutral_min_score
            }
            Self::UncertainNeutral => true,
        }
    }
}

fn count<const N: usize>(criteria: [bool; N]) -> u8 {
    criteria.iter().filter(|&&held| held).count() as u8
}

/// Classifier output: the expression and the rule that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub expression: Expression,
    pub rule: Rule,
    pub ratios: Ratios,
}

/// Classify one frame. First matching rule of [`PRIORITY`] wins.
#[must_use]
pub fn classify(
    features: &FeatureVector,
    baseline: &Baseline,
    thresholds: &ExpressionThresholds,
) -> Classification {
    let ratios = Ratios::new(features, baseline);
    let rule = PRIORITY
        .into_iter()
        .find(|rule| rule.matches(features, baseline, &ratios, thresholds))
        .unwrap_or(Rule::UncertainNeutral);

    Classification {
        expression: rule.expression(),
        rule,
        ratios,
    }
}

/// Binary gesture: brows raised when EBR exceeds `multiplier` times the
/// baseline. Always false while the baseline is unset.
#[must_use]
pub fn is_brow_raised(features: &FeatureVector, baseline: &Baseline, multiplier: f64) -> bool {
    baseline.ebr_ratio(features.ebr) > multiplier
}

/// How well the shown expression matches the target, 0-100.
///
/// Related expressions earn partial credit.
#[must_use]
pub fn match_score(current: Expression, target: Expression) -> u8 {
    use Expression::{Happy, Neutral, Surprised, Wink};

    match (current, target) {
        (c, t) if c == t => FULL_MATCH_SCORE,
        (Happy, Wink) | (Wink, Happy) => 50,
        (Neutral, Happy | Surprised | Wink) => 30,
        _ => 0,
    }
}
