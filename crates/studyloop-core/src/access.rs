//! Tier-based feature gating.
//!
//! The tier is always passed in by the caller from an authoritative user
//! lookup; the gate keeps no state and never changes a tier.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{Chapter, Tier, User};

/// A gated capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Hybrid and LLM-only grading modes.
    AiGrading,
    /// Chapters published for premium subscribers.
    PremiumContent,
    /// Chapters published for pro subscribers.
    ProContent,
}

impl Feature {
    /// Lowest tier allowed to use this feature.
    pub fn minimum_tier(self) -> Tier {
        match self {
            Feature::AiGrading => Tier::Premium,
            Feature::PremiumContent => Tier::Premium,
            Feature::ProContent => Tier::Pro,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::AiGrading => write!(f, "AI-assisted grading"),
            Feature::PremiumContent => write!(f, "premium content"),
            Feature::ProContent => write!(f, "pro content"),
        }
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed,
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }
}

/// Why a feature was refused, with enough detail to render an upgrade prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenialReason {
    pub feature: Feature,
    pub required: Tier,
    pub current: Tier,
}

impl DenialReason {
    pub fn upgrade_prompt(&self) -> String {
        format!(
            "{} requires the {} plan (you are on {}). Upgrade to unlock it.",
            self.feature, self.required, self.current
        )
    }
}

/// Static feature-to-tier gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    pub fn new() -> Self {
        Self
    }

    pub fn can_use_feature(&self, user: &User, feature: Feature) -> AccessDecision {
        let required = feature.minimum_tier();
        if user.tier >= required {
            AccessDecision::Allowed
        } else {
            AccessDecision::Denied(DenialReason {
                feature,
                required,
                current: user.tier,
            })
        }
    }

    /// Content gating for a chapter, expressed through the same feature table.
    pub fn can_access_chapter(&self, user: &User, chapter: &Chapter) -> AccessDecision {
        match chapter.min_tier {
            Tier::Free => AccessDecision::Allowed,
            Tier::Premium => self.can_use_feature(user, Feature::PremiumContent),
            Tier::Pro => self.can_use_feature(user, Feature::ProContent),
        }
    }
}
