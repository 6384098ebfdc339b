use serde::{Deserialize, Deserializer, Serialize};

use crate::reference::ReferencePhoto;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
}

impl Default for SkillLevel {
    fn default() -> Self {
        SkillLevel::Beginner
    }
}

/// Prompt context for one coaching cycle. Each cycle works on its own clone,
/// so a concurrent `update_options` never changes a request already built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    pub skill_level: SkillLevel,
    pub preferred_style: String,
    pub context_type: String,
    pub time_of_day: Option<String>,
    pub environment: Option<String>,
    pub reference: Option<ReferencePhoto>,
    /// Gates both the adjustment section of the prompt and actuation of the
    /// parsed adjustment.
    pub ai_control_enabled: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            skill_level: SkillLevel::Beginner,
            preferred_style: "natural".into(),
            context_type: "general".into(),
            time_of_day: None,
            environment: None,
            reference: None,
            ai_control_enabled: false,
        }
    }
}

/// Partial update for [`AnalysisOptions`]. A `Some` field replaces the base
/// value; `None` leaves it untouched. `reference: Some(None)` clears the
/// reference photo.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptionsPatch {
    pub skill_level: Option<SkillLevel>,
    pub preferred_style: Option<String>,
    pub context_type: Option<String>,
    pub time_of_day: Option<String>,
    pub environment: Option<String>,
    #[serde(deserialize_with = "present")]
    pub reference: Option<Option<ReferencePhoto>>,
    pub ai_control_enabled: Option<bool>,
}

/// Distinguishes `"reference": null` (clear) from a missing key (keep).
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl AnalysisOptionsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Pure per-field merge: patch values win, absent patch fields keep the
/// base.
pub fn merge(base: &AnalysisOptions, patch: AnalysisOptionsPatch) -> AnalysisOptions {
    AnalysisOptions {
        skill_level: patch.skill_level.unwrap_or(base.skill_level),
        preferred_style: patch
            .preferred_style
            .unwrap_or_else(|| base.preferred_style.clone()),
        context_type: patch
            .context_type
            .unwrap_or_else(|| base.context_type.clone()),
        time_of_day: patch.time_of_day.or_else(|| base.time_of_day.clone()),
        environment: patch.environment.or_else(|| base.environment.clone()),
        reference: match patch.reference {
            Some(reference) => reference,
            None => base.reference.clone(),
        },
        ai_control_enabled: patch.ai_control_enabled.unwrap_or(base.ai_control_enabled),
    }
}
