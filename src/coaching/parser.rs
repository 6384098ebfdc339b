use serde::Serialize;

use crate::camera::CameraAdjustment;

const SCORE_LABEL: &str = "score:";
const FEEDBACK_LABEL: &str = "feedback:";
const ADJUST_LABEL: &str = "camera_adjust:";
const MAX_SCORE: u8 = 100;

/// Structured result of one coaching response.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedFeedback {
    pub score: u8,
    pub feedback: String,
    pub camera_adjustment: Option<CameraAdjustment>,
}

/// Best-effort parse of the model's `Score:` / `Feedback:` / `CAMERA_ADJUST:`
/// answer. Never fails; missing or malformed sections degrade to defaults.
pub fn parse(raw: &str) -> ParsedFeedback {
    // ASCII lowercasing keeps byte offsets aligned with `raw`.
    let folded = raw.to_ascii_lowercase();

    ParsedFeedback {
        score: extract_score(raw, &folded),
        feedback: extract_feedback(raw, &folded),
        camera_adjustment: extract_adjustment(raw, &folded),
    }
}

fn extract_score(raw: &str, folded: &str) -> u8 {
    for (idx, _) in folded.match_indices(SCORE_LABEL) {
        let rest = raw[idx + SCORE_LABEL.len()..].trim_start();
        let digits_len = rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits_len == 0 {
            continue;
        }
        return rest[..digits_len]
            .parse::<u32>()
            .map(|score| score.min(MAX_SCORE as u32) as u8)
            .unwrap_or(0);
    }
    0
}

fn extract_feedback(raw: &str, folded: &str) -> String {
    let Some(label_at) = folded.find(FEEDBACK_LABEL) else {
        return raw.trim().to_string();
    };
    let start = label_at + FEEDBACK_LABEL.len();
    let end = folded[start..]
        .find(ADJUST_LABEL)
        .map(|offset| start + offset)
        .unwrap_or(raw.len());
    raw[start..end].trim().to_string()
}

fn extract_adjustment(raw: &str, folded: &str) -> Option<CameraAdjustment> {
    let Some(label_at) = folded.find(ADJUST_LABEL) else {
        // The response was not produced in adjustment-aware form.
        return Some(CameraAdjustment::neutral());
    };
    let rest = &raw[label_at + ADJUST_LABEL.len()..];

    // Greedy: first `{` through the last `}` so nested objects stay intact.
    let open = rest.find('{')?;
    let close = rest.rfind('}')?;
    if close < open {
        return None;
    }

    serde_json::from_str::<CameraAdjustment>(&rest[open..=close]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{FlashMode, FocusPoint};

    #[test]
    fn extracts_score_and_trimmed_feedback() {
        let parsed = parse("Score: 65\nFeedback:   text here  \n");
        assert_eq!(parsed.score, 65);
        assert_eq!(parsed.feedback, "text here");
    }

    #[test]
    fn labels_are_case_insensitive() {
        let parsed = parse("SCORE: 12\nfeedback: lower the horizon");
        assert_eq!(parsed.score, 12);
        assert_eq!(parsed.feedback, "lower the horizon");
    }

    #[test]
    fn missing_score_defaults_to_zero() {
        assert_eq!(parse("Feedback: nice light").score, 0);
        assert_eq!(parse("Score: none yet\nFeedback: ok").score, 0);
    }

    #[test]
    fn first_numeric_score_wins_and_large_values_clamp() {
        assert_eq!(parse("Score: n/a, Score: 40, Score: 90").score, 40);
        assert_eq!(parse("Score: 250").score, 100);
        assert_eq!(parse("Score: 99999999999999999999").score, 0);
    }

    #[test]
    fn missing_feedback_label_uses_whole_response_trimmed() {
        let raw = "  Move closer to your subject.\nScore: 70  ";
        assert_eq!(parse(raw).feedback, raw.trim());
    }

    #[test]
    fn feedback_stops_at_camera_adjust_label() {
        let raw = "Score: 80\nFeedback: Great framing.\nCAMERA_ADJUST: {\"zoom\": 0.2}";
        let parsed = parse(raw);
        assert_eq!(parsed.feedback, "Great framing.");
        assert_eq!(parsed.camera_adjustment.and_then(|adj| adj.zoom), Some(0.2));
    }

    #[test]
    fn full_adjustment_with_nested_focus_point_is_preserved() {
        let raw = r#"Score: 88
Feedback: Use the torch for fill light.
CAMERA_ADJUST: {"zoom": 0.5, "focusPoint": {"x": 0.2, "y": 0.8}, "flash": "torch", "exposureCompensation": 1.0}"#;
        let parsed = parse(raw);
        assert_eq!(
            parsed.camera_adjustment,
            Some(CameraAdjustment {
                zoom: Some(0.5),
                focus_point: Some(FocusPoint { x: 0.2, y: 0.8 }),
                flash: Some(FlashMode::Torch),
                exposure_compensation: Some(1.0),
            })
        );
    }

    #[test]
    fn malformed_adjustment_is_absent_not_default() {
        let parsed = parse("Score: 50\nFeedback: ok\nCAMERA_ADJUST: {invalid json");
        assert_eq!(parsed.camera_adjustment, None);

        let no_object = parse("Feedback: ok\nCAMERA_ADJUST: none");
        assert_eq!(no_object.camera_adjustment, None);
    }

    #[test]
    fn missing_adjustment_label_yields_neutral_default() {
        let parsed = parse("Score: 50\nFeedback: hold steady");
        assert_eq!(parsed.camera_adjustment, Some(CameraAdjustment::neutral()));
    }

    #[test]
    fn partial_adjustment_keeps_absent_fields_empty() {
        let parsed = parse("camera_adjust: {\"exposureCompensation\": -0.7} trailing");
        let adjustment = parsed.camera_adjustment.unwrap();
        assert_eq!(adjustment.exposure_compensation, Some(-0.7));
        assert_eq!(adjustment.zoom, None);
        assert_eq!(adjustment.focus_point, None);
    }

    #[test]
    fn non_ascii_text_does_not_break_offsets() {
        let parsed = parse("Score: 77\nFeedback: Très bien — léger contre-jour ☀\nCAMERA_ADJUST: {}");
        assert_eq!(parsed.score, 77);
        assert_eq!(parsed.feedback, "Très bien — léger contre-jour ☀");
        assert_eq!(parsed.camera_adjustment, Some(CameraAdjustment::default()));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn mentions(raw: &str, label: &str) -> bool {
            raw.to_ascii_lowercase().contains(label)
        }

        proptest! {
            #[test]
            fn never_panics(raw in any::<String>()) {
                let parsed = parse(&raw);
                prop_assert!(parsed.score <= MAX_SCORE);
            }

            #[test]
            fn unlabeled_score_is_zero(raw in any::<String>()) {
                prop_assume!(!mentions(&raw, SCORE_LABEL));
                prop_assert_eq!(parse(&raw).score, 0);
            }

            #[test]
            fn unlabeled_feedback_is_whole_response(raw in any::<String>()) {
                prop_assume!(!mentions(&raw, FEEDBACK_LABEL));
                prop_assert_eq!(parse(&raw).feedback, raw.trim());
            }

            #[test]
            fn unlabeled_adjustment_is_neutral(raw in any::<String>()) {
                prop_assume!(!mentions(&raw, ADJUST_LABEL));
                prop_assert_eq!(parse(&raw).camera_adjustment, Some(CameraAdjustment::neutral()));
            }

            #[test]
            fn labeled_score_and_feedback_are_recovered(
                prefix in "[^:]{0,24}",
                score in 0u8..=100,
                text in "[^:]{0,48}",
            ) {
                let parsed = parse(&format!("{prefix}Score: {score}\nFeedback: {text}"));
                prop_assert_eq!(parsed.score, score);
                prop_assert_eq!(parsed.feedback, text.trim());
                prop_assert_eq!(parsed.camera_adjustment, Some(CameraAdjustment::neutral()));
            }
        }
    }
}
