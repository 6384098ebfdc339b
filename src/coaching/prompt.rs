use std::fmt::Write;

use super::options::{AnalysisOptions, SkillLevel};

fn skill_guidance(level: SkillLevel) -> &'static str {
    match level {
        SkillLevel::Beginner => {
            "The photographer is a beginner. Use plain language, one concrete tip at a time, and be encouraging."
        }
        SkillLevel::Intermediate => {
            "The photographer is intermediate. Mention composition and lighting terms briefly when useful."
        }
        SkillLevel::Advanced => {
            "The photographer is advanced. Be concise and technical; skip the basics."
        }
        SkillLevel::Professional => {
            "The photographer is a professional. Give terse, precise notes on what would elevate the shot."
        }
    }
}

const RESPONSE_CONTRACT: &str = "Respond in exactly this format:\n\
Score: <integer 0-100 rating the current frame>\n\
Feedback: <one or two short sentences of live coaching>";

const ADJUST_CONTRACT: &str = "Then add one line:\n\
CAMERA_ADJUST: {\"zoom\": <0.0-1.0>, \"focusPoint\": {\"x\": <0.0-1.0>, \"y\": <0.0-1.0>}, \
\"flash\": \"on\"|\"off\"|\"auto\"|\"torch\", \"exposureCompensation\": <-2.0-2.0>}\n\
Only include fields you want changed; use {} to leave the camera as is.";

/// Render the live-coaching prompt for one frame.
pub fn build_prompt(options: &AnalysisOptions) -> String {
    let mut prompt = String::from(
        "You are a live photography coach looking at the camera viewfinder.\n",
    );

    let _ = writeln!(prompt, "{}", skill_guidance(options.skill_level));
    let _ = writeln!(prompt, "Preferred style: {}.", options.preferred_style);
    let _ = writeln!(prompt, "Shooting context: {}.", options.context_type);
    if let Some(time_of_day) = options.time_of_day.as_deref() {
        let _ = writeln!(prompt, "Time of day: {time_of_day}.");
    }
    if let Some(environment) = options.environment.as_deref() {
        let _ = writeln!(prompt, "Environment: {environment}.");
    }

    if let Some(reference) = options.reference.as_ref() {
        prompt.push_str(
            "The user is trying to match a reference photo (second image). \
             Coach them toward its framing, angle and light.\n",
        );
        if let Some(analysis) = reference.analysis.as_deref() {
            let _ = writeln!(prompt, "Reference analysis: {}", analysis.trim());
        }
    }

    prompt.push('\n');
    prompt.push_str(RESPONSE_CONTRACT);
    if options.ai_control_enabled {
        prompt.push('\n');
        prompt.push_str(ADJUST_CONTRACT);
    }
    prompt
}
