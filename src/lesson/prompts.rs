//! Prompt text for scene generation and evaluation.

use crate::lesson::model::Difficulty;

/// Used when scene generation returns no text, so media generation never
/// receives an empty prompt.
pub const FALLBACK_DESCRIPTION: &str =
    "A busy city street with people walking, cars driving, and tall buildings in the background.";

/// Topic that switches on the business-analysis rubric.
pub const BUSINESS_ANALYSIS_TOPIC: &str = "Business Analysis";

/// Terms a business-analysis scene should invite the learner to use.
const BUSINESS_ANALYSIS_TERMS: &[&str] = &[
    "stakeholder",
    "requirements elicitation",
    "use case",
    "process flow",
    "bottleneck",
    "gap analysis",
    "key performance indicator (KPI)",
    "return on investment (ROI)",
    "SWOT analysis",
    "scope",
];

pub fn is_business_analysis(topic: &str) -> bool {
    topic.trim().eq_ignore_ascii_case(BUSINESS_ANALYSIS_TOPIC)
}

fn difficulty_guidance(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Beginner => {
            "Keep the scene simple: a few clearly visible people or objects and everyday actions."
        }
        Difficulty::Intermediate => {
            "Include several interacting people or objects, a clear setting, and some secondary details."
        }
        Difficulty::Advanced => {
            "Make the scene rich and layered: many simultaneous actions, subtle details, mood and atmosphere."
        }
    }
}

fn business_analysis_rubric() -> String {
    format!(
        "The scene must take place in a professional business setting (for example a workshop, \
         a requirements meeting or a whiteboard session) and should give the learner natural \
         opportunities to use these business analysis terms: {}.",
        BUSINESS_ANALYSIS_TERMS.join(", ")
    )
}

/// Prompt asking for a vivid, visual scene description.
pub fn scene_description_prompt(topic: &str, difficulty: Difficulty) -> String {
    let mut prompt = format!(
        "Write a vivid visual description of a single scene about \"{}\" for an English learner \
         at {} level. {} Describe only what can be seen, in one paragraph of at most 80 words, \
         suitable as a prompt for an image or video generator. Return only the description.",
        topic.trim(),
        difficulty,
        difficulty_guidance(difficulty)
    );

    if is_business_analysis(topic) {
        prompt.push(' ');
        prompt.push_str(&business_analysis_rubric());
    }
    prompt
}

/// Prompt asking for a structured evaluation of the learner's description.
pub fn evaluation_prompt(scene_description: &str, user_text: &str, difficulty: Difficulty, topic: &str) -> String {
    let mut prompt = format!(
        "You are an English tutor. The learner ({} level) looked at a scene and described it.\n\n\
         Scene (reference description): {}\n\n\
         Learner's description: {}\n\n\
         Evaluate the learner's description for accuracy against the scene, grammar, vocabulary \
         range and fluency, judged for a {} learner. Give a score from 0 to 100. List each \
         mistake as the original fragment, the corrected fragment and a short explanation. \
         Suggest at least 5 vocabulary words or phrases that would improve the description. \
         Write an encouraging overall comment. Finally write a polished model description of \
         the scene of 150 to 300 words.",
        difficulty, scene_description.trim(), user_text.trim(), difficulty
    );

    if is_business_analysis(topic) {
        prompt.push_str(&format!(
            "\n\nAlso check whether the learner used business analysis terminology correctly \
             ({}), and prefer those terms in the vocabulary suggestions.",
            BUSINESS_ANALYSIS_TERMS.join(", ")
        ));
    }
    prompt
}

/// Scene description to hand to media generation: the generated text, or the
/// fallback when that text is empty.
pub fn description_or_fallback(generated: &str) -> String {
    let trimmed = generated.trim();
    if trimmed.is_empty() {
        FALLBACK_DESCRIPTION.to_string()
    } else {
        trimmed.to_string()
    }
}
