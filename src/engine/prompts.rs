//! Prompt templates for activation and extraction queries.
//!
//! Kept in one place so prompt drift shows up in one diff. The structured
//! `Skill:` / `Parameter:` lines double as stable anchors for scripted
//! gateways in tests.

use crate::skill::{ParamSpec, Skill};

/// Binary activation vote for one skill against one utterance. The skill's
/// vibe phrases ride along as few-shot guidance.
pub fn activation_prompt(utterance: &str, skill: &Skill) -> String {
    let mut prompt = String::new();
    prompt.push_str("You decide whether a skill applies to a user message.\n\n");
    prompt.push_str(&format!("Skill: {}\n", skill.name));
    prompt.push_str(&format!("When to use: {}\n", skill.description));

    if !skill.vibe_test_phrases.is_empty() {
        prompt.push_str("\nExamples of messages where this skill applies:\n");
        for phrase in &skill.vibe_test_phrases {
            prompt.push_str(&format!("- {}\n", phrase));
        }
    }

    prompt.push_str(&format!("\nUser message: {}\n\n", utterance));
    prompt.push_str(
        "Does this skill apply to the user message? \
         Respond with exactly one word: YES or NO.",
    );
    prompt
}

/// Ask for the literal value of one declared parameter.
pub fn extraction_prompt(utterance: &str, skill: &Skill, param: &ParamSpec) -> String {
    format!(
        "Extract a parameter value from a user message.\n\n\
         Skill: {}\n\
         Parameter: {}\n\
         Kind: {}\n\
         Meaning: {}\n\n\
         User message: {}\n\n\
         Respond with ONLY the literal value taken from the message, \
         no explanation, no quotes. If the message contains no value for \
         this parameter, respond with an empty line.",
        skill.name,
        param.name,
        param.kind.as_str(),
        param.description,
        utterance,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::{ParamKind, SkillRole};

    #[test]
    fn test_activation_prompt_carries_skill_context() {
        let skill = Skill::new(
            "getWeather",
            "Use for weather questions.",
            SkillRole::Information,
            "fn execute() { log(\"x\"); }",
        )
        .with_vibe_phrases(["Is it raining?"]);

        let prompt = activation_prompt("do I need an umbrella?", &skill);
        assert!(prompt.contains("Skill: getWeather"));
        assert!(prompt.contains("Use for weather questions."));
        assert!(prompt.contains("- Is it raining?"));
        assert!(prompt.contains("do I need an umbrella?"));
        assert!(prompt.contains("YES or NO"));
    }

    #[test]
    fn test_extraction_prompt_names_parameter() {
        let skill = Skill::new(
            "calculate",
            "Arithmetic.",
            SkillRole::Mathematics,
            "fn execute(e) { log(e); }",
        );
        let param = ParamSpec::required("expression", ParamKind::String, "the expression");
        let prompt = extraction_prompt("calculate 2 + 2", &skill, &param);
        assert!(prompt.contains("Parameter: expression"));
        assert!(prompt.contains("Kind: string"));
        assert!(prompt.contains("calculate 2 + 2"));
    }
}
