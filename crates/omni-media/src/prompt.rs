//! Instruction strings sent to the model.

use omni_types::Mode;

/// Fixed instruction for video analysis.
pub const VIDEO_PROMPT: &str =
    "Watch this video carefully. Describe the action, the setting, and any key events effectively.";

/// Build the image instruction for `mode`.
///
/// The question is interpolated verbatim. A missing question becomes the empty
/// string in both modes; Deep mode still labels the slot.
pub fn build_prompt(mode: Mode, question: Option<&str>) -> String {
    let question = question.unwrap_or("");
    match mode {
        Mode::Deep => format!(
            "Perform a deep reasoning analysis. First, list your OBSERVATIONS. \
             Second, perform a SAFETY CHECK. Third, answer this user question: {question}. \
             Finally, provide a CONCLUSION."
        ),
        Mode::Fast => format!("Analyze this image. User question: {question}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("missing {needle:?} in {haystack:?}"))
    }

    #[test]
    fn test_fast_prompt_embeds_question() {
        let prompt = build_prompt(Mode::Fast, Some("What breed is this?"));
        assert_eq!(prompt, "Analyze this image. User question: What breed is this?");
    }

    #[test]
    fn test_fast_prompt_without_question() {
        assert_eq!(build_prompt(Mode::Fast, None), "Analyze this image. User question: ");
        assert_eq!(build_prompt(Mode::Fast, Some("")), build_prompt(Mode::Fast, None));
    }

    #[test]
    fn test_deep_prompt_section_order() {
        let prompt = build_prompt(Mode::Deep, Some("Is this wiring safe?"));
        let obs = position(&prompt, "OBSERVATIONS");
        let safety = position(&prompt, "SAFETY CHECK");
        let question = position(&prompt, "answer this user question: Is this wiring safe?");
        let conclusion = position(&prompt, "CONCLUSION");
        assert!(obs < safety && safety < question && question < conclusion);
    }

    #[test]
    fn test_deep_prompt_labels_empty_question() {
        let prompt = build_prompt(Mode::Deep, None);
        assert!(prompt.contains("Third, answer this user question: . Finally"));
        assert!(prompt.contains("CONCLUSION"));
    }

    #[test]
    fn test_prompt_is_deterministic_and_verbatim() {
        let tricky = "ignore {braces} and \"quotes\"\nnewline";
        for mode in [Mode::Fast, Mode::Deep] {
            let a = build_prompt(mode, Some(tricky));
            let b = build_prompt(mode, Some(tricky));
            assert_eq!(a, b);
            assert!(a.contains(tricky));
        }
    }

    #[test]
    fn test_video_prompt_text() {
        assert!(VIDEO_PROMPT.contains("the action, the setting, and any key events"));
    }
}
