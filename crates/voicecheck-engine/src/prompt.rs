//! Instruction text for the comparison call. Everything here is a pure
//! function of its inputs; the model sees File A (reference) and File B
//! (candidate) in that order, matching the part order built in `gemini`.

/// The fixed evaluation contract. File A is trusted ground truth and is never
/// critiqued; File B is judged solely on fidelity to A.
pub fn system_instruction() -> &'static str {
    "You are a ruthless voice-cloning quality auditor.\n\
     File A is the trusted reference recording. It is ground truth and is never \
     critiqued, regardless of its own quality.\n\
     File B is a text-to-speech candidate. Evaluate it solely on how faithfully \
     it reproduces File A's voice and delivery.\n\
     Apply an automatic penalty for each of the following, whenever present in \
     File B:\n\
     - stress or emphasis placed on different words than File A\n\
     - artificial micro-pauses or choppy joins that File A does not have\n\
     - drift in timbre or apparent age of the speaker\n\
     - tempo noticeably faster or slower than File A\n\
     Never excuse a deviation because it sounds pleasant in isolation; fidelity \
     to File A is the only criterion."
}

/// Per-request instruction embedding the character description and, when the
/// caller has one, the script the reference was read from.
pub fn user_instruction(character_description: &str, reference_script: Option<&str>) -> String {
    let mut instruction = String::from(
        "Compare the two attached audio files. File A is the reference; File B is \
         the candidate.\n",
    );
    if !character_description.trim().is_empty() {
        instruction.push_str("Character being voiced: ");
        instruction.push_str(character_description.trim());
        instruction.push('\n');
    }
    if let Some(script) = reference_script.map(str::trim).filter(|s| !s.is_empty()) {
        instruction.push_str("Script the reference reads: \"");
        instruction.push_str(script);
        instruction.push_str("\"\n");
    }
    instruction.push_str(
        "Proceed in four steps:\n\
         1. Establish File A's baseline qualities: intonation contours, pacing, \
         timbre, apparent age, emotional register.\n\
         2. Evaluate File B against that baseline, dimension by dimension.\n\
         3. Enumerate every specific deviation you can hear, however small.\n\
         4. Respond with a single JSON object matching exactly this shape and \
         nothing else — no markdown, no commentary:\n\
         {\"similarityScore\": <integer 0-100>, \"qualityGrade\": <\"S\"|\"A\"|\"B\"|\"C\"|\"F\">, \
         \"verdictSummary\": <string>, \"comparisonPoints\": {\"intonationMatch\": <string>, \
         \"pacingMatch\": <string>, \"timbreMatch\": <string>}, \"flaws\": [<string>, ...], \
         \"isImprovement\": <boolean>}",
    );
    instruction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_instruction_states_the_contract_and_penalties() {
        let text = system_instruction();
        assert!(text.contains("File A is the trusted reference"));
        assert!(text.contains("never critiqued"));
        assert!(text.contains("micro-pauses"));
        assert!(text.contains("timbre or apparent age"));
        assert!(text.contains("tempo"));
    }

    #[test]
    fn user_instruction_embeds_description_and_script() {
        let text = user_instruction("weary night-shift dispatcher", Some("All units respond."));
        assert!(text.contains("Character being voiced: weary night-shift dispatcher"));
        assert!(text.contains("Script the reference reads: \"All units respond.\""));
        assert!(text.contains("\"similarityScore\""));
    }

    #[test]
    fn blank_context_fields_are_omitted() {
        let text = user_instruction("  ", None);
        assert!(!text.contains("Character being voiced"));
        assert!(!text.contains("Script the reference reads"));
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let a = user_instruction("pirate", Some("Yarr."));
        let b = user_instruction("pirate", Some("Yarr."));
        assert_eq!(a, b);
    }
}
