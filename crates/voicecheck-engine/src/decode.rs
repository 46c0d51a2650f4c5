use serde_json::Value;
use voicecheck_contracts::analysis::AnalysisResult;
use voicecheck_contracts::error::{CompareError, Result};

/// Pulls the model's first text part out of a successful envelope and parses
/// it as the analysis schema. Anything short of a full, in-range result is a
/// decode failure; retrying would just replay the same malformed reply, so
/// none is attempted and no partial result is surfaced.
pub fn decode_analysis(envelope: &Value) -> Result<AnalysisResult> {
    let text = first_text_part(envelope)
        .ok_or_else(|| CompareError::Decode("response contained no text part".to_string()))?;
    let result: AnalysisResult = serde_json::from_str(text.trim()).map_err(|err| {
        CompareError::Decode(format!("analysis JSON did not match the expected shape: {err}"))
    })?;
    result.validate().map_err(CompareError::Decode)?;
    Ok(result)
}

fn first_text_part(envelope: &Value) -> Option<&str> {
    envelope
        .get("candidates")
        .and_then(Value::as_array)?
        .first()?
        .get("content")?
        .get("parts")
        .and_then(Value::as_array)?
        .iter()
        .find_map(|part| part.get("text").and_then(Value::as_str))
}
