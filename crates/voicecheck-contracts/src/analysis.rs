use serde::{Deserialize, Serialize};

/// Letter grade the model assigns the candidate take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityGrade {
    S,
    A,
    B,
    C,
    F,
}

/// Per-dimension commentary comparing the candidate to the reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonPoints {
    pub intonation_match: String,
    pub pacing_match: String,
    pub timbre_match: String,
}

/// The structured verdict the model returns, exactly as it appears on the
/// wire (camelCase keys). Owned by the caller for display; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub similarity_score: u8,
    pub quality_grade: QualityGrade,
    pub verdict_summary: String,
    pub comparison_points: ComparisonPoints,
    #[serde(default)]
    pub flaws: Vec<String>,
    pub is_improvement: bool,
}

impl AnalysisResult {
    /// Rejects values the model should not produce but occasionally does.
    /// The grade enum is already enforced by deserialization; the score range
    /// is not, so it is checked here before the result reaches a caller.
    pub fn validate(&self) -> Result<(), String> {
        if self.similarity_score > 100 {
            return Err(format!(
                "similarityScore {} outside 0-100",
                self.similarity_score
            ));
        }
        Ok(())
    }
}
