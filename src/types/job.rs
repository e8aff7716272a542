//! Job and candidate domain types
//!
//! Structured shapes exchanged with the analysis pipeline. Field names match
//! the JSON schemas sent to the model, so these types deserialize directly
//! from schema-constrained responses.

use serde::{Deserialize, Serialize};

/// Proficiency a job posting asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 4] = [
        Self::Beginner,
        Self::Intermediate,
        Self::Advanced,
        Self::Expert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillRequirement {
    pub name: String,
    #[serde(default)]
    pub level: ProficiencyLevel,
}

/// Structured metadata distilled from a raw job posting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistilledJob {
    pub company: String,
    pub title: String,
    pub location: Option<String>,
    pub deadline: Option<String>,
    pub salary_range: Option<String>,
    pub source: Option<String>,
    pub required_skills: Vec<SkillRequirement>,
    pub skills: Vec<String>,
    pub responsibilities: Vec<String>,
}

/// A reusable block of resume content (experience bullet group, project, etc.)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileBlock {
    pub id: String,
    pub kind: String,
    pub text: String,
}

/// One of the user's resume profiles that a posting is compared against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub blocks: Vec<ProfileBlock>,
}

/// Supporting evidence the user recorded for a skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEvidence {
    pub skill: String,
    pub evidence: String,
}

/// Stage 2 comparison result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitAnalysis {
    /// 0-100
    pub compatibility_score: u8,
    pub best_profile_id: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub resume_tailoring: String,
    #[serde(default)]
    pub cover_letter_tailoring: String,
    #[serde(default)]
    pub recommended_block_ids: Vec<String>,
}

/// Pipeline output: the distilled job, always, plus the fit when stage 2 ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub job: DistilledJob,
    pub cleaned_description: String,
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub fit: Option<FitAnalysis>,
}

impl JobAnalysis {
    /// Callers must check this before reading fit-specific fields
    pub fn compatibility_score(&self) -> Option<u8> {
        self.fit.as_ref().map(|f| f.compatibility_score)
    }

    pub fn best_profile_id(&self) -> Option<&str> {
        self.fit.as_ref().map(|f| f.best_profile_id.as_str())
    }
}
