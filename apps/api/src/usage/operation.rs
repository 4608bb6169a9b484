//! Billable AI operations and their typed inputs.
//!
//! Every request is validated against its operation's schema before it is
//! fingerprinted, so the cache key only ever covers well-formed input.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// Category of AI operation. Part of the hashed fingerprint material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    ResumeCheck,
    ResumeBuild,
    CoverLetter,
    JobAnalysis,
    CompanyResearch,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::ResumeCheck => "resume_check",
            OperationType::ResumeBuild => "resume_build",
            OperationType::CoverLetter => "cover_letter",
            OperationType::JobAnalysis => "job_analysis",
            OperationType::CompanyResearch => "company_research",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeCheckInput {
    /// Resume body to review.
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeBuildInput {
    pub full_name: String,
    pub target_role: String,
    #[serde(default)]
    pub experience: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetterInput {
    pub resume_text: String,
    pub job_title: String,
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysisInput {
    pub job_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyResearchInput {
    pub company_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
}

/// Tagged union of operation inputs.
///
/// Wire shape: `{"operation_type": "resume_check", "input_data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation_type", content = "input_data", rename_all = "snake_case")]
pub enum OperationInput {
    ResumeCheck(ResumeCheckInput),
    ResumeBuild(ResumeBuildInput),
    CoverLetter(CoverLetterInput),
    JobAnalysis(JobAnalysisInput),
    CompanyResearch(CompanyResearchInput),
}

impl OperationInput {
    pub fn operation_type(&self) -> OperationType {
        match self {
            OperationInput::ResumeCheck(_) => OperationType::ResumeCheck,
            OperationInput::ResumeBuild(_) => OperationType::ResumeBuild,
            OperationInput::CoverLetter(_) => OperationType::CoverLetter,
            OperationInput::JobAnalysis(_) => OperationType::JobAnalysis,
            OperationInput::CompanyResearch(_) => OperationType::CompanyResearch,
        }
    }

    /// The operation-specific payload as plain JSON, without the tag.
    pub fn input_data(&self) -> Value {
        let data = match self {
            OperationInput::ResumeCheck(i) => serde_json::to_value(i),
            OperationInput::ResumeBuild(i) => serde_json::to_value(i),
            OperationInput::CoverLetter(i) => serde_json::to_value(i),
            OperationInput::JobAnalysis(i) => serde_json::to_value(i),
            OperationInput::CompanyResearch(i) => serde_json::to_value(i),
        };
        // Plain structs of strings and string lists always serialize.
        data.unwrap_or(Value::Null)
    }

    /// Rejects inputs whose required text fields are blank.
    pub fn validate(&self) -> Result<(), AppError> {
        match self {
            OperationInput::ResumeCheck(i) => require("text", &i.text),
            OperationInput::ResumeBuild(i) => {
                require("full_name", &i.full_name)?;
                require("target_role", &i.target_role)
            }
            OperationInput::CoverLetter(i) => {
                require("resume_text", &i.resume_text)?;
                require("job_title", &i.job_title)?;
                require("company_name", &i.company_name)
            }
            OperationInput::JobAnalysis(i) => require("job_description", &i.job_description),
            OperationInput::CompanyResearch(i) => require("company_name", &i.company_name),
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}
