// Prompt constants for the gated AI operations.
// Templates use `{placeholder}` markers replaced before sending.

use crate::usage::operation::OperationInput;

/// System prompt shared by every operation — enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are an expert career coach and recruiter. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

pub const RESUME_CHECK_TEMPLATE: &str = r#"Review the resume below{role_clause}.

Return a JSON object with this schema:
{"score": 0-100, "strengths": ["..."], "improvements": ["..."], "summary": "..."}

RESUME:
{text}"#;

pub const RESUME_BUILD_TEMPLATE: &str = r#"Write a resume for {full_name} targeting the role "{target_role}".

Experience:
{experience}

Skills: {skills}

Return a JSON object with this schema:
{"summary": "...", "experience": [{"heading": "...", "bullets": ["..."]}], "skills": ["..."]}"#;

pub const COVER_LETTER_TEMPLATE: &str = r#"Write a cover letter for the {job_title} position at {company_name}. Tone: {tone}.

JOB DESCRIPTION:
{job_description}

CANDIDATE RESUME:
{resume_text}

Return a JSON object with this schema:
{"subject": "...", "body": "..."}"#;

pub const JOB_ANALYSIS_TEMPLATE: &str = r#"Analyze the job posting below{title_clause}.

Return a JSON object with this schema:
{"required_skills": ["..."], "nice_to_have": ["..."], "seniority": "...", "red_flags": ["..."], "salary_hint": "..."}

JOB POSTING:
{job_description}"#;

pub const COMPANY_RESEARCH_TEMPLATE: &str = r#"Summarize what a job seeker should know about {company_name}{industry_clause}.

Return a JSON object with this schema:
{"overview": "...", "culture": ["..."], "interview_tips": ["..."], "recent_news": ["..."]}"#;

/// Renders the user prompt for an operation.
pub fn build_prompt(input: &OperationInput) -> String {
    match input {
        OperationInput::ResumeCheck(i) => RESUME_CHECK_TEMPLATE
            .replace(
                "{role_clause}",
                &optional_clause(" for a ", i.target_role.as_deref(), " role"),
            )
            .replace("{text}", &i.text),
        OperationInput::ResumeBuild(i) => RESUME_BUILD_TEMPLATE
            .replace("{full_name}", &i.full_name)
            .replace("{target_role}", &i.target_role)
            .replace("{experience}", &bullet_list(&i.experience))
            .replace("{skills}", &i.skills.join(", ")),
        OperationInput::CoverLetter(i) => COVER_LETTER_TEMPLATE
            .replace("{job_title}", &i.job_title)
            .replace("{company_name}", &i.company_name)
            .replace("{tone}", i.tone.as_deref().unwrap_or("professional"))
            .replace(
                "{job_description}",
                i.job_description.as_deref().unwrap_or("(not provided)"),
            )
            .replace("{resume_text}", &i.resume_text),
        OperationInput::JobAnalysis(i) => JOB_ANALYSIS_TEMPLATE
            .replace(
                "{title_clause}",
                &optional_clause(" for the title \"", i.job_title.as_deref(), "\""),
            )
            .replace("{job_description}", &i.job_description),
        OperationInput::CompanyResearch(i) => COMPANY_RESEARCH_TEMPLATE
            .replace(
                "{industry_clause}",
                &optional_clause(" (", i.industry.as_deref(), " industry)"),
            )
            .replace("{company_name}", &i.company_name),
    }
}

fn optional_clause(prefix: &str, value: Option<&str>, suffix: &str) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => format!("{prefix}{v}{suffix}"),
        None => String::new(),
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "(none listed)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
