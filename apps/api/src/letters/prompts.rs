// Prompt constants for cover-letter generation.

use crate::models::job::JobRow;
use crate::models::resume::ResumeRow;

pub const LETTER_SYSTEM: &str = "You are an expert cover letter writer who creates \
    personalized, professional cover letters.";

/// Replace: {job_title}, {company_name}, {location}, {description}, {resume_info}
pub const LETTER_PROMPT_TEMPLATE: &str = r#"Write a cover letter for the {job_title} position at {company_name} ({location}).

Resume Information:
{resume_info}

Job Description:
{description}

Create a professional, tailored cover letter that:
1. Highlights my relevant skills and experience for this specific job
2. Demonstrates an understanding of the company's needs
3. Shows enthusiasm for the role and company
4. Addresses any skill gaps with transferable skills or learning potential
5. Uses a professional but personable tone

Use standard business letter format. Be concise and specific; avoid statements that could
apply to any job. Limit the letter to roughly 350-400 words."#;

const DESCRIPTION_PROMPT_CHARS: usize = 4000;

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.trim().is_empty() {
        default
    } else {
        value
    }
}

pub fn format_resume_info(resume: Option<&ResumeRow>) -> String {
    let Some(resume) = resume else {
        return "No resume data provided.".to_string();
    };

    let mut out = String::new();
    if !resume.skills.0.is_empty() {
        out.push_str(&format!("Skills: {}\n\n", resume.skills.0.join(", ")));
    }
    if !resume.experience.0.is_empty() {
        out.push_str("Work Experience:\n");
        for entry in &resume.experience.0 {
            out.push_str(&format!("- {}\n", entry.replace('\n', " ")));
        }
        out.push('\n');
    }
    if !resume.education.0.is_empty() {
        out.push_str("Education:\n");
        for entry in &resume.education.0 {
            out.push_str(&format!("- {}\n", entry.replace('\n', " ")));
        }
    }

    if out.is_empty() {
        "No resume data provided.".to_string()
    } else {
        out.trim_end().to_string()
    }
}

pub fn build_letter_prompt(job: &JobRow, resume: Option<&ResumeRow>) -> String {
    let description: String = job.description.chars().take(DESCRIPTION_PROMPT_CHARS).collect();
    LETTER_PROMPT_TEMPLATE
        .replace("{job_title}", or_default(&job.title, "the position"))
        .replace("{company_name}", or_default(&job.company, "the company"))
        .replace("{location}", or_default(&job.location, "location not stated"))
        .replace("{resume_info}", &format_resume_info(resume))
        .replace("{description}", or_default(&description, "No description provided"))
}
