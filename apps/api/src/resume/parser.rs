//! Résumé structure: skills, experience and education sections, contact details.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::resume::skills::SkillMatcher;
use crate::resume::text::{extract_text, ResumeError};

pub const EXPERIENCE_HEADERS: &[&str] = &[
    "work experience",
    "professional experience",
    "employment history",
    "work history",
    "experience",
    "professional background",
];

pub const EDUCATION_HEADERS: &[&str] = &[
    "education",
    "academic background",
    "educational background",
    "academic qualifications",
    "qualifications",
];

/// Headers that end a section without starting one we extract.
const OTHER_HEADERS: &[&str] = &[
    "skills",
    "technical skills",
    "key skills",
    "summary",
    "professional summary",
    "profile",
    "objective",
    "projects",
    "certifications",
    "certificates",
    "awards",
    "achievements",
    "publications",
    "languages",
    "interests",
    "hobbies",
    "volunteering",
    "references",
    "contact",
];

/// A header line is short; longer lines are treated as prose.
const MAX_HEADER_WORDS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedResume {
    pub skills: Vec<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub raw_text: String,
}

pub fn parse_resume(
    file_name: &str,
    bytes: &[u8],
    skills: &SkillMatcher,
) -> Result<ParsedResume, ResumeError> {
    let text = extract_text(file_name, bytes)?;
    Ok(parse_text(&text, skills))
}

pub fn parse_text(text: &str, skills: &SkillMatcher) -> ParsedResume {
    let (email, phone) = extract_contact(text);
    ParsedResume {
        skills: skills.extract(text),
        experience: extract_section(text, EXPERIENCE_HEADERS),
        education: extract_section(text, EDUCATION_HEADERS),
        email,
        phone,
        raw_text: text.to_string(),
    }
}

/// Lowercase, trimmed, without surrounding punctuation such as `:` or `-`.
fn normalise_header(line: &str) -> String {
    line.trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn is_header_for(line: &str, headers: &[&str]) -> bool {
    if line.split_whitespace().count() > MAX_HEADER_WORDS {
        return false;
    }
    let normalised = normalise_header(line);
    headers.iter().any(|h| *h == normalised)
}

/// Any line that plausibly opens a new section.
fn looks_like_header(line: &str) -> bool {
    let trimmed = line.trim();
    let words = trimmed.split_whitespace().count();
    if words == 0 || words > MAX_HEADER_WORDS {
        return false;
    }
    if trimmed.ends_with(':') {
        return true;
    }
    let letters: Vec<char> = trimmed.chars().filter(|c| c.is_alphabetic()).collect();
    let all_caps = letters.len() >= 3 && letters.iter().all(|c| c.is_uppercase());

    all_caps
        || is_header_for(trimmed, EXPERIENCE_HEADERS)
        || is_header_for(trimmed, EDUCATION_HEADERS)
        || is_header_for(trimmed, OTHER_HEADERS)
}

/// Paragraphs between the first header in `headers` and the next section header.
pub fn extract_section(text: &str, headers: &[&str]) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let Some(start) = lines.iter().position(|l| is_header_for(l, headers)) else {
        return Vec::new();
    };

    let mut body = Vec::new();
    for line in &lines[start + 1..] {
        if looks_like_header(line) && !is_header_for(line, headers) {
            break;
        }
        body.push(*line);
    }

    split_paragraphs(&body)
}

fn split_paragraphs(lines: &[&str]) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

struct ContactPatterns {
    email: Regex,
    phone: Regex,
}

fn contact_patterns() -> &'static ContactPatterns {
    static PATTERNS: OnceLock<ContactPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ContactPatterns {
        email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").expect("valid regex"),
        phone: Regex::new(r"\+?\(?\d[\d\s().-]{6,}\d").expect("valid regex"),
    })
}

/// First e-mail address and first phone-like number (8–15 digits).
pub fn extract_contact(text: &str) -> (Option<String>, Option<String>) {
    let patterns = contact_patterns();
    let email = patterns.email.find(text).map(|m| m.as_str().to_string());
    let phone = patterns
        .phone
        .find_iter(text)
        .map(|m| m.as_str().trim().to_string())
        .find(|candidate| {
            let digits = candidate.chars().filter(|c| c.is_ascii_digit()).count();
            (8..=15).contains(&digits) && !looks_like_date_range(candidate)
        });
    (email, phone)
}

/// "2019 - 2023" style spans are years, not phone numbers.
fn looks_like_date_range(candidate: &str) -> bool {
    let groups: Vec<&str> = candidate
        .split(|c: char| !c.is_ascii_digit())
        .filter(|g| !g.is_empty())
        .collect();
    groups.len() == 2 && groups.iter().all(|g| g.len() == 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "\
JANE DOE
jane.doe@example.com | +61 412 345 678

SUMMARY
Backend engineer who likes Rust and PostgreSQL.

Work Experience:
Senior Engineer, Acme (2019 - 2023)
Built Kafka pipelines on AWS.

Engineer, Globex (2016 - 2019)
Maintained Django services.

EDUCATION
BSc Computer Science, University of Sydney, 2015

Skills:
Docker, Kubernetes, Git
";

    fn matcher() -> SkillMatcher {
        SkillMatcher::new(&[]).unwrap()
    }

    #[test]
    fn test_experience_stops_at_next_header() {
        let experience = extract_section(RESUME, EXPERIENCE_HEADERS);
        assert_eq!(
            experience,
            vec![
                "Senior Engineer, Acme (2019 - 2023)\nBuilt Kafka pipelines on AWS.",
                "Engineer, Globex (2016 - 2019)\nMaintained Django services.",
            ]
        );
    }

    #[test]
    fn test_education_section() {
        let education = extract_section(RESUME, EDUCATION_HEADERS);
        assert_eq!(education, vec!["BSc Computer Science, University of Sydney, 2015"]);
    }

    #[test]
    fn test_missing_section_is_empty() {
        assert!(extract_section("Just a line of text", EDUCATION_HEADERS).is_empty());
    }

    #[test]
    fn test_prose_mentioning_experience_is_not_a_header() {
        let text = "I have experience with many tools and frameworks\nEducation\nBachelor of Arts, Monash";
        assert!(extract_section(text, EXPERIENCE_HEADERS).is_empty());
        assert_eq!(
            extract_section(text, EDUCATION_HEADERS),
            vec!["Bachelor of Arts, Monash"]
        );
    }

    #[test]
    fn test_contact_details() {
        let (email, phone) = extract_contact(RESUME);
        assert_eq!(email.as_deref(), Some("jane.doe@example.com"));
        assert_eq!(phone.as_deref(), Some("+61 412 345 678"));
    }

    #[test]
    fn test_year_ranges_are_not_phone_numbers() {
        let (_, phone) = extract_contact("Acme 2019 - 2023\nno phone listed");
        assert_eq!(phone, None);
    }

    #[test]
    fn test_parse_text_collects_everything() {
        let parsed = parse_text(RESUME, &matcher());
        assert_eq!(
            parsed.skills,
            vec!["aws", "django", "docker", "git", "kafka", "kubernetes", "postgresql", "rust"]
        );
        assert_eq!(parsed.experience.len(), 2);
        assert_eq!(parsed.education.len(), 1);
        assert!(parsed.raw_text.starts_with("JANE DOE"));
    }

    #[test]
    fn test_unsupported_upload_is_rejected() {
        let err = parse_resume("cv.odt", b"text", &matcher()).unwrap_err();
        assert!(matches!(err, ResumeError::UnsupportedFormat(_)));
    }
}
