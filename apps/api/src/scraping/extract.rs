//! Turns fetched HTML into listing fields using each site's CSS selectors.
//!
//! `scraper::Html` is not `Send`, so everything here is synchronous and returns owned
//! values; callers parse between awaits.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

use crate::scraping::sites::Site;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid selector '{css}': {message}")]
    Selector { css: &'static str, message: String },
}

/// Fields read from one job detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedJob {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: Option<String>,
    pub description: String,
    pub url: String,
    pub source: Site,
}

fn compile(css: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|e| ExtractError::Selector {
        css,
        message: format!("{e:?}"),
    })
}

/// Job detail links on a search results page, resolved against `page_url`.
/// Only http(s) links survive; duplicates keep their first position.
pub fn extract_job_links(
    html: &str,
    site: Site,
    page_url: &Url,
) -> Result<Vec<String>, ExtractError> {
    let selector = compile(site.selectors().job_links)?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let links = document
        .select(&selector)
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| page_url.join(href.trim()).ok())
        .filter(is_valid_job_url)
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|url| seen.insert(url.clone()))
        .collect();

    Ok(links)
}

pub fn is_valid_job_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
}

/// Reads a detail page. `Ok(None)` means the page has no title and should be skipped.
pub fn extract_job_detail(
    html: &str,
    site: Site,
    url: &str,
) -> Result<Option<ScrapedJob>, ExtractError> {
    let selectors = site.selectors();
    let title_sel = compile(selectors.title)?;
    let company_sel = compile(selectors.company)?;
    let location_sel = compile(selectors.location)?;
    let salary_sel = compile(selectors.salary)?;
    let description_sel = compile(selectors.description)?;

    let document = Html::parse_document(html);

    let Some(title) = first_inline_text(&document, &title_sel) else {
        return Ok(None);
    };

    let description = document
        .select(&description_sel)
        .next()
        .map(block_text)
        .unwrap_or_default();

    let salary =
        first_inline_text(&document, &salary_sel).or_else(|| extract_salary(&description));

    Ok(Some(ScrapedJob {
        title,
        company: first_inline_text(&document, &company_sel).unwrap_or_default(),
        location: first_inline_text(&document, &location_sel).unwrap_or_default(),
        salary,
        description,
        url: url.to_string(),
        source: site,
    }))
}

/// Whitespace-collapsed text of the first matching element, if any is non-empty.
fn first_inline_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|text| !text.is_empty())
}

/// Text nodes of a block element, one per line.
fn block_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(|chunk| chunk.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn salary_pattern() -> &'static Regex {
    static SALARY: OnceLock<Regex> = OnceLock::new();
    SALARY.get_or_init(|| {
        Regex::new(
            r"\$\s?\d[\d,]*(?:\.\d+)?[kK]?(?:\s*(?:-|–|to)\s*\$?\s?\d[\d,]*(?:\.\d+)?[kK]?)?",
        )
        .expect("valid regex")
    })
}

/// First dollar amount or range mentioned in free text.
pub fn extract_salary(text: &str) -> Option<String> {
    salary_pattern()
        .find(text)
        .map(|m| m.as_str().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEEK_RESULTS: &str = r#"
        <html><body>
          <article><a data-automation="jobTitle" href="/job/111?type=standard">Rust Engineer</a></article>
          <article><a data-automation="jobTitle" href="/job/222#apply">Backend Dev</a></article>
          <article><a data-automation="jobTitle" href="/job/111?type=standard">Rust Engineer</a></article>
          <article><a data-automation="jobTitle" href="mailto:jobs@example.com">Email us</a></article>
          <a href="/job/333">Unrelated link</a>
        </body></html>
    "#;

    const SEEK_DETAIL: &str = r#"
        <html><body>
          <h1 data-automation="job-detail-title">  Senior   Rust Engineer </h1>
          <span data-automation="advertiser-name">Acme Pty Ltd</span>
          <span data-automation="job-detail-location">Sydney NSW</span>
          <span data-automation="job-detail-salary">$150,000 - $170,000</span>
          <div data-automation="jobAdDetails">
            <p>We build   payment systems.</p>
            <ul><li>Rust and PostgreSQL</li><li>Docker, Kubernetes</li></ul>
          </div>
        </body></html>
    "#;

    #[test]
    fn test_links_are_absolute_deduped_and_ordered() {
        let page = Url::parse("https://www.seek.com.au/jobs?keywords=rust").unwrap();
        let links = extract_job_links(SEEK_RESULTS, Site::Seek, &page).unwrap();
        assert_eq!(
            links,
            vec![
                "https://www.seek.com.au/job/111?type=standard".to_string(),
                "https://www.seek.com.au/job/222".to_string(),
            ]
        );
    }

    #[test]
    fn test_detail_fields_are_extracted() {
        let job = extract_job_detail(SEEK_DETAIL, Site::Seek, "https://www.seek.com.au/job/111")
            .unwrap()
            .expect("page has a title");

        assert_eq!(job.title, "Senior Rust Engineer");
        assert_eq!(job.company, "Acme Pty Ltd");
        assert_eq!(job.location, "Sydney NSW");
        assert_eq!(job.salary.as_deref(), Some("$150,000 - $170,000"));
        assert_eq!(
            job.description,
            "We build payment systems.\nRust and PostgreSQL\nDocker, Kubernetes"
        );
        assert_eq!(job.source, Site::Seek);
    }

    #[test]
    fn test_page_without_title_is_skipped() {
        let html = r#"<html><body><div id="jobDescriptionText">text</div></body></html>"#;
        let job = extract_job_detail(html, Site::Indeed, "https://au.indeed.com/viewjob?jk=1");
        assert!(job.unwrap().is_none());
    }

    #[test]
    fn test_missing_salary_element_falls_back_to_description() {
        let html = r#"
            <h1 class="top-card-layout__title">Data Analyst</h1>
            <a class="topcard__org-name-link">Globex</a>
            <div class="description__text">Pay: $95k to $110k plus super. SQL required.</div>
        "#;
        let job = extract_job_detail(html, Site::LinkedIn, "https://www.linkedin.com/jobs/view/9")
            .unwrap()
            .unwrap();
        assert_eq!(job.salary.as_deref(), Some("$95k to $110k"));
        assert_eq!(job.location, "");
    }

    #[test]
    fn test_indeed_company_uses_nested_selector() {
        let html = r#"
            <h1 class="jobsearch-JobInfoHeader-title">QA Tester</h1>
            <div class="jobsearch-InlineCompanyRating"><div>Initech</div><div>3.9</div></div>
            <div class="jobsearch-JobInfoHeader-subtitle"><div>Initech</div><div>Perth WA</div></div>
            <div id="jobDescriptionText">Selenium and Python.</div>
        "#;
        let job = extract_job_detail(html, Site::Indeed, "https://au.indeed.com/viewjob?jk=2")
            .unwrap()
            .unwrap();
        assert_eq!(job.company, "Initech");
        assert_eq!(job.location, "Perth WA");
        assert_eq!(job.salary, None);
    }

    #[test]
    fn test_extract_salary_ignores_text_without_amounts() {
        assert_eq!(extract_salary("Competitive salary package"), None);
        assert_eq!(extract_salary("Up to $45.50 per hour").as_deref(), Some("$45.50"));
    }
}
