use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

/// How a site numbers its result pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `param=1, 2, 3…`
    PageNumber { param: &'static str },
    /// `param=0, step, 2*step…`
    Offset { param: &'static str, step: u32 },
}

/// Search URL template and CSS selectors for one job site.
#[derive(Debug, Clone, Copy)]
pub struct SiteSelectors {
    pub search_url: &'static str,
    pub keywords_param: &'static str,
    pub location_param: &'static str,
    pub pagination: Pagination,
    pub job_links: &'static str,
    pub title: &'static str,
    pub company: &'static str,
    pub location: &'static str,
    pub salary: &'static str,
    pub description: &'static str,
}

const SEEK: SiteSelectors = SiteSelectors {
    search_url: "https://www.seek.com.au/jobs",
    keywords_param: "keywords",
    location_param: "where",
    pagination: Pagination::PageNumber { param: "page" },
    job_links: "a[data-automation='jobTitle']",
    title: "h1[data-automation='job-detail-title']",
    company: "span[data-automation='advertiser-name'], span[data-automation='job-detail-company']",
    location: "span[data-automation='job-detail-location']",
    salary: "span[data-automation='job-detail-salary']",
    description: "div[data-automation='jobAdDetails'], div[data-automation='jobDescription']",
};

const INDEED: SiteSelectors = SiteSelectors {
    search_url: "https://au.indeed.com/jobs",
    keywords_param: "q",
    location_param: "l",
    pagination: Pagination::Offset {
        param: "start",
        step: 10,
    },
    job_links: "a.jcs-JobTitle",
    title: "h1.jobsearch-JobInfoHeader-title",
    company: "div[data-company-name='true'], div.jobsearch-InlineCompanyRating > div:first-child",
    location: "div[data-testid='inlineHeader-companyLocation'], div.jobsearch-JobInfoHeader-subtitle > div:nth-child(2)",
    salary: "#salaryInfoAndJobType",
    description: "div#jobDescriptionText",
};

const LINKEDIN: SiteSelectors = SiteSelectors {
    search_url: "https://www.linkedin.com/jobs/search/",
    keywords_param: "keywords",
    location_param: "location",
    pagination: Pagination::Offset {
        param: "start",
        step: 25,
    },
    job_links: "a.base-card__full-link",
    title: "h1.top-card-layout__title",
    company: "a.topcard__org-name-link",
    location: "span.topcard__flavor--bullet",
    salary: "div.salary",
    description: "div.description__text",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Seek,
    Indeed,
    LinkedIn,
}

impl Site {
    pub const ALL: [Site; 3] = [Site::Seek, Site::Indeed, Site::LinkedIn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Site::Seek => "seek",
            Site::Indeed => "indeed",
            Site::LinkedIn => "linkedin",
        }
    }

    pub fn selectors(&self) -> &'static SiteSelectors {
        match self {
            Site::Seek => &SEEK,
            Site::Indeed => &INDEED,
            Site::LinkedIn => &LINKEDIN,
        }
    }

    /// Search results URL for a 1-based `page`.
    pub fn search_url(
        &self,
        keywords: &str,
        location: &str,
        page: u32,
    ) -> Result<Url, url::ParseError> {
        let selectors = self.selectors();
        let page = page.max(1);
        let (param, value) = match selectors.pagination {
            Pagination::PageNumber { param } => (param, page),
            Pagination::Offset { param, step } => (param, (page - 1) * step),
        };

        Url::parse_with_params(
            selectors.search_url,
            &[
                (selectors.keywords_param, keywords.to_string()),
                (selectors.location_param, location.to_string()),
                (param, value.to_string()),
            ],
        )
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "seek" => Ok(Site::Seek),
            "indeed" => Ok(Site::Indeed),
            "linkedin" => Ok(Site::LinkedIn),
            other => Err(format!("unknown job site '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_seek_pages_are_one_based() {
        let url = Site::Seek.search_url("rust developer", "Sydney", 1).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.seek.com.au/jobs?keywords=rust+developer&where=Sydney&page=1"
        );
    }

    #[test]
    fn test_indeed_and_linkedin_use_offsets() {
        let indeed = Site::Indeed.search_url("qa", "Perth", 3).unwrap();
        assert!(indeed.as_str().ends_with("q=qa&l=Perth&start=20"), "{indeed}");

        let linkedin = Site::LinkedIn.search_url("qa", "Perth", 2).unwrap();
        assert!(linkedin.as_str().ends_with("start=25"), "{linkedin}");

        let first = Site::LinkedIn.search_url("qa", "Perth", 0).unwrap();
        assert!(first.as_str().ends_with("start=0"), "{first}");
    }

    #[test]
    fn test_site_names_round_trip_through_strings() {
        for site in Site::ALL {
            assert_eq!(site.as_str().parse::<Site>().unwrap(), site);
        }
        assert_eq!(" LinkedIn ".parse::<Site>().unwrap(), Site::LinkedIn);
        assert!("monster".parse::<Site>().is_err());
    }

    #[test]
    fn test_every_selector_compiles() {
        for site in Site::ALL {
            let s = site.selectors();
            for css in [s.job_links, s.title, s.company, s.location, s.salary, s.description] {
                assert!(Selector::parse(css).is_ok(), "{site}: {css}");
            }
        }
    }
}
