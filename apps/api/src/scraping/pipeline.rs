//! A scrape run: search pages → detail links → listings → database.
//!
//! Every page and listing is fetched independently; failures are logged and skipped so
//! one broken page never sinks the run.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};
use url::Url;

use crate::errors::AppError;
use crate::jobs::repository::upsert_jobs_batch;
use crate::models::job::NewJob;
use crate::models::scrape_run::ScrapeRunRow;
use crate::scraping::deadline::extract_deadline;
use crate::scraping::extract::{extract_job_detail, extract_job_links, ScrapedJob};
use crate::scraping::fetcher::Fetcher;
use crate::scraping::runs;
use crate::scraping::sites::Site;

#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub sites: Vec<Site>,
    pub search_terms: Vec<String>,
    pub location: String,
    pub pages_per_site: u32,
    pub max_jobs: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScrapeSummary {
    pub pages_found: usize,
    pub jobs_found: usize,
    pub jobs_new: u64,
}

/// Every search results page the request covers, in site → term → page order.
pub fn search_pages(request: &ScrapeRequest) -> Vec<(Site, Url)> {
    let mut pages = Vec::new();
    for site in &request.sites {
        for term in &request.search_terms {
            for page in 1..=request.pages_per_site.max(1) {
                match site.search_url(term, &request.location, page) {
                    Ok(url) => pages.push((*site, url)),
                    Err(e) => warn!("Skipping {site} search for '{term}': {e}"),
                }
            }
        }
    }
    pages
}

/// Fetches search pages and gathers detail links, de-duplicated across pages and capped
/// at `max_jobs`. Also returns how many search pages loaded.
pub async fn collect_job_links(
    fetcher: &Fetcher,
    pages: Vec<(Site, Url)>,
    max_jobs: usize,
) -> (Vec<(Site, String)>, usize) {
    let concurrency = fetcher.policy().max_concurrent;
    let results: Vec<_> = stream::iter(pages)
        .map(|(site, url)| async move {
            let body = fetcher.get_text(&url).await;
            (site, url, body)
        })
        .buffered(concurrency)
        .collect()
        .await;

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    let mut pages_found = 0;

    for (site, url, body) in results {
        let html = match body {
            Ok(html) => html,
            Err(e) => {
                warn!("Search page {url} failed: {e}");
                continue;
            }
        };
        pages_found += 1;

        match extract_job_links(&html, site, &url) {
            Ok(found) => {
                info!("{site}: {} job links on {url}", found.len());
                for link in found {
                    if seen.insert(link.clone()) {
                        links.push((site, link));
                    }
                }
            }
            Err(e) => warn!("Could not read links from {url}: {e}"),
        }
    }

    links.truncate(max_jobs);
    (links, pages_found)
}

/// Fetches and parses detail pages concurrently. Listings without a title are dropped.
pub async fn fetch_listings(
    fetcher: &Fetcher,
    links: Vec<(Site, String)>,
    today: NaiveDate,
) -> Vec<NewJob> {
    let concurrency = fetcher.policy().max_concurrent;
    stream::iter(links)
        .map(|(site, link)| async move { fetch_listing(fetcher, site, &link, today).await })
        .buffered(concurrency)
        .filter_map(|job| async move { job })
        .collect()
        .await
}

async fn fetch_listing(
    fetcher: &Fetcher,
    site: Site,
    link: &str,
    today: NaiveDate,
) -> Option<NewJob> {
    let url = match Url::parse(link) {
        Ok(url) => url,
        Err(e) => {
            warn!("Skipping malformed link {link}: {e}");
            return None;
        }
    };

    let html = match fetcher.get_text(&url).await {
        Ok(html) => html,
        Err(e) => {
            warn!("Listing {link} failed: {e}");
            return None;
        }
    };

    match extract_job_detail(&html, site, link) {
        Ok(Some(scraped)) => Some(into_new_job(scraped, today)),
        Ok(None) => {
            warn!("Listing {link} has no title, skipping");
            None
        }
        Err(e) => {
            warn!("Could not parse listing {link}: {e}");
            None
        }
    }
}

pub fn into_new_job(scraped: ScrapedJob, today: NaiveDate) -> NewJob {
    let deadline = extract_deadline(&scraped.description, today);
    NewJob {
        title: scraped.title,
        company: scraped.company,
        location: scraped.location,
        salary: scraped.salary,
        description: scraped.description,
        url: scraped.url,
        source: scraped.source.as_str().to_string(),
        deadline: Some(deadline),
    }
}

pub async fn run_scrape(
    pool: &SqlitePool,
    fetcher: &Fetcher,
    request: &ScrapeRequest,
) -> Result<ScrapeSummary, AppError> {
    let today = Utc::now().date_naive();
    let pages = search_pages(request);
    info!(
        "Scraping {} search pages across {} sites",
        pages.len(),
        request.sites.len()
    );

    let (links, pages_found) = collect_job_links(fetcher, pages, request.max_jobs).await;
    if pages_found == 0 && !request.sites.is_empty() {
        return Err(AppError::Scrape("no search page could be loaded".to_string()));
    }

    let listings = fetch_listings(fetcher, links, today).await;
    let jobs_new = upsert_jobs_batch(pool, &listings).await?;

    let summary = ScrapeSummary {
        pages_found,
        jobs_found: listings.len(),
        jobs_new,
    };
    info!(
        "Scrape finished: {} pages, {} listings, {} new",
        summary.pages_found, summary.jobs_found, summary.jobs_new
    );
    Ok(summary)
}

/// Records a run and executes it on a background task. Returns the run as first stored.
pub async fn spawn_scrape_run(
    pool: SqlitePool,
    fetcher: Fetcher,
    request: ScrapeRequest,
) -> Result<ScrapeRunRow, AppError> {
    let run = runs::create_run(&pool, &request).await?;
    let run_id = run.id.clone();

    tokio::spawn(async move {
        let outcome = match run_scrape(&pool, &fetcher, &request).await {
            Ok(summary) => runs::complete_run(&pool, &run_id, &summary).await,
            Err(e) => {
                warn!("Scrape run {run_id} failed: {e}");
                runs::fail_run(&pool, &run_id, &e.to_string()).await
            }
        };
        if let Err(e) = outcome {
            tracing::error!("Could not record outcome of scrape run {run_id}: {e}");
        }
    });

    Ok(run)
}
