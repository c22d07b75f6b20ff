pub mod application;
pub mod job;
pub mod resume;
pub mod scrape_run;
