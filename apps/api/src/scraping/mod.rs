pub mod deadline;
pub mod extract;
pub mod fetcher;
pub mod handlers;
pub mod pipeline;
pub mod robots;
pub mod runs;
pub mod sites;
