pub mod handlers;
pub mod parser;
pub mod repository;
pub mod skills;
pub mod text;
