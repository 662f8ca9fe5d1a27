pub mod config;
pub mod crawl;
pub mod dedup;
pub mod document;
pub mod error;
pub mod extract;
pub mod files;
pub mod index;
pub mod model;
pub mod normalize;
pub mod prepare;
