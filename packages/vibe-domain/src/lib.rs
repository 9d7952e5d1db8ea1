pub mod catalog;
pub mod genre;
pub mod keywords;
pub mod query;
pub mod rewrite;
