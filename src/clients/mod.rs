pub mod github;
pub mod jenkins;
