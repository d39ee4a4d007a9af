pub mod prelude;

pub mod deployments;
pub mod otps;
pub mod pipelines;
pub mod projects;
pub mod users;
