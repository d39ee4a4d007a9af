pub use super::deployments::Entity as Deployments;
pub use super::otps::Entity as Otps;
pub use super::pipelines::Entity as Pipelines;
pub use super::projects::Entity as Projects;
pub use super::users::Entity as Users;
