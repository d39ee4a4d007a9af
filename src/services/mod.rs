pub mod error;
pub use error::ServiceError;

pub mod authz;
pub mod jwt;
pub mod validation;
pub use jwt::JwtManager;

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthService, AuthTokens, LogMailer, OtpMailer};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UserDto, UserService};
pub use user_service_impl::SeaOrmUserService;

pub mod project_service;
pub mod project_service_impl;
pub use project_service::{ProjectDto, ProjectService};
pub use project_service_impl::SeaOrmProjectService;

pub mod ci_service;
pub use ci_service::CiRegistrationService;

pub mod source_control;
pub use source_control::SourceControlService;

pub mod pipeline_service;
pub mod pipeline_service_impl;
pub use pipeline_service::{PipelineDto, PipelineService};
pub use pipeline_service_impl::SeaOrmPipelineService;

pub mod deployment_service;
pub mod deployment_service_impl;
pub use deployment_service::{DeploymentDto, DeploymentService};
pub use deployment_service_impl::SeaOrmDeploymentService;

pub mod deploy_service;
pub mod deploy_service_impl;
pub use deploy_service::{DeployRequest, DeployResult, DeployService};
pub use deploy_service_impl::DefaultDeployService;
