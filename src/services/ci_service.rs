//! Maps pipeline records to CI jobs and tracks their build counters.

use std::sync::Arc;
use tracing::{info, warn};

use crate::clients::jenkins::{BuildInfo, CiError, CiServer};
use crate::db::Store;
use crate::entities::pipelines;
use crate::generators::jenkins_job;

use super::ServiceError;

pub struct CiRegistrationService {
    ci: Arc<dyn CiServer>,
    store: Store,
}

impl CiRegistrationService {
    #[must_use]
    pub fn new(ci: Arc<dyn CiServer>, store: Store) -> Self {
        Self { ci, store }
    }

    /// Creates the per-user list view unless it already exists.
    pub async fn ensure_user_view(&self, username: &str) -> Result<(), ServiceError> {
        if self.ci.view_exists(username).await? {
            return Ok(());
        }
        let config = jenkins_job::view_config(username)?;
        match self.ci.create_view(username, &config).await {
            // Lost a race with a concurrent request for the same user.
            Err(CiError::AlreadyExists(_)) | Ok(()) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates the CI job and files it under the owner's view.
    ///
    /// A job with the same name is never overwritten.
    pub async fn create_job(
        &self,
        username: &str,
        job_name: &str,
        description: &str,
        script: &str,
    ) -> Result<(), ServiceError> {
        let config = jenkins_job::job_config(description, script)?;

        self.ensure_user_view(username).await?;
        self.ci
            .create_job(job_name, &config)
            .await
            .map_err(|e| match e {
                CiError::AlreadyExists(_) => ServiceError::conflict("CI job", job_name),
                other => other.into(),
            })?;
        self.ci.add_job_to_view(username, job_name).await?;

        info!(username, job = job_name, "CI job registered");
        Ok(())
    }

    /// Triggers a build, then bumps the stored counter.
    ///
    /// The two effects are not atomic: a failed trigger leaves the counter
    /// alone, a failed counter update after a successful trigger is reported
    /// while the build keeps running.
    pub async fn trigger_build(
        &self,
        pipeline: &pipelines::Model,
    ) -> Result<pipelines::Model, ServiceError> {
        self.ci.build_job(&pipeline.pipeline_name).await?;
        metrics::counter!("ci_builds_triggered_total").increment(1);

        let now = chrono::Utc::now().to_rfc3339();
        let updated = self.store.record_build(pipeline.id, &now).await?;

        info!(
            job = %updated.pipeline_name,
            build = updated.last_build_number,
            "Build triggered"
        );
        Ok(updated)
    }

    /// Status of one build. Builds that cannot exist yet are rejected locally.
    pub async fn build_status(
        &self,
        pipeline: &pipelines::Model,
        build_number: u32,
    ) -> Result<BuildInfo, ServiceError> {
        let last = u32::try_from(pipeline.last_build_number).unwrap_or(0);
        if last == 0 {
            return Err(ServiceError::validation(format!(
                "Pipeline {} has not been built yet",
                pipeline.pipeline_name
            )));
        }
        if build_number == 0 || build_number > last {
            return Err(ServiceError::validation(format!(
                "Build number {build_number} is out of range (last build is {last})"
            )));
        }

        Ok(self
            .ci
            .get_build(&pipeline.pipeline_name, build_number)
            .await?)
    }

    /// Replaces the script of an existing job, keeping the rest of its config.
    pub async fn update_job_script(&self, job_name: &str, script: &str) -> Result<(), ServiceError> {
        let current = self.ci.get_job_config(job_name).await?;
        let updated = jenkins_job::update_job_script(&current, script)?;
        self.ci.update_job_config(job_name, &updated).await?;

        info!(job = job_name, "CI job script updated");
        Ok(())
    }

    /// Removes the CI job and the local pipeline record.
    pub async fn delete_job(&self, pipeline: &pipelines::Model) -> Result<(), ServiceError> {
        match self.ci.delete_job(&pipeline.pipeline_name).await {
            Ok(()) => {}
            Err(CiError::NotFound(_)) => {
                warn!(job = %pipeline.pipeline_name, "CI job already gone, removing record");
            }
            Err(e) => return Err(e.into()),
        }
        self.store.delete_pipeline(pipeline.id).await?;

        info!(job = %pipeline.pipeline_name, "CI job deleted");
        Ok(())
    }
}
