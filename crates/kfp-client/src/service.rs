//! `PipelineService` implementation over the REST API.

use std::path::Path;

use async_trait::async_trait;
use pipeline_service::{
    Experiment, ExperimentId, PipelineId, PipelineRecord, PipelineService, PipelineVersionRecord,
    Run, RunId, ServiceError, ServiceResult,
};
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use crate::api::{self, ResourceReference};
use crate::client::KfpClient;

const PAGE_SIZE: &str = "100";

impl KfpClient {
    fn namespace_params(&self) -> Vec<(&'static str, String)> {
        if self.config.multi_user {
            vec![
                (
                    "resource_reference_key.type",
                    api::RESOURCE_NAMESPACE.to_string(),
                ),
                ("resource_reference_key.id", self.config.namespace.clone()),
            ]
        } else {
            Vec::new()
        }
    }

    async fn find_experiment(&self, name: &str) -> ServiceResult<Option<Experiment>> {
        let mut params = self.namespace_params();
        params.push(("filter", api::name_filter(name)));
        let response = self.send(self.get("experiments").query(&params)).await?;
        let list: api::ListExperimentsResponse =
            self.decode(response, ("experiment", name)).await?;
        Ok(list
            .experiments
            .into_iter()
            .find(|e| e.name == name)
            .map(Experiment::from))
    }

    async fn create_experiment(&self, name: &str) -> ServiceResult<Experiment> {
        let resource_references = if self.config.multi_user {
            vec![ResourceReference::owner(
                api::RESOURCE_NAMESPACE,
                &self.config.namespace,
            )]
        } else {
            Vec::new()
        };
        let body = api::CreateExperimentRequest {
            name: name.to_string(),
            resource_references,
        };
        let response = self.send(self.post("experiments").json(&body)).await?;
        let created: api::ApiExperiment = self.decode(response, ("experiment", name)).await?;
        Ok(created.into())
    }

    async fn package_form(package: &Path) -> ServiceResult<Form> {
        let bytes = tokio::fs::read(package).await?;
        let file_name = package
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipeline.yaml".to_string());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/x-yaml")
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;
        Ok(Form::new().part("uploadfile", part))
    }
}

#[async_trait]
impl PipelineService for KfpClient {
    async fn resolve_experiment(&self, name: &str) -> ServiceResult<Experiment> {
        if let Some(existing) = self.find_experiment(name).await? {
            info!(experiment = %name, id = %existing.id, "Using existing experiment");
            return Ok(existing);
        }
        let created = self.create_experiment(name).await?;
        info!(experiment = %name, id = %created.id, "Created new experiment");
        Ok(created)
    }

    async fn lookup_pipeline_id(&self, name: &str) -> ServiceResult<Option<PipelineId>> {
        let request = self
            .get("pipelines")
            .query(&[("filter", api::name_filter(name))]);
        let response = self.send(request).await?;
        let list: api::ListPipelinesResponse = self.decode(response, ("pipeline", name)).await?;

        let mut matches: Vec<api::ApiPipeline> =
            list.pipelines.into_iter().filter(|p| p.name == name).collect();
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop().map(|p| PipelineId(p.id))),
            count => Err(ServiceError::AmbiguousName {
                name: name.to_string(),
                count,
            }),
        }
    }

    async fn upload_pipeline(&self, package: &Path, name: &str) -> ServiceResult<PipelineRecord> {
        let form = Self::package_form(package).await?;
        let request = self
            .post("pipelines/upload")
            .query(&[("name", name)])
            .multipart(form);
        let response = self.send(request).await?;
        let pipeline: api::ApiPipeline = self.decode(response, ("pipeline", name)).await?;
        debug!(pipeline = %name, id = %pipeline.id, "Pipeline uploaded");
        Ok(pipeline.into())
    }

    async fn upload_pipeline_version(
        &self,
        package: &Path,
        version_name: &str,
        pipeline_id: &PipelineId,
    ) -> ServiceResult<PipelineVersionRecord> {
        let form = Self::package_form(package).await?;
        let request = self
            .post("pipelines/upload_version")
            .query(&[("name", version_name), ("pipelineid", pipeline_id.as_str())])
            .multipart(form);
        let response = self.send(request).await?;
        let version: api::ApiPipelineVersion = self
            .decode(response, ("pipeline", pipeline_id.as_str()))
            .await?;
        Ok(version.into_record(pipeline_id))
    }

    async fn trigger_run(
        &self,
        experiment_id: &ExperimentId,
        job_name: &str,
        pipeline_id: &PipelineId,
    ) -> ServiceResult<RunId> {
        let body = api::CreateRunRequest {
            name: job_name.to_string(),
            pipeline_spec: api::PipelineSpec {
                pipeline_id: Some(pipeline_id.to_string()),
            },
            resource_references: vec![ResourceReference::owner(
                api::RESOURCE_EXPERIMENT,
                experiment_id.as_str(),
            )],
        };
        let response = self.send(self.post("runs").json(&body)).await?;
        let detail: api::RunDetail = self
            .decode(response, ("pipeline", pipeline_id.as_str()))
            .await?;
        Ok(RunId(detail.run.id))
    }

    async fn list_pipelines(&self) -> ServiceResult<Vec<PipelineRecord>> {
        let mut pipelines = Vec::new();
        let mut page_token = String::new();
        loop {
            let request = self.get("pipelines").query(&[
                ("page_size", PAGE_SIZE),
                ("page_token", page_token.as_str()),
            ]);
            let response = self.send(request).await?;
            let page: api::ListPipelinesResponse =
                self.decode(response, ("pipeline", "*")).await?;
            pipelines.extend(page.pipelines.into_iter().map(PipelineRecord::from));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = token,
                _ => break,
            }
        }
        Ok(pipelines)
    }

    /// Runs come back ordered by `created_at desc`, as requested from the
    /// server; the per-pipeline filter is applied client-side and keeps order.
    async fn list_runs(&self, pipeline_id: Option<&PipelineId>) -> ServiceResult<Vec<Run>> {
        let mut runs = Vec::new();
        let mut page_token = String::new();
        loop {
            let mut params = self.namespace_params();
            params.push(("page_size", PAGE_SIZE.to_string()));
            params.push(("page_token", page_token.clone()));
            params.push(("sort_by", "created_at desc".to_string()));

            let response = self.send(self.get("runs").query(&params)).await?;
            let page: api::ListRunsResponse = self.decode(response, ("run", "*")).await?;
            runs.extend(
                page.runs
                    .into_iter()
                    .filter(|r| match pipeline_id {
                        Some(id) => r.pipeline_id() == Some(id.as_str()),
                        None => true,
                    })
                    .map(Run::from),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = token,
                _ => break,
            }
        }
        Ok(runs)
    }

    async fn get_run(&self, run_id: &RunId) -> ServiceResult<Run> {
        let response = self
            .send(self.get(&format!("runs/{}", run_id)))
            .await?;
        let detail: api::RunDetail = self.decode(response, ("run", run_id.as_str())).await?;
        Ok(detail.run.into())
    }
}
