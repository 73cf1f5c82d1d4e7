//! Wire types of the Kubeflow Pipelines v1beta1 REST API.
//!
//! Only the fields the deployer reads or writes are modelled; everything
//! else in the server's JSON is ignored.

use chrono::{DateTime, Utc};
use pipeline_service::{
    Experiment, ExperimentId, PipelineId, PipelineRecord, PipelineVersionRecord, Run, RunId,
    RunStatus,
};
use serde::{Deserialize, Serialize};

pub const RESOURCE_EXPERIMENT: &str = "EXPERIMENT";
pub const RESOURCE_NAMESPACE: &str = "NAMESPACE";
pub const RESOURCE_PIPELINE: &str = "PIPELINE";
pub const RELATIONSHIP_OWNER: &str = "OWNER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceKey {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceReference {
    pub key: ResourceKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
}

impl ResourceReference {
    pub fn owner(kind: &str, id: &str) -> Self {
        ResourceReference {
            key: ResourceKey {
                kind: kind.to_string(),
                id: id.to_string(),
            },
            relationship: Some(RELATIONSHIP_OWNER.to_string()),
        }
    }
}

// ── experiments ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ApiExperiment {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListExperimentsResponse {
    #[serde(default)]
    pub experiments: Vec<ApiExperiment>,
}

#[derive(Debug, Serialize)]
pub struct CreateExperimentRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub resource_references: Vec<ResourceReference>,
}

impl From<ApiExperiment> for Experiment {
    fn from(e: ApiExperiment) -> Self {
        Experiment {
            id: ExperimentId(e.id),
            name: e.name,
        }
    }
}

// ── pipelines ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPipeline {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPipelinesResponse {
    #[serde(default)]
    pub pipelines: Vec<ApiPipeline>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPipelineVersion {
    pub id: String,
    pub name: String,
}

impl From<ApiPipeline> for PipelineRecord {
    fn from(p: ApiPipeline) -> Self {
        PipelineRecord {
            id: PipelineId(p.id),
            name: p.name,
            created_at: p.created_at,
        }
    }
}

impl ApiPipelineVersion {
    pub fn into_record(self, pipeline_id: &PipelineId) -> PipelineVersionRecord {
        PipelineVersionRecord {
            id: self.id,
            name: self.name,
            pipeline_id: pipeline_id.clone(),
        }
    }
}

// ── runs ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRun {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub pipeline_spec: Option<PipelineSpec>,
    #[serde(default)]
    pub resource_references: Vec<ResourceReference>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl ApiRun {
    /// Pipeline this run was started from, if the server says.
    pub fn pipeline_id(&self) -> Option<&str> {
        self.pipeline_spec
            .as_ref()
            .and_then(|s| s.pipeline_id.as_deref())
            .filter(|id| !id.is_empty())
            .or_else(|| {
                self.resource_references
                    .iter()
                    .find(|r| r.key.kind == RESOURCE_PIPELINE)
                    .map(|r| r.key.id.as_str())
            })
    }
}

impl From<ApiRun> for Run {
    fn from(r: ApiRun) -> Self {
        let pipeline_id = r.pipeline_id().map(PipelineId::from);
        Run {
            id: RunId(r.id),
            name: r.name,
            pipeline_id,
            status: RunStatus::parse(r.status.as_deref().unwrap_or_default()),
            created_at: r.created_at,
        }
    }
}

/// `GET /runs/{id}` and `POST /runs` both answer with a run detail.
#[derive(Debug, Deserialize)]
pub struct RunDetail {
    pub run: ApiRun,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRunsResponse {
    #[serde(default)]
    pub runs: Vec<ApiRun>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateRunRequest {
    pub name: String,
    pub pipeline_spec: PipelineSpec,
    pub resource_references: Vec<ResourceReference>,
}

// ── filters ──────────────────────────────────────────────────────────────

/// Server-side `filter` query value selecting resources by exact name.
pub fn name_filter(name: &str) -> String {
    serde_json::json!({
        "predicates": [{
            "key": "name",
            "op": "EQUALS",
            "string_value": name,
        }]
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_run_pipeline_id_prefers_pipeline_spec() {
        let run: ApiRun = serde_json::from_value(json!({
            "id": "r1",
            "name": "job",
            "status": "Running",
            "pipeline_spec": {"pipeline_id": "p1"},
            "resource_references": [
                {"key": {"type": "PIPELINE", "id": "p2"}, "relationship": "CREATOR"}
            ]
        }))
        .unwrap();
        assert_eq!(run.pipeline_id(), Some("p1"));
    }

    #[test]
    fn test_run_pipeline_id_falls_back_to_reference() {
        let run: ApiRun = serde_json::from_value(json!({
            "id": "r1",
            "resource_references": [
                {"key": {"type": "EXPERIMENT", "id": "e1"}, "relationship": "OWNER"},
                {"key": {"type": "PIPELINE", "id": "p2"}, "relationship": "CREATOR"}
            ]
        }))
        .unwrap();
        assert_eq!(run.pipeline_id(), Some("p2"));
    }

    #[test]
    fn test_run_without_status_is_pending() {
        let run: ApiRun = serde_json::from_value(json!({"id": "r1"})).unwrap();
        let run: Run = run.into();
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.pipeline_id.is_none());
    }

    #[test]
    fn test_name_filter_shape() {
        let filter: serde_json::Value = serde_json::from_str(&name_filter("hello")).unwrap();
        assert_eq!(filter["predicates"][0]["op"], "EQUALS");
        assert_eq!(filter["predicates"][0]["string_value"], "hello");
    }

    #[test]
    fn test_owner_reference_serializes_type_field() {
        let reference = ResourceReference::owner(RESOURCE_EXPERIMENT, "e1");
        let v = serde_json::to_value(&reference).unwrap();
        assert_eq!(v["key"]["type"], "EXPERIMENT");
        assert_eq!(v["relationship"], "OWNER");
    }
}
