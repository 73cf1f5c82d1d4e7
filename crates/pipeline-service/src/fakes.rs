//! In-memory fake for the service trait (testing only)
//!
//! `MemoryPipelineService` satisfies the `PipelineService` contract without
//! any network access. Tests seed pipelines and runs, script the statuses a
//! run reports on successive `get_run` calls, and inject upload, lookup or
//! trigger failures.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::ServiceError;
use crate::service::*;

#[derive(Debug, Default)]
struct State {
    experiments: Vec<Experiment>,
    pipelines: Vec<PipelineRecord>,
    versions: Vec<PipelineVersionRecord>,
    /// Newest first.
    runs: Vec<Run>,
    /// Statuses a run reports on subsequent `get_run` calls; the last one sticks.
    scripts: HashMap<RunId, VecDeque<RunStatus>>,
    get_run_calls: usize,
    failing_uploads: HashSet<String>,
    failing_lookups: HashSet<String>,
    fail_triggers: bool,
    fail_list_runs: bool,
}

/// In-memory pipeline service.
#[derive(Debug, Default)]
pub struct MemoryPipelineService {
    state: Mutex<State>,
    reject_duplicate_names: bool,
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl MemoryPipelineService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse `upload_pipeline` when the name is already registered, the way
    /// a Kubeflow API server does. By default duplicates are accepted silently.
    pub fn rejecting_duplicate_names(mut self) -> Self {
        self.reject_duplicate_names = true;
        self
    }

    /// Register a pipeline directly and return its id.
    pub fn seed_pipeline(&self, name: &str) -> PipelineId {
        let id = PipelineId(new_id());
        let mut state = self.state.lock().unwrap();
        state.pipelines.push(PipelineRecord {
            id: id.clone(),
            name: name.to_string(),
            created_at: Some(Utc::now()),
        });
        id
    }

    /// Record a run as the newest run of `pipeline_id`.
    pub fn seed_run(&self, pipeline_id: &PipelineId, status: RunStatus) -> RunId {
        let id = RunId(new_id());
        let mut state = self.state.lock().unwrap();
        state.runs.insert(
            0,
            Run {
                id: id.clone(),
                name: format!("seeded-{}", id),
                pipeline_id: Some(pipeline_id.clone()),
                status,
                created_at: Some(Utc::now()),
            },
        );
        id
    }

    /// Make `get_run(run_id)` walk through `statuses`, one per call.
    pub fn script_run(&self, run_id: &RunId, statuses: impl IntoIterator<Item = RunStatus>) {
        let mut state = self.state.lock().unwrap();
        state
            .scripts
            .insert(run_id.clone(), statuses.into_iter().collect());
    }

    /// Remove a run, as if it had been deleted server-side.
    pub fn delete_run(&self, run_id: &RunId) {
        let mut state = self.state.lock().unwrap();
        state.runs.retain(|r| &r.id != run_id);
        state.scripts.remove(run_id);
    }

    /// Reject every upload (pipeline or version) for this pipeline name.
    pub fn fail_uploads_for(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_uploads
            .insert(name.to_string());
    }

    /// Make name lookups for this pipeline fail with a server error.
    pub fn fail_lookups_for(&self, name: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_lookups
            .insert(name.to_string());
    }

    /// Make every `trigger_run` fail.
    pub fn fail_triggers(&self) {
        self.state.lock().unwrap().fail_triggers = true;
    }

    /// Make every `list_runs` fail.
    pub fn fail_list_runs(&self) {
        self.state.lock().unwrap().fail_list_runs = true;
    }

    /// Number of `get_run` calls served so far.
    pub fn get_run_calls(&self) -> usize {
        self.state.lock().unwrap().get_run_calls
    }

    /// Snapshot of all registered pipelines, in registration order.
    pub fn pipelines(&self) -> Vec<PipelineRecord> {
        self.state.lock().unwrap().pipelines.clone()
    }

    /// Versions uploaded under `pipeline_id`, oldest first.
    pub fn versions_of(&self, pipeline_id: &PipelineId) -> Vec<PipelineVersionRecord> {
        self.state
            .lock()
            .unwrap()
            .versions
            .iter()
            .filter(|v| &v.pipeline_id == pipeline_id)
            .cloned()
            .collect()
    }

    /// Snapshot of all runs, newest first.
    pub fn runs(&self) -> Vec<Run> {
        self.state.lock().unwrap().runs.clone()
    }

    fn check_package(package: &Path) -> ServiceResult<()> {
        if package.is_file() {
            Ok(())
        } else {
            Err(ServiceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("pipeline package not found: {}", package.display()),
            )))
        }
    }
}

#[async_trait]
impl PipelineService for MemoryPipelineService {
    async fn resolve_experiment(&self, name: &str) -> ServiceResult<Experiment> {
        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state.experiments.iter().find(|e| e.name == name) {
            return Ok(existing.clone());
        }
        let experiment = Experiment {
            id: ExperimentId(new_id()),
            name: name.to_string(),
        };
        state.experiments.push(experiment.clone());
        Ok(experiment)
    }

    async fn lookup_pipeline_id(&self, name: &str) -> ServiceResult<Option<PipelineId>> {
        let state = self.state.lock().unwrap();
        if state.failing_lookups.contains(name) {
            return Err(ServiceError::Rejected {
                status: 500,
                message: format!("lookup of '{}' failed", name),
            });
        }
        let matches: Vec<&PipelineRecord> =
            state.pipelines.iter().filter(|p| p.name == name).collect();
        match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some(only.id.clone())),
            many => Err(ServiceError::AmbiguousName {
                name: name.to_string(),
                count: many.len(),
            }),
        }
    }

    async fn upload_pipeline(&self, package: &Path, name: &str) -> ServiceResult<PipelineRecord> {
        Self::check_package(package)?;
        let mut state = self.state.lock().unwrap();
        if state.failing_uploads.contains(name) {
            return Err(ServiceError::Rejected {
                status: 400,
                message: format!("invalid pipeline spec for '{}'", name),
            });
        }
        if self.reject_duplicate_names && state.pipelines.iter().any(|p| p.name == name) {
            return Err(ServiceError::Rejected {
                status: 409,
                message: format!("pipeline with name '{}' already exists", name),
            });
        }
        let record = PipelineRecord {
            id: PipelineId(new_id()),
            name: name.to_string(),
            created_at: Some(Utc::now()),
        };
        state.pipelines.push(record.clone());
        Ok(record)
    }

    async fn upload_pipeline_version(
        &self,
        package: &Path,
        version_name: &str,
        pipeline_id: &PipelineId,
    ) -> ServiceResult<PipelineVersionRecord> {
        Self::check_package(package)?;
        let mut state = self.state.lock().unwrap();
        let owner = state
            .pipelines
            .iter()
            .find(|p| &p.id == pipeline_id)
            .ok_or_else(|| ServiceError::pipeline_not_found(pipeline_id.as_str()))?;
        if state.failing_uploads.contains(&owner.name) {
            return Err(ServiceError::Rejected {
                status: 400,
                message: format!("invalid pipeline spec for '{}'", owner.name),
            });
        }
        if state
            .versions
            .iter()
            .any(|v| &v.pipeline_id == pipeline_id && v.name == version_name)
        {
            return Err(ServiceError::Rejected {
                status: 409,
                message: format!("version '{}' already exists", version_name),
            });
        }
        let version = PipelineVersionRecord {
            id: new_id(),
            name: version_name.to_string(),
            pipeline_id: pipeline_id.clone(),
        };
        state.versions.push(version.clone());
        Ok(version)
    }

    async fn trigger_run(
        &self,
        experiment_id: &ExperimentId,
        job_name: &str,
        pipeline_id: &PipelineId,
    ) -> ServiceResult<RunId> {
        let mut state = self.state.lock().unwrap();
        if state.fail_triggers {
            return Err(ServiceError::Rejected {
                status: 500,
                message: "run could not be scheduled".to_string(),
            });
        }
        if !state.experiments.iter().any(|e| &e.id == experiment_id) {
            return Err(ServiceError::NotFound {
                kind: "experiment",
                name: experiment_id.to_string(),
            });
        }
        if !state.pipelines.iter().any(|p| &p.id == pipeline_id) {
            return Err(ServiceError::pipeline_not_found(pipeline_id.as_str()));
        }
        let id = RunId(new_id());
        state.runs.insert(
            0,
            Run {
                id: id.clone(),
                name: job_name.to_string(),
                pipeline_id: Some(pipeline_id.clone()),
                status: RunStatus::Pending,
                created_at: Some(Utc::now()),
            },
        );
        Ok(id)
    }

    async fn list_pipelines(&self) -> ServiceResult<Vec<PipelineRecord>> {
        Ok(self.pipelines())
    }

    async fn list_runs(&self, pipeline_id: Option<&PipelineId>) -> ServiceResult<Vec<Run>> {
        let state = self.state.lock().unwrap();
        if state.fail_list_runs {
            return Err(ServiceError::Rejected {
                status: 500,
                message: "run listing unavailable".to_string(),
            });
        }
        Ok(state
            .runs
            .iter()
            .filter(|r| pipeline_id.is_none() || r.pipeline_id.as_ref() == pipeline_id)
            .cloned()
            .collect())
    }

    async fn get_run(&self, run_id: &RunId) -> ServiceResult<Run> {
        let mut state = self.state.lock().unwrap();
        state.get_run_calls += 1;

        let scripted = match state.scripts.get_mut(run_id) {
            Some(script) if script.len() > 1 => script.pop_front(),
            Some(script) => script.front().cloned(),
            None => None,
        };

        let run = state
            .runs
            .iter_mut()
            .find(|r| &r.id == run_id)
            .ok_or_else(|| ServiceError::run_not_found(run_id.as_str()))?;
        if let Some(status) = scripted {
            run.status = status;
        }
        Ok(run.clone())
    }
}
