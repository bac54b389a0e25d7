//! Deployment Executor
//!
//! Runs the external side of a deployment, strictly in order:
//! 1. Pull the image (falling back to a local `inspect`)
//! 2. Rewrite `services.<name>.image` in the declaration file
//! 3. Recreate the service container with compose, from the deployment root
//!
//! The declaration is never touched unless the image resolved, and the whole
//! sequence runs under the per-file lock.

use anyhow::anyhow;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::process::{CommandRunner, Invocation};
use crate::service::declaration;
use crate::service::error::{DeployError, Result};
use crate::service::locks::FileLocks;

/// Pull / rewrite / apply orchestration
pub struct DeploymentExecutor {
    runner: Arc<dyn CommandRunner>,
    docker_bin: String,
    compose_command: Vec<String>,
    locks: FileLocks,
}

impl DeploymentExecutor {
    /// Creates an executor
    ///
    /// # Arguments
    /// * `runner` - Process runner used for every external call
    /// * `docker_bin` - Container runtime binary (pull / inspect)
    /// * `compose_command` - Compose program and leading args (e.g. `["docker", "compose"]`)
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        docker_bin: impl Into<String>,
        compose_command: Vec<String>,
    ) -> Self {
        Self {
            runner,
            docker_bin: docker_bin.into(),
            compose_command,
            locks: FileLocks::new(),
        }
    }

    pub fn from_config(config: &Config, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(
            runner,
            config.docker_bin.clone(),
            config.compose_command.clone(),
        )
    }

    /// Deploys `image` for `service` and returns the success message
    ///
    /// # Arguments
    /// * `root` - Deployment root; compose runs from here
    /// * `service_file` - Declaration file located for `service`
    /// * `service` - Service name
    /// * `image` - Already syntax-checked image reference
    pub fn execute(
        &self,
        root: &Path,
        service_file: &Path,
        service: &str,
        image: &str,
    ) -> Result<String> {
        self.locks.with_lock(service_file, || {
            self.pull(image)?;

            declaration::update_image(service_file, service, image).map_err(DeployError::Internal)?;
            info!(
                "Updated {} with image {} for service {}",
                service_file.display(),
                image,
                service
            );

            self.recreate(root, service)?;

            Ok(format!("service {} updated with image {}", service, image))
        })
    }

    /// Pulls `image`, accepting a locally present image when the pull fails
    fn pull(&self, image: &str) -> Result<()> {
        info!("Pulling image {}", image);
        let pull = Invocation::new(&self.docker_bin).args(["image", "pull", image]);
        if self.succeeds(&pull) {
            return Ok(());
        }

        warn!("Pull of {} failed, checking local images", image);
        let inspect = Invocation::new(&self.docker_bin).args(["image", "inspect", image]);
        if self.succeeds(&inspect) {
            info!("Using local image {}", image);
            return Ok(());
        }

        Err(DeployError::ImageNotFound)
    }

    /// Recreates the container for `service`, working directory `root`
    fn recreate(&self, root: &Path, service: &str) -> Result<()> {
        let (program, leading) = self
            .compose_command
            .split_first()
            .ok_or_else(|| DeployError::Internal(anyhow!("compose command is empty")))?;

        let invocation = Invocation::new(program)
            .args(leading.iter().cloned())
            .args(["up", "-Vd"])
            .arg(service)
            .current_dir(root);

        info!("Recreating service {} in {}", service, root.display());
        if self.succeeds(&invocation) {
            Ok(())
        } else {
            Err(DeployError::RecreateFailed)
        }
    }

    /// Runs an invocation; a process that cannot even start counts as failed
    fn succeeds(&self, invocation: &Invocation) -> bool {
        match self.runner.run(invocation) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                warn!(
                    "'{}' failed: exit_code={:?}, stdout='{}', stderr='{}'",
                    invocation.display(),
                    output.exit_code,
                    output.stdout.trim(),
                    output.stderr.trim()
                );
                false
            }
            Err(e) => {
                warn!("{:#}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::testing::RecordingRunner;
    use serde_yaml::Value;
    use std::path::PathBuf;

    const IMAGE: &str = "quay.io/openware/barong:2.4.6";

    const COMPOSE: &str = r#"version: "3.6"
services:
  barong:
    restart: always
    image: quay.io/openware/barong:2.3.0
    environment:
      - PORT=8001
  peatio:
    image: rubykube/peatio:2.0
"#;

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("docker-compose.yml");
        std::fs::write(&file, COMPOSE).unwrap();
        (dir, file)
    }

    fn executor(runner: Arc<RecordingRunner>) -> DeploymentExecutor {
        DeploymentExecutor::new(runner, "docker", vec!["docker-compose".to_string()])
    }

    fn image_of(file: &Path, service: &str) -> Value {
        let document: Value =
            serde_yaml::from_str(&std::fs::read_to_string(file).unwrap()).unwrap();
        document["services"][service]["image"].clone()
    }

    #[test]
    fn test_successful_deploy() {
        let (dir, file) = setup();
        let runner = Arc::new(RecordingRunner::new());

        let message = executor(runner.clone())
            .execute(dir.path(), &file, "barong", IMAGE)
            .unwrap();

        assert_eq!(message, format!("service barong updated with image {IMAGE}"));
        assert_eq!(
            runner.commands(),
            vec![
                format!("docker image pull {IMAGE}"),
                "docker-compose up -Vd barong".to_string(),
            ]
        );
        assert_eq!(runner.calls()[1].cwd.as_deref(), Some(dir.path()));
        assert_eq!(image_of(&file, "barong"), Value::from(IMAGE));
    }

    #[test]
    fn test_rewrite_keeps_other_content() {
        let (dir, file) = setup();
        let runner = Arc::new(RecordingRunner::new());

        executor(runner)
            .execute(dir.path(), &file, "barong", IMAGE)
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&file).unwrap(),
            COMPOSE.replace("barong:2.3.0", "barong:2.4.6")
        );
    }

    #[test]
    fn test_locally_present_image_is_accepted() {
        let (dir, file) = setup();
        let runner = Arc::new(RecordingRunner::new().failing("docker image pull"));

        executor(runner.clone())
            .execute(dir.path(), &file, "barong", IMAGE)
            .unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                format!("docker image pull {IMAGE}"),
                format!("docker image inspect {IMAGE}"),
                "docker-compose up -Vd barong".to_string(),
            ]
        );
    }

    #[test]
    fn test_unresolvable_image_leaves_file_untouched() {
        let (dir, file) = setup();
        let runner = Arc::new(RecordingRunner::new().failing("docker image"));

        let err = executor(runner.clone())
            .execute(dir.path(), &file, "barong", IMAGE)
            .unwrap_err();

        assert!(matches!(err, DeployError::ImageNotFound));
        assert_eq!(runner.commands().len(), 2);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), COMPOSE);
    }

    #[test]
    fn test_missing_docker_binary() {
        let (dir, file) = setup();
        let runner = Arc::new(RecordingRunner::new().unavailable());

        let err = executor(runner)
            .execute(dir.path(), &file, "barong", IMAGE)
            .unwrap_err();

        assert!(matches!(err, DeployError::ImageNotFound));
        assert_eq!(std::fs::read_to_string(&file).unwrap(), COMPOSE);
    }

    #[test]
    fn test_recreate_failure_is_server_error() {
        let (dir, file) = setup();
        let runner = Arc::new(RecordingRunner::new().failing("docker-compose"));

        let err = executor(runner)
            .execute(dir.path(), &file, "barong", IMAGE)
            .unwrap_err();

        assert!(matches!(err, DeployError::RecreateFailed));
        assert_eq!(err.status_code(), 500);
    }

    #[test]
    fn test_multi_word_compose_command() {
        let (dir, file) = setup();
        let runner = Arc::new(RecordingRunner::new());
        let executor = DeploymentExecutor::new(
            runner.clone(),
            "podman",
            vec!["docker".to_string(), "compose".to_string()],
        );

        executor.execute(dir.path(), &file, "barong", IMAGE).unwrap();

        assert_eq!(
            runner.commands(),
            vec![
                format!("podman image pull {IMAGE}"),
                "docker compose up -Vd barong".to_string(),
            ]
        );
    }

    #[test]
    fn test_rewrite_of_vanished_service_is_internal() {
        let (dir, file) = setup();
        std::fs::write(&file, "services:\n  other:\n    image: a/b:1\n").unwrap();
        let runner = Arc::new(RecordingRunner::new());

        let err = executor(runner.clone())
            .execute(dir.path(), &file, "barong", IMAGE)
            .unwrap_err();

        assert!(matches!(err, DeployError::Internal(_)));
        // No recreate after a failed rewrite
        assert_eq!(runner.commands(), vec![format!("docker image pull {IMAGE}")]);
    }

    #[test]
    fn test_repeat_deploy_is_idempotent() {
        let (dir, file) = setup();
        let runner = Arc::new(RecordingRunner::new());
        let executor = executor(runner);

        let first = executor.execute(dir.path(), &file, "barong", IMAGE).unwrap();
        let after_first = std::fs::read_to_string(&file).unwrap();
        let second = executor.execute(dir.path(), &file, "barong", IMAGE).unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), after_first);
    }
}
