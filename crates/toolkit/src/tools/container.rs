//! Container launches (docker, podman, apptainer)

use std::path::{Path, PathBuf};
use std::time::Duration;

use contracts::{Backend, ContainerRuntime, ContractError, ToolInvocation, ToolRunner};
use tracing::{info, warn};

use crate::toolbox::Toolbox;

/// Time budget of `kill` / `instance stop`
const STOP_TIMEOUT: Duration = Duration::from_secs(60);

/// Host directory bound into the container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: String,
    pub read_only: bool,
}

impl Mount {
    pub fn read_only(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            read_only: true,
        }
    }

    pub fn writable(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            read_only: false,
        }
    }

    /// `host:container[:ro]`
    pub fn spec(&self) -> String {
        let mut spec = format!("{}:{}", self.host.display(), self.container);
        if self.read_only {
            spec.push_str(":ro");
        }
        spec
    }
}

/// Container (or apptainer instance) name of a backend run
///
/// Unique per pipeline process, so a stop always hits this run's container.
pub fn container_name(backend: Backend) -> String {
    format!("wmh-{}-{}", backend.name().to_lowercase(), std::process::id())
}

impl<R: ToolRunner + Sync> Toolbox<'_, R> {
    /// Build the launch of the backend's configured image
    ///
    /// docker/podman: `run --rm --name <name>` with mounts and environment.
    /// apptainer: `run instance://<name>`; mounts and environment belong to
    /// [`Self::instance_start_invocation`].
    /// Backend arguments come first, configured extra arguments last.
    pub fn container_invocation<S: AsRef<str>>(
        &self,
        backend: Backend,
        mounts: &[Mount],
        args: &[S],
    ) -> Result<ToolInvocation, ContractError> {
        let container = &self.settings().container;
        let image = container.image(backend).ok_or_else(|| missing_image(backend))?;
        let name = container_name(backend);

        let mut inv = self.invocation(container.runtime_binary()).arg("run");
        match container.runtime {
            ContainerRuntime::Docker | ContainerRuntime::Podman => {
                inv = inv.arg("--rm").arg("--name").arg(&name);
                for mount in mounts {
                    inv = inv.arg("-v").arg(mount.spec());
                }
                for (key, value) in self.thread_env() {
                    inv = inv.arg("-e").arg(format!("{key}={value}"));
                }
                inv = inv.arg(&image.image);
            }
            ContainerRuntime::Apptainer => {
                inv = inv.arg(format!("instance://{name}"));
            }
        }

        Ok(inv.args(args.iter().map(|a| a.as_ref())).args(&image.args))
    }

    /// `apptainer instance start` with mounts and environment
    pub fn instance_start_invocation(
        &self,
        backend: Backend,
        mounts: &[Mount],
    ) -> Result<ToolInvocation, ContractError> {
        let container = &self.settings().container;
        let image = container.image(backend).ok_or_else(|| missing_image(backend))?;

        let mut inv = self
            .invocation(container.runtime_binary())
            .args(["instance", "start", "--cleanenv"]);
        for mount in mounts {
            inv = inv.arg("--bind").arg(mount.spec());
        }
        for (key, value) in self.thread_env() {
            inv = inv.arg("--env").arg(format!("{key}={value}"));
        }
        Ok(inv.arg(&image.image).arg(container_name(backend)))
    }

    /// `kill <name>` for docker/podman, `instance stop` for apptainer
    pub fn stop_invocation(&self, backend: Backend, force: bool) -> ToolInvocation {
        let container = &self.settings().container;
        let name = container_name(backend);
        let inv = self
            .invocation(container.runtime_binary())
            .timeout(Some(STOP_TIMEOUT));
        match container.runtime {
            ContainerRuntime::Docker | ContainerRuntime::Podman => inv.arg("kill").arg(name),
            ContainerRuntime::Apptainer if force => {
                inv.args(["instance", "stop", "--force"]).arg(name)
            }
            ContainerRuntime::Apptainer => inv.args(["instance", "stop"]).arg(name),
        }
    }

    /// Run the backend's container, expecting `outputs` on the host afterwards
    ///
    /// A container whose launch timed out is killed; an apptainer instance
    /// is stopped whatever the outcome.
    pub async fn run_container<S: AsRef<str>>(
        &self,
        backend: Backend,
        mounts: &[Mount],
        args: &[S],
        outputs: &[&Path],
    ) -> Result<(), ContractError> {
        let mut inv = self.container_invocation(backend, mounts, args)?;
        for output in outputs {
            inv = inv.output(*output);
        }

        match self.settings().container.runtime {
            ContainerRuntime::Docker | ContainerRuntime::Podman => {
                let result = self.run(inv).await;
                if let Err(ContractError::ToolTimeout { .. }) = &result {
                    self.stop_container(backend, true).await;
                }
                result.map(|_| ())
            }
            ContainerRuntime::Apptainer => {
                self.run(self.instance_start_invocation(backend, mounts)?).await?;
                let result = self.run(inv).await;
                let timed_out = matches!(result, Err(ContractError::ToolTimeout { .. }));
                self.stop_container(backend, timed_out).await;
                result.map(|_| ())
            }
        }
    }

    /// Best effort: a failed stop is logged, the launch error stays the one reported
    async fn stop_container(&self, backend: Backend, force: bool) {
        let name = container_name(backend);
        match self.run(self.stop_invocation(backend, force)).await {
            Ok(_) => info!(container = %name, force, "container stopped"),
            Err(e) => warn!(container = %name, error = %e, "failed to stop container"),
        }
    }

    fn thread_env(&self) -> [(&'static str, String); 2] {
        let threads = self.context().threads.to_string();
        [
            ("OMP_NUM_THREADS", threads.clone()),
            ("ITK_GLOBAL_DEFAULT_NUMBER_OF_THREADS", threads),
        ]
    }
}

fn missing_image(backend: Backend) -> ContractError {
    ContractError::config_validation(
        format!("container.images.{backend}"),
        "no container image configured",
    )
}
