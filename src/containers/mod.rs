pub mod container_interface;
pub mod docker;
pub mod error;

#[cfg(test)]
pub(crate) mod fake;

use std::path::Path;

pub use container_interface::{ContainerRuntimeInterface, ExecUser};
pub use docker::Docker;
pub use error::{DockerError, Result};

use crate::layout;

/// A runtime bound to one named sandbox container.
pub struct SandboxContainer<T: ContainerRuntimeInterface> {
    pub name: String,
    runtime: T,
}

pub fn default_container_runtime() -> Docker {
    Docker
}

impl<T: ContainerRuntimeInterface> SandboxContainer<T> {
    pub fn new(name: impl Into<String>, runtime: T) -> Self {
        Self {
            name: name.into(),
            runtime,
        }
    }

    pub fn for_workspace(workspace: &Path, runtime: T) -> Self {
        Self::new(layout::container_name(workspace), runtime)
    }

    pub fn runtime(&self) -> &T {
        &self.runtime
    }

    pub fn exists(&self) -> Result<bool> {
        self.runtime.does_container_exist(&self.name)
    }

    pub fn is_running(&self) -> Result<bool> {
        self.runtime.is_container_running(&self.name)
    }

    pub fn make_dir(&self, path: &str) -> Result<()> {
        self.runtime.make_dir(&self.name, path)
    }

    pub fn write_file(&self, dest: &str, data: &[u8], owner: &str, mode: &str) -> Result<()> {
        self.runtime.write_file(&self.name, dest, data, owner, mode)
    }

    pub fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>> {
        self.runtime.read_file(&self.name, path)
    }

    pub fn exec_as(
        &self,
        user: ExecUser,
        workdir: &str,
        cmd: &[&str],
    ) -> Result<std::process::Output> {
        self.runtime.exec_as(&self.name, user, workdir, cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_for_workspace() {
        let container = SandboxContainer::for_workspace(Path::new("/home/u/myapp"), Docker);
        assert_eq!(container.name, "sandbox-myapp");
    }

    #[test]
    fn test_exec_user_names() {
        assert_eq!(ExecUser::Agent.as_str(), "agent");
        assert_eq!(ExecUser::Root.as_str(), "root");
    }
}
