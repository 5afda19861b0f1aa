use super::container_interface::{ContainerRuntimeInterface, ExecUser};
use super::error::{DockerError, Result};
use serde_json::Value;
use std::io::Write;
use std::process::{Command, Output};

#[derive(Debug, Default, Clone, Copy)]
pub struct Docker;

impl Docker {
    pub fn is_docker_available(&self) -> bool {
        Command::new("docker")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    pub fn is_daemon_running(&self) -> bool {
        Command::new("docker")
            .args(["info"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!("docker {}", args.join(" "));
        let output = Command::new("docker").args(args).output();
        match output {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DockerError::NotInstalled),
            other => Ok(other?),
        }
    }

    /// Run a docker command that must succeed.
    fn run_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run(args)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!("stderr: {}", stderr);
            return Err(DockerError::from_stderr(&stderr, |msg| {
                DockerError::CommandFailed(format!("docker {}: {}", args.join(" "), msg))
            }));
        }
        Ok(output)
    }
}

impl ContainerRuntimeInterface for Docker {
    fn does_container_exist(&self, name: &str) -> Result<bool> {
        let output = self.run(&["container", "inspect", name])?;
        Ok(output.status.success())
    }

    fn is_container_running(&self, name: &str) -> Result<bool> {
        let output = self.run(&["container", "inspect", name])?;

        if !output.status.success() {
            return Ok(false);
        }

        let out_json: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| DockerError::CommandFailed(e.to_string()))?;

        Ok(out_json
            .pointer("/0/State/Running")
            .and_then(Value::as_bool)
            .unwrap_or(false))
    }

    fn make_dir(&self, name: &str, path: &str) -> Result<()> {
        self.run_checked(&["exec", "-u", "root", name, "mkdir", "-p", path])?;
        Ok(())
    }

    fn write_file(
        &self,
        name: &str,
        dest: &str,
        data: &[u8],
        owner: &str,
        mode: &str,
    ) -> Result<()> {
        // docker cp needs a host path to copy from
        let mut tmp = tempfile::Builder::new()
            .prefix("sandbox-sync-")
            .tempfile()?;
        tmp.write_all(data)?;
        tmp.flush()?;

        let src = tmp.path().to_string_lossy().into_owned();
        let target = format!("{}:{}", name, dest);
        let output = self.run(&["cp", &src, &target])?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DockerError::from_stderr(&stderr, |message| {
                DockerError::CopyFailed {
                    dest: dest.to_string(),
                    message,
                }
            }));
        }

        self.run_checked(&["exec", "-u", "root", name, "chown", owner, dest])?;
        self.run_checked(&["exec", "-u", "root", name, "chmod", mode, dest])?;
        Ok(())
    }

    fn read_file(&self, name: &str, path: &str) -> Result<Option<Vec<u8>>> {
        let output = self.run(&["exec", "-u", "root", name, "cat", path])?;
        if output.status.success() {
            Ok(Some(output.stdout))
        } else {
            Ok(None)
        }
    }

    fn exec_as(&self, name: &str, user: ExecUser, workdir: &str, cmd: &[&str]) -> Result<Output> {
        let mut args = vec!["exec", "-u", user.as_str(), "-w", workdir, name];
        args.extend(cmd);
        self.run(&args)
    }
}
