//! In-memory runtime for unit tests.

use std::collections::BTreeMap;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

use super::container_interface::{ContainerRuntimeInterface, ExecUser};
use super::error::Result;

#[derive(Default)]
pub(crate) struct FakeRuntime {
    pub files: Mutex<BTreeMap<String, Vec<u8>>>,
    /// `(user, command)` for every exec, in order.
    pub execs: Mutex<Vec<(String, String)>>,
    /// Exec commands containing one of these substrings exit 1 and echo the command.
    pub failing: Vec<String>,
}

impl FakeRuntime {
    pub(crate) fn failing_on(pattern: &str) -> Self {
        Self {
            failing: vec![pattern.to_string()],
            ..Default::default()
        }
    }

    pub(crate) fn exec_commands(&self) -> Vec<String> {
        self.execs
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cmd)| cmd.clone())
            .collect()
    }
}

impl ContainerRuntimeInterface for FakeRuntime {
    fn does_container_exist(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }

    fn is_container_running(&self, _name: &str) -> Result<bool> {
        Ok(true)
    }

    fn make_dir(&self, _name: &str, _path: &str) -> Result<()> {
        Ok(())
    }

    fn write_file(
        &self,
        _name: &str,
        dest: &str,
        data: &[u8],
        _owner: &str,
        _mode: &str,
    ) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(dest.to_string(), data.to_vec());
        Ok(())
    }

    fn read_file(&self, _name: &str, path: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.files.lock().unwrap().get(path).cloned())
    }

    fn exec_as(
        &self,
        _name: &str,
        user: ExecUser,
        _workdir: &str,
        cmd: &[&str],
    ) -> Result<Output> {
        let command = cmd.join(" ");
        self.execs
            .lock()
            .unwrap()
            .push((user.as_str().to_string(), command.clone()));

        let fails = self.failing.iter().any(|p| command.contains(p.as_str()));
        Ok(Output {
            status: ExitStatus::from_raw(if fails { 1 << 8 } else { 0 }),
            stdout: if fails {
                format!("boom: {}\n", command).into_bytes()
            } else {
                Vec::new()
            },
            stderr: Vec::new(),
        })
    }
}
