use super::error::Result;

/// The two identities commands can run as inside the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecUser {
    Agent,
    Root,
}

impl ExecUser {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecUser::Agent => "agent",
            ExecUser::Root => "root",
        }
    }
}

/// Operations the sync engine needs from a container runtime.
///
/// Every call blocks until the runtime has finished.
pub trait ContainerRuntimeInterface {
    fn does_container_exist(&self, name: &str) -> Result<bool>;

    fn is_container_running(&self, name: &str) -> Result<bool>;

    /// `mkdir -p` as root.
    fn make_dir(&self, name: &str, path: &str) -> Result<()>;

    /// Write `data` to `dest`, then set owner and mode as root.
    fn write_file(&self, name: &str, dest: &str, data: &[u8], owner: &str, mode: &str)
        -> Result<()>;

    /// Read a small file back. `None` if it does not exist or cannot be read.
    fn read_file(&self, name: &str, path: &str) -> Result<Option<Vec<u8>>>;

    /// Run `cmd` as `user` in `workdir`, capturing output.
    fn exec_as(
        &self,
        name: &str,
        user: ExecUser,
        workdir: &str,
        cmd: &[&str],
    ) -> Result<std::process::Output>;
}
