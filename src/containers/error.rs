use thiserror::Error;

#[derive(Debug, Error)]
pub enum DockerError {
    #[error(
        "Docker is not installed or not in PATH.\n\
         Install Docker: https://docs.docker.com/get-docker/"
    )]
    NotInstalled,

    #[error(
        "Docker daemon is not running.\n\
         Start Docker Desktop or run: sudo systemctl start docker"
    )]
    DaemonNotRunning,

    #[error(
        "Docker permission denied.\n\
         On Linux, add your user to the docker group:\n\
         sudo usermod -aG docker $USER\n\
         Then log out and back in."
    )]
    PermissionDenied,

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Failed to copy {dest} into container: {message}")]
    CopyFailed { dest: String, message: String },

    #[error("Docker command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl DockerError {
    /// Map docker CLI stderr to the most specific error.
    pub(crate) fn from_stderr(stderr: &str, fallback: impl FnOnce(String) -> Self) -> Self {
        if stderr.contains("permission denied") && stderr.contains("docker.sock") {
            return DockerError::PermissionDenied;
        }
        if stderr.contains("Cannot connect to the Docker daemon") {
            return DockerError::DaemonNotRunning;
        }
        if let Some(rest) = stderr.split("No such container:").nth(1) {
            return DockerError::ContainerNotFound(rest.trim().to_string());
        }
        fallback(stderr.trim().to_string())
    }
}

pub type Result<T> = std::result::Result<T, DockerError>;
