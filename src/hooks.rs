//! Post-sync hooks: user commands run inside the container after files land.

use thiserror::Error;
use tracing::{debug, info};

use crate::config::SyncHook;
use crate::containers::{ContainerRuntimeInterface, DockerError, ExecUser, SandboxContainer};

#[derive(Debug, Error)]
pub enum HookError {
    #[error("on_sync hook {label:?} failed:\n{output}")]
    Failed { label: String, output: String },

    #[error("Failed to run on_sync hook {label:?}: {source}")]
    Container {
        label: String,
        #[source]
        source: DockerError,
    },
}

/// The hook's stderr is redirected into stdout by the shell, so this is
/// normally in write order already.
fn combined_output(output: &std::process::Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text.trim().to_string()
}

/// Run hooks one at a time through `sh -c`, stopping at the first failure.
///
/// `on_start` receives each hook's label before it runs.
pub fn run_hooks<T: ContainerRuntimeInterface>(
    container: &SandboxContainer<T>,
    workdir: &str,
    hooks: &[SyncHook],
    mut on_start: impl FnMut(&str),
) -> Result<(), HookError> {
    for hook in hooks {
        let label = hook.label();
        let user = if hook.root {
            ExecUser::Root
        } else {
            ExecUser::Agent
        };

        on_start(label);
        info!("running hook {:?} as {}", label, user.as_str());

        let script = format!("exec 2>&1\n{}", hook.command);
        let output = container
            .exec_as(user, workdir, &["sh", "-c", &script])
            .map_err(|source| HookError::Container {
                label: label.to_string(),
                source,
            })?;

        let text = combined_output(&output);
        if !output.status.success() {
            return Err(HookError::Failed {
                label: label.to_string(),
                output: text,
            });
        }
        if !text.is_empty() {
            debug!("hook {:?} output: {}", label, text);
        }
    }
    Ok(())
}
