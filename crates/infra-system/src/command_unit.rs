// External command unit
// Spawns an isolated child process per attempt with environment allowlisting
use async_trait::async_trait;
use cadence_core::port::{ProcessUnit, UnitContext, UnitError};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{timeout, Instant};
use tracing::{debug, info};

/// Parent environment variables passed to children unless configured otherwise
pub const DEFAULT_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "USER", "LANG", "TZ"];

/// Longest stderr tail kept in a failure message
const MAX_STDERR_BYTES: usize = 2048;

/// Runs an external program; a non-zero exit is a unit failure
#[derive(Debug, Clone)]
pub struct CommandUnit {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    env_allowlist: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandUnit {
    /// Create a command unit
    ///
    /// # Example
    /// ```ignore
    /// let unit = CommandUnit::new("/usr/local/bin/sync")
    ///     .args(["--full"])
    ///     .timeout(Duration::from_secs(600));
    /// ```
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            env_allowlist: DEFAULT_ENV_ALLOWLIST.iter().map(|s| s.to_string()).collect(),
            timeout: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Explicit variable for the child (always passed, overrides the parent)
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Replace the list of parent variables passed through
    pub fn env_allowlist<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.env_allowlist = names.into_iter().map(Into::into).collect();
        self
    }

    /// Per-attempt limit; the child is killed when it is exceeded
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Child environment: allowlisted parent vars, then explicit vars, then cycle context
    fn child_env(
        &self,
        parent: impl IntoIterator<Item = (String, String)>,
        ctx: &UnitContext,
    ) -> HashMap<String, String> {
        let mut env: HashMap<String, String> = parent
            .into_iter()
            .filter(|(k, _)| self.env_allowlist.contains(k))
            .collect();
        env.extend(self.env.iter().map(|(k, v)| (k.clone(), v.clone())));
        env.insert("CADENCE_UNIT".to_string(), ctx.unit.clone());
        env.insert("CADENCE_CYCLE_ID".to_string(), ctx.cycle_id.to_string());
        env.insert("CADENCE_ATTEMPT".to_string(), ctx.attempt.to_string());
        env
    }

    async fn spawn_and_wait(&self, ctx: &UnitContext) -> Result<Output, UnitError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env_clear()
            .envs(self.child_env(std::env::vars(), ctx))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        let child = command.spawn().map_err(|e| self.spawn_error(e))?;

        match self.timeout {
            // Dropping the child on timeout kills it (kill_on_drop)
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(output) => output.map_err(UnitError::from),
                Err(_) => Err(UnitError::Timeout(limit)),
            },
            None => child.wait_with_output().await.map_err(UnitError::from),
        }
    }

    fn spawn_error(&self, err: std::io::Error) -> UnitError {
        match err.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied => UnitError::Configuration(format!(
                "cannot execute '{}': {}",
                self.program, err
            )),
            _ => UnitError::Io(format!("failed to spawn '{}': {}", self.program, err)),
        }
    }
}

#[async_trait]
impl ProcessUnit for CommandUnit {
    async fn run(&self, ctx: &UnitContext) -> Result<(), UnitError> {
        let started = Instant::now();

        info!(
            unit = %ctx.unit,
            cycle_id = ctx.cycle_id,
            attempt = ctx.attempt,
            command = %self.program,
            args = ?self.args,
            timeout_ms = ?self.timeout.map(|t| t.as_millis()),
            "Starting command"
        );

        let output = self.spawn_and_wait(ctx).await?;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        debug!(
            unit = %ctx.unit,
            stdout = %String::from_utf8_lossy(&output.stdout).trim_end(),
            "Command output"
        );

        if !output.status.success() {
            return Err(UnitError::Command {
                code: output.status.code(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        info!(
            unit = %ctx.unit,
            command = %self.program,
            duration_ms = duration_ms,
            "Command completed"
        );
        Ok(())
    }
}

/// Last `MAX_STDERR_BYTES` of stderr, trimmed, on a char boundary
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= MAX_STDERR_BYTES {
        return text.to_string();
    }
    let mut start = text.len() - MAX_STDERR_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_string()
}
