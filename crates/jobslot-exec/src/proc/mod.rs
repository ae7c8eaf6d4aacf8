use std::{path::PathBuf, process::Stdio, time::Duration};

use jobslot_core::{RunContext, RunError, Runner};
use jobslot_model::{Artifact, ArtifactKind, JobData, JobRequest};
use serde_json::Value;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::{Child, Command},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::{
    error::ExecError,
    util::{cmd_program, cmd_script, kill_graceful},
};

const TARGET: &str = "jobslot.exec.proc";
const OUT_TARGET: &str = "jobslot.exec.proc.out";

/// Process settings shared by every job the runner executes.
#[derive(Clone, Debug)]
pub struct ProcConfig {
    /// Added before the request's own environment.
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
    /// Return an error if the exit code is not zero.
    pub fail_on_non_zero: bool,
    /// Time between SIGTERM and SIGKILL on interrupt.
    pub grace: Duration,
}

impl Default for ProcConfig {
    fn default() -> Self {
        Self {
            env: Vec::new(),
            cwd: None,
            fail_on_non_zero: true,
            grace: Duration::from_secs(2),
        }
    }
}

/// Runner for executables and scripts.
///
/// Each job gets its own current-thread runtime on the job thread; the child is killed when the job is interrupted.
/// Output data is stdout parsed as a JSON object, or `{"exitCode", "stdout"}` otherwise.
pub struct ProcRunner {
    name: &'static str,
    cfg: ProcConfig,
}

impl ProcRunner {
    pub fn new(cfg: ProcConfig) -> Self {
        Self { name: "proc", cfg }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn command(&self, job: &JobRequest, artifact: &Artifact) -> Result<Command, ExecError> {
        let mut cmd = match &artifact.kind {
            ArtifactKind::Exec { program } => cmd_program(program, &job.params.args),
            ArtifactKind::Script { path } => cmd_script(path, &job.params.args),
            other => return Err(ExecError::UnsupportedKind(other.kind())),
        };

        if let Some(cwd) = &self.cfg.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.cfg.env {
            cmd.env(k, v);
        }
        for kv in job.params.env.iter() {
            cmd.env(kv.key(), kv.value());
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }

    /// Waits for the child; either token kills it.
    async fn drive(
        &self,
        mut cmd: Command,
        token: CancellationToken,
        group: Option<CancellationToken>,
    ) -> Result<JobData, RunError> {
        let mut child = cmd
            .spawn()
            .map_err(|e| RunError::failed(ExecError::Spawn(e.to_string())))?;
        trace!(target: TARGET, pid = ?child.id(), "spawned");

        let stdout = child.stdout.take().map(|out| tokio::spawn(collect(out)));
        if let Some(err) = child.stderr.take() {
            tokio::spawn(forward(err));
        }

        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(RunError::failed)?;
                let stdout = match stdout {
                    Some(task) => task.await.unwrap_or_default(),
                    None => String::new(),
                };

                let Some(code) = status.code() else {
                    return Err(RunError::failed(ExecError::KilledBySignal));
                };
                if code != 0 && self.cfg.fail_on_non_zero {
                    return Err(RunError::failed(ExecError::NonZeroExit { code, stdout }));
                }
                debug!(target: TARGET, code, "exited");
                Ok(into_data(code, stdout))
            }
            _ = token.cancelled() => {
                info!(target: TARGET, "interrupted; killing child");
                self.kill(&mut child).await;
                Err(RunError::Interrupted)
            }
            _ = group_cancelled(group) => {
                info!(target: TARGET, "job group cancelled; killing child");
                self.kill(&mut child).await;
                Err(RunError::Interrupted)
            }
        }
    }

    async fn kill(&self, child: &mut Child) {
        if let Err(e) = kill_graceful(child, self.cfg.grace).await {
            warn!(target: TARGET, error = %e, "kill failed");
        }
    }
}

impl Default for ProcRunner {
    fn default() -> Self {
        Self::new(ProcConfig::default())
    }
}

impl Runner for ProcRunner {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports(&self, artifact: &Artifact) -> bool {
        matches!(
            artifact.kind,
            ArtifactKind::Exec { .. } | ArtifactKind::Script { .. }
        )
    }

    fn run(&self, job: &JobRequest, ctx: &RunContext<'_>) -> Result<JobData, RunError> {
        ctx.interrupt.check()?;
        let cmd = self.command(job, ctx.artifact).map_err(RunError::failed)?;

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let group = ctx.engine.job_group_token(&job.id);
        rt.block_on(self.drive(cmd, ctx.interrupt.token(), group))
    }
}

async fn group_cancelled(group: Option<CancellationToken>) {
    match group {
        Some(token) => token.cancelled_owned().await,
        None => std::future::pending().await,
    }
}

async fn collect<R: AsyncRead + Unpin>(out: R) -> String {
    let mut lines = BufReader::new(out).lines();
    let mut buf = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        trace!(target: OUT_TARGET, %line);
        buf.push_str(&line);
        buf.push('\n');
    }
    buf
}

/// stderr goes to the log, and from there into the job's sink.
async fn forward<R: AsyncRead + Unpin>(err: R) {
    let mut lines = BufReader::new(err).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        info!(target: OUT_TARGET, %line);
    }
}

fn into_data(code: i32, stdout: String) -> JobData {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(stdout.trim()) {
        return map;
    }
    let mut data = JobData::new();
    data.insert("exitCode".into(), code.into());
    data.insert("stdout".into(), stdout.into());
    data
}
