// # Unbound Record Sink
//
// Applies record batches through Unbound's control program:
//
// - removals: `unbound-control local_datas_remove`, one owner name per line
// - additions: `unbound-control local_datas`, one `<owner> IN <TYPE> <value>`
//   line per record
//
// Each batch is written to the program's stdin, newline-terminated. The
// program reports failures on stderr, so any stderr output counts as an
// error even when the exit status is zero.

use leasedns_core::config::SinkConfig;
use leasedns_core::record::ResourceRecord;
use leasedns_core::traits::{RecordSink, RecordSinkFactory};
use leasedns_core::{Error, Registry, Result};
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Default location of the control program
pub const DEFAULT_CONTROL_PATH: &str = "/usr/sbin/unbound-control";

/// Record sink driving `unbound-control`
#[derive(Debug, Clone)]
pub struct UnboundControl {
    program: PathBuf,
    add_command: String,
    remove_command: String,
    timeout: Duration,
    /// If true, batches are logged but the program is never run
    dry_run: bool,
}

impl UnboundControl {
    /// Create a sink for the control program at `program` with default
    /// subcommands and a 10 second timeout
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            add_command: "local_datas".to_string(),
            remove_command: "local_datas_remove".to_string(),
            timeout: Duration::from_secs(10),
            dry_run: false,
        }
    }

    /// Override the add/remove subcommands
    pub fn with_commands(mut self, add: impl Into<String>, remove: impl Into<String>) -> Self {
        self.add_command = add.into();
        self.remove_command = remove.into();
        self
    }

    /// Bound every invocation by `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Log batches instead of applying them
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run one subcommand with `lines` on stdin
    async fn run(&self, subcommand: &str, lines: &[String]) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would run {} {} with {} line(s)",
                self.program.display(),
                subcommand,
                lines.len()
            );
            for line in lines {
                tracing::info!("[DRY-RUN]   {}", line);
            }
            return Ok(());
        }

        tracing::debug!(
            "Executing {} {} with input: {:?}",
            self.program.display(),
            subcommand,
            lines
        );

        let mut child = Command::new(&self.program)
            .arg(subcommand)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::sink_apply(format!("Failed to start {}: {}", self.program.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::sink_apply("Control program stdin not captured"))?;
        let mut input = lines.join("\n");
        input.push('\n');

        let write = async move {
            // A program that exits without reading is judged by its status
            match stdin.write_all(input.as_bytes()).await {
                Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        };

        // On timeout the child is dropped, which kills it
        let output = tokio::time::timeout(self.timeout, async move {
            let (_, output) = tokio::try_join!(write, child.wait_with_output())?;
            Ok::<_, io::Error>(output)
        })
        .await
        .map_err(|_| {
            Error::sink_apply(format!(
                "{} {} timed out after {}s",
                self.program.display(),
                subcommand,
                self.timeout.as_secs_f64()
            ))
        })?
        .map_err(|e| {
            Error::sink_apply(format!("{} {} failed: {}", self.program.display(), subcommand, e))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        tracing::debug!("unbound-control output: {}", stdout.trim_end());

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return Err(Error::sink_apply(format!("{} reported: {}", subcommand, stderr)));
        }
        if !output.status.success() {
            return Err(Error::sink_apply(format!("{} exited with {}", subcommand, output.status)));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordSink for UnboundControl {
    async fn apply(&self, removed: &[ResourceRecord], added: &[ResourceRecord]) -> Result<()> {
        let mut first_error = None;

        if !removed.is_empty() {
            let lines: Vec<String> = removed.iter().map(ResourceRecord::remove_line).collect();
            if let Err(e) = self.run(&self.remove_command, &lines).await {
                tracing::error!("unbound-control error: {}", e);
                first_error = Some(e);
            }
        }

        // Additions go out even if the removals failed
        if !added.is_empty() {
            let lines: Vec<String> = added.iter().map(ResourceRecord::add_line).collect();
            if let Err(e) = self.run(&self.add_command, &lines).await {
                tracing::error!("unbound-control error: {}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn sink_name(&self) -> &'static str {
        "unbound"
    }
}

/// Factory for creating unbound-control sinks
pub struct UnboundFactory;

impl RecordSinkFactory for UnboundFactory {
    fn create(&self, config: &SinkConfig) -> Result<Box<dyn RecordSink>> {
        match config {
            SinkConfig::Unbound {
                control_path,
                add_command,
                remove_command,
                timeout_secs,
                dry_run,
            } => {
                config.validate()?;
                if *dry_run {
                    tracing::warn!("unbound sink running in DRY-RUN mode - no changes will be made");
                }
                Ok(Box::new(
                    UnboundControl::new(control_path)
                        .with_commands(add_command, remove_command)
                        .with_timeout(Duration::from_secs(*timeout_secs))
                        .with_dry_run(*dry_run),
                ))
            }
            _ => Err(Error::config("Invalid config for unbound sink")),
        }
    }
}

/// Register the unbound sink with the registry
pub fn register(registry: &Registry) {
    registry.register_sink("unbound", Box::new(UnboundFactory));
}
