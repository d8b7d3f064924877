use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::{FixtureError, FixtureResult};

const CHANNEL_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
enum RelayStream {
    Stdout,
    Stderr,
}

/// Privileged, out-of-band access to the backing store. The identity the
/// suite registers cannot delete itself through the ordinary API, so removal
/// runs as an administrative script inside a short-lived subprocess: the
/// script travels over stdin, diagnostics come back over both output streams,
/// and only the exit status carries control flow.
#[derive(Debug, Clone)]
pub struct StoreAccessChannel {
    shell: String,
    connection_string: String,
}

impl StoreAccessChannel {
    pub fn new(shell: impl Into<String>, connection_string: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            connection_string: connection_string.into(),
        }
    }

    /// Deletes the identity registered for this run by its case-normalized
    /// email.
    pub async fn remove_identity(&self, email: &str) -> FixtureResult<()> {
        self.run_admin_script(&identity_removal_script(email)).await
    }

    async fn run_admin_script(&self, script: &str) -> FixtureResult<()> {
        let mut child = Command::new(&self.shell)
            .arg(&self.connection_string)
            .arg("--quiet")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| {
                FixtureError::TeardownFailure(format!(
                    "failed to start admin shell '{}': {error}",
                    self.shell
                ))
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            FixtureError::TeardownFailure("admin shell stdin was not piped".to_owned())
        })?;
        stdin.write_all(script.as_bytes()).await.map_err(|error| {
            FixtureError::TeardownFailure(format!("writing the admin script failed: {error}"))
        })?;
        // Close the stream so the shell sees end of input.
        drop(stdin);

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = stdout.map(|stream| tokio::spawn(relay(stream, RelayStream::Stdout)));
        let stderr_task = stderr.map(|stream| tokio::spawn(relay(stream, RelayStream::Stderr)));

        let status = timeout(CHANNEL_WAIT_TIMEOUT, child.wait())
            .await
            .map_err(|_| {
                FixtureError::TeardownFailure(format!(
                    "admin shell did not exit within {CHANNEL_WAIT_TIMEOUT:?}"
                ))
            })?
            .map_err(|error| {
                FixtureError::TeardownFailure(format!("waiting for the admin shell failed: {error}"))
            })?;

        if let Some(task) = stdout_task {
            let _ = task.await;
        }
        if let Some(task) = stderr_task {
            let _ = task.await;
        }

        if status.success() {
            Ok(())
        } else {
            Err(FixtureError::TeardownFailure(format!(
                "admin shell exited with {status}"
            )))
        }
    }
}

/// Streams subprocess diagnostics into the suite's own logs. The text is
/// never parsed; the exit status alone decides success.
async fn relay(stream: impl AsyncRead + Unpin + Send + 'static, kind: RelayStream) {
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match kind {
            RelayStream::Stdout => tracing::info!(target: "perkdir::cleanup", "{line}"),
            RelayStream::Stderr => tracing::warn!(target: "perkdir::cleanup", "{line}"),
        }
    }
}

fn identity_removal_script(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    // JSON string syntax is valid in the admin shell, so serde_json gives us
    // safe quoting for free.
    let quoted = serde_json::Value::String(normalized).to_string();
    format!(
        "const outcome = db.users.deleteOne({{ email: {quoted} }});\n\
         if (outcome.acknowledged !== true) {{ quit(1); }}\n\
         printjson(outcome);\n"
    )
}

#[cfg(test)]
mod tests {
    use super::identity_removal_script;

    #[test]
    fn removal_script_normalizes_and_quotes_the_email() {
        let script = identity_removal_script("  UI.Tester@Example.COM ");
        assert!(script.contains(r#"deleteOne({ email: "ui.tester@example.com" })"#));
        assert!(script.contains("quit(1)"));
    }

    #[test]
    fn removal_script_escapes_hostile_emails() {
        let script = identity_removal_script(r#"a"b\c@example.com"#);
        assert!(script.contains(r#""a\"b\\c@example.com""#));
    }
}
