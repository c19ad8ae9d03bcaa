//! Pipe backend: a shell on plain stdio pipes.

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace};

use super::{ShellIo, ShellSpec, CHANNEL_CAPACITY};
use crate::Result;

const READ_BUFFER_SIZE: usize = 8192;

/// Dropping this kills the shell.
struct PipeGuard {
    _kill: oneshot::Sender<()>,
}

/// Spawn `spec` with piped stdio.
///
/// stdout and stderr are merged into one output channel, as a terminal
/// would show them. Must be called from within a tokio runtime.
pub fn spawn_piped(spec: &ShellSpec) -> Result<ShellIo> {
    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .current_dir(&spec.cwd)
        .env("TERM", "dumb")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let pid = child.id().unwrap_or(0);
    let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (in_tx, mut in_rx) = mpsc::channel::<Vec<u8>>(CHANNEL_CAPACITY);

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump_output(stdout, out_tx.clone(), "stdout"));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump_output(stderr, out_tx, "stderr"));
    }

    if let Some(mut stdin) = child.stdin.take() {
        tokio::spawn(async move {
            while let Some(data) = in_rx.recv().await {
                trace!("pipe writer: writing {} bytes", data.len());
                if let Err(e) = stdin.write_all(&data).await {
                    debug!("pipe writer: {}", e);
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    debug!("pipe writer flush: {}", e);
                    break;
                }
            }
        });
    }

    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let killed = tokio::select! {
            status = child.wait() => {
                match status {
                    Ok(status) => debug!(pid, %status, "piped shell exited"),
                    Err(e) => error!(pid, "waiting on piped shell failed: {}", e),
                }
                false
            }
            _ = kill_rx => true,
        };
        if killed {
            debug!(pid, "killing piped shell");
            let _ = child.kill().await;
        }
    });

    debug!(pid, program = %spec.program, cwd = %spec.cwd.display(), "piped shell spawned");

    Ok(ShellIo {
        input: in_tx,
        output: out_rx,
        pid,
        tty: false,
        guard: Box::new(PipeGuard { _kill: kill_tx }),
    })
}

async fn pump_output<R>(mut stream: R, tx: mpsc::Sender<Vec<u8>>, name: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        match stream.read(&mut buf).await {
            Ok(0) => {
                debug!("pipe reader ({}): EOF", name);
                break;
            }
            Ok(n) => {
                if tx.send(buf[..n].to_vec()).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                error!("pipe reader ({}) error: {}", name, e);
                break;
            }
        }
    }
}
