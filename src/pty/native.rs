//! Native PTY backend using portable-pty.

use portable_pty::{native_pty_system, CommandBuilder, PtySize as NativePtySize};
use tokio::sync::mpsc;
use tracing::debug;

use super::{AsyncPtyReader, AsyncPtyWriter, ShellIo, ShellSpec, CHANNEL_CAPACITY};
use crate::error::ShellBridgeError;
use crate::Result;

/// Get the default shell for the current platform.
pub fn default_shell() -> String {
    #[cfg(unix)]
    {
        std::env::var("SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "/bin/sh".to_string())
    }
    #[cfg(windows)]
    {
        "powershell.exe".to_string()
    }
}

/// Wrapper around the native PTY system.
pub struct NativePty {
    pty_system: Box<dyn portable_pty::PtySystem + Send>,
}

/// Owns the PTY master and child; kills the child on drop.
struct PtyGuard {
    _master: Box<dyn portable_pty::MasterPty + Send>,
    child: Box<dyn portable_pty::Child + Send + Sync>,
}

impl Drop for PtyGuard {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            debug!("killing PTY shell");
            let _ = self.child.kill();
        }
    }
}

impl NativePty {
    /// Create a new NativePty instance.
    pub fn new() -> Self {
        Self {
            pty_system: native_pty_system(),
        }
    }

    /// Spawn `spec` in a new PTY and attach async reader/writer loops.
    pub fn spawn_attached(&self, spec: &ShellSpec) -> Result<ShellIo> {
        let native_size = NativePtySize {
            rows: spec.size.rows,
            cols: spec.size.cols,
            pixel_width: 0,
            pixel_height: 0,
        };

        let pair = self
            .pty_system
            .openpty(native_size)
            .map_err(|e| ShellBridgeError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&spec.program);
        for arg in &spec.args {
            cmd.arg(arg);
        }
        cmd.cwd(&spec.cwd);
        // Keep output free of colour and cursor tricks where programs honour it.
        cmd.env("TERM", "dumb");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| ShellBridgeError::Pty(e.to_string()))?;
        // The master must see EOF once the shell exits.
        drop(pair.slave);

        let pid = child.process_id().unwrap_or(0);

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| ShellBridgeError::Pty(e.to_string()))?;

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| ShellBridgeError::Pty(e.to_string()))?;

        let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::spawn(AsyncPtyReader::new(reader, out_tx).run());
        tokio::spawn(AsyncPtyWriter::new(writer, in_rx).run());

        debug!(pid, program = %spec.program, cwd = %spec.cwd.display(), "PTY shell spawned");

        Ok(ShellIo {
            input: in_tx,
            output: out_rx,
            pid,
            tty: true,
            guard: Box::new(PtyGuard {
                _master: pair.master,
                child,
            }),
        })
    }
}

impl Default for NativePty {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shell() {
        let shell = default_shell();
        assert!(!shell.is_empty());

        #[cfg(windows)]
        assert!(shell.ends_with(".exe"));
    }

    // PTY allocation is not available in every CI sandbox.
    #[tokio::test]
    #[ignore]
    #[cfg(unix)]
    async fn test_spawn_and_read() {
        use std::time::Duration;

        let spec = ShellSpec::new("/bin/sh", std::env::temp_dir());
        let mut io = NativePty::new().spawn_attached(&spec).unwrap();
        assert!(io.pid > 0);

        io.input
            .send(b"echo SHELL_BRIDGE_PTY_TEST; exit\n".to_vec())
            .await
            .unwrap();

        let mut output = Vec::new();
        while let Ok(Some(chunk)) =
            tokio::time::timeout(Duration::from_secs(5), io.output.recv()).await
        {
            output.extend(chunk);
        }

        assert!(String::from_utf8_lossy(&output).contains("SHELL_BRIDGE_PTY_TEST"));
    }
}
