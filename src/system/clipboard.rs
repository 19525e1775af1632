// src/system/clipboard.rs

//! Clipboard access.
//!
//! On Linux the clipboard contents are owned by a process and vanish when it exits.
//! `q` exits right after answering, so the text is handed to a detached `q` child
//! (started with `Q_CLIPBOARD_DAEMON` set) that keeps serving it until something
//! else is copied.

use crate::constants::CLIPBOARD_DAEMON_ENV;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(#[from] arboard::Error),
    #[error("Could not hand the clipboard over to a background process: {0}")]
    Io(#[from] io::Error),
}

/// Whether this process was started to own the clipboard.
pub fn is_daemon() -> bool {
    std::env::var_os(CLIPBOARD_DAEMON_ENV).is_some()
}

/// Places `text` on the clipboard so that it outlives this process.
#[cfg(target_os = "linux")]
pub fn copy(text: &str) -> Result<(), ClipboardError> {
    use std::io::Write;
    use std::process::{Command, Stdio};

    // The child is never waited on: it must outlive this process.
    #[allow(clippy::zombie_processes)]
    let mut child = Command::new(std::env::current_exe()?)
        .env(CLIPBOARD_DAEMON_ENV, "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    log::debug!("Clipboard handed to process {}", child.id());

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(text.as_bytes())?;
    }
    Ok(())
}

/// Places `text` on the clipboard.
#[cfg(not(target_os = "linux"))]
pub fn copy(text: &str) -> Result<(), ClipboardError> {
    arboard::Clipboard::new()?.set_text(text)?;
    Ok(())
}

/// Reads the text from stdin, takes ownership of the clipboard and serves it
/// until another program replaces the contents.
#[cfg(target_os = "linux")]
pub fn serve_from_stdin() -> Result<(), ClipboardError> {
    use arboard::SetExtLinux;
    use std::io::Read;

    let mut text = String::new();
    io::stdin().read_to_string(&mut text)?;
    arboard::Clipboard::new()?.set().wait().text(text)?;
    Ok(())
}

/// Other platforms keep clipboard contents after the owner exits; nothing to serve.
#[cfg(not(target_os = "linux"))]
pub fn serve_from_stdin() -> Result<(), ClipboardError> {
    Ok(())
}
