//! Host process inspection.

use crate::error::{Result, WardenError};
use std::process::Command;

/// Looks up a process's command line on the host.
///
/// The verifier only needs one question answered: does `pid` exist, and
/// if so what is it running. Tests substitute a fake.
pub trait ProcessProbe: Send + Sync {
    /// The command line of `pid`, or `None` when no such process exists.
    ///
    /// Fails only when the host cannot be inspected at all.
    fn command_line(&self, pid: u32) -> Result<Option<String>>;
}

impl<P: ProcessProbe + ?Sized> ProcessProbe for Box<P> {
    fn command_line(&self, pid: u32) -> Result<Option<String>> {
        (**self).command_line(pid)
    }
}

/// Probe backed by `/proc` where available, `ps` elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProcessProbe;

impl ProcessProbe for HostProcessProbe {
    fn command_line(&self, pid: u32) -> Result<Option<String>> {
        if pid == 0 {
            return Ok(None);
        }

        let proc_root = std::path::Path::new("/proc");
        if proc_root.join("self").exists() {
            return Ok(proc_command_line(&proc_root.join(pid.to_string())));
        }

        ps_command_line(pid)
    }
}

fn proc_command_line(dir: &std::path::Path) -> Option<String> {
    let raw = std::fs::read(dir.join("cmdline")).ok()?;
    let args: Vec<String> = raw
        .split(|b| *b == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect();

    if args.is_empty() {
        // Kernel threads and zombies have an empty cmdline but still exist.
        return std::fs::read_to_string(dir.join("comm"))
            .ok()
            .map(|comm| comm.trim().to_string());
    }
    Some(args.join(" "))
}

fn ps_command_line(pid: u32) -> Result<Option<String>> {
    let output = Command::new("ps")
        .args(["-p", &pid.to_string(), "-o", "command="])
        .output()
        .map_err(|e| WardenError::VerifierError(format!("failed to run ps: {}", e)))?;

    if !output.status.success() {
        return Ok(None);
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
}
