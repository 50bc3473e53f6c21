//! Microphone Permission
//!
//! Before a session opens, the controller asks for audio capture. The terminal
//! has no permission dialog, so [`DeviceMicrophone`] asks the operating system
//! instead: a capture device node the user may not open counts as a refusal,
//! and a machine without any capture node counts as unavailable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::MicrophonePolicy;
use crate::error::CaptureError;

/// Default ALSA device directory
pub const DEFAULT_DEVICE_DIR: &str = "/dev/snd";

/// Audio capture permission source
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Ask for capture access
    async fn request_capture(&self) -> Result<(), CaptureError>;
}

#[async_trait]
impl<M: Microphone + ?Sized> Microphone for Box<M> {
    async fn request_capture(&self) -> Result<(), CaptureError> {
        (**self).request_capture().await
    }
}

/// Always grants or always refuses
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedMicrophone {
    granted: bool,
}

impl FixedMicrophone {
    /// Always grant
    pub fn allow() -> Self {
        Self { granted: true }
    }

    /// Always refuse
    pub fn deny() -> Self {
        Self { granted: false }
    }
}

#[async_trait]
impl Microphone for FixedMicrophone {
    async fn request_capture(&self) -> Result<(), CaptureError> {
        if self.granted {
            Ok(())
        } else {
            Err(CaptureError::Denied("microphone disabled by configuration".into()))
        }
    }
}

/// Probes capture device nodes (`pcmC<card>D<device>c`)
#[derive(Clone, Debug)]
pub struct DeviceMicrophone {
    device_dir: PathBuf,
}

impl DeviceMicrophone {
    /// Probe the default device directory
    pub fn new() -> Self {
        Self::with_device_dir(DEFAULT_DEVICE_DIR)
    }

    /// Probe a specific directory
    pub fn with_device_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            device_dir: dir.into(),
        }
    }
}

impl Default for DeviceMicrophone {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Microphone for DeviceMicrophone {
    async fn request_capture(&self) -> Result<(), CaptureError> {
        let dir = self.device_dir.clone();
        let result = tokio::task::spawn_blocking(move || probe_capture(&dir))
            .await
            .map_err(|e| CaptureError::Unavailable(format!("probe task failed: {e}")))?;

        match &result {
            Ok(()) => tracing::debug!("Microphone capture granted"),
            Err(e) => tracing::warn!(error = %e, "Microphone capture refused"),
        }
        result
    }
}

/// Whether a device file name is an ALSA capture node
pub fn is_capture_node(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("pcmC") else {
        return false;
    };
    let Some(rest) = rest.strip_suffix('c') else {
        return false;
    };
    match rest.split_once('D') {
        Some((card, device)) => {
            !card.is_empty()
                && !device.is_empty()
                && card.chars().all(|c| c.is_ascii_digit())
                && device.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn probe_capture(dir: &Path) -> Result<(), CaptureError> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        CaptureError::Unavailable(format!("cannot list {}: {e}", dir.display()))
    })?;

    let mut nodes: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_str().is_some_and(is_capture_node))
        .map(|entry| entry.path())
        .collect();
    nodes.sort();

    if nodes.is_empty() {
        return Err(CaptureError::Unavailable(format!(
            "no capture device in {}",
            dir.display()
        )));
    }

    let mut denied = None;
    for node in &nodes {
        match check_access(node) {
            Ok(()) => return Ok(()),
            Err(err) if is_permission_error(&err) => {
                denied = Some(format!("{}: {err}", node.display()));
            }
            Err(err) => {
                tracing::debug!(node = %node.display(), error = %err, "Capture node unusable");
            }
        }
    }

    Err(match denied {
        Some(reason) => CaptureError::Denied(reason),
        None => CaptureError::Unavailable("no usable capture device".into()),
    })
}

fn is_permission_error(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::PermissionDenied
}

#[cfg(unix)]
fn check_access(path: &Path) -> std::io::Result<()> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    // SAFETY: c_path is a valid NUL-terminated string for the call's duration
    let rc = unsafe { libc::access(c_path.as_ptr(), libc::R_OK | libc::W_OK) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(unix))]
fn check_access(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Build the microphone for a configured policy
pub fn microphone_for(policy: MicrophonePolicy) -> Box<dyn Microphone> {
    match policy {
        MicrophonePolicy::Device => Box::new(DeviceMicrophone::new()),
        MicrophonePolicy::Allow => Box::new(FixedMicrophone::allow()),
        MicrophonePolicy::Deny => Box::new(FixedMicrophone::deny()),
    }
}
