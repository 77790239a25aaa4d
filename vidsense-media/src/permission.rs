//! Camera permission gate
//!
//! Some platforms only reveal device labels after a real media acquisition has been
//! granted. On those platforms the gate acquires a throwaway stream and stops every track
//! immediately before the catalog enumerates. A platform that answers the permission
//! query with [`MediaError::UnsupportedPlatform`] is probed when it needs labels and
//! enumerated directly otherwise.

use crate::error::{MediaError, MediaResult};
use crate::platform::{MediaConstraints, MediaDevices, PermissionState};
use tracing::{debug, info, warn};

/// Where the gate currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Nothing checked yet
    Unknown,
    /// Permission confirmed; enumeration may proceed
    Granted,
    /// Permission must be obtained through an acquire-then-release probe
    MustProbe,
    /// The last check failed; the user has to re-trigger
    Failed,
}

/// How permission was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionOutcome {
    /// The platform already reported the permission as granted
    Granted,
    /// Permission was obtained by acquiring and releasing a probe stream
    GrantedAfterProbe,
}

/// Permission state machine run before every device enumeration
#[derive(Debug)]
pub struct PermissionGate {
    state: GateState,
}

impl Default for PermissionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionGate {
    /// Create a gate in the `Unknown` state
    pub fn new() -> Self {
        Self {
            state: GateState::Unknown,
        }
    }

    /// Current gate state
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Make sure enumeration will see usable device information
    pub async fn ensure(&mut self, platform: &dyn MediaDevices) -> MediaResult<PermissionOutcome> {
        if self.state == GateState::Granted {
            return Ok(PermissionOutcome::Granted);
        }

        self.state = match platform.query_permission().await {
            Ok(PermissionState::Granted) => GateState::Granted,
            Ok(_) if platform.requires_probe() => GateState::MustProbe,
            Ok(PermissionState::Prompt) => GateState::Granted,
            Ok(PermissionState::Denied) => {
                self.state = GateState::Failed;
                return Err(MediaError::PermissionDenied {
                    operation: "camera access".to_string(),
                });
            }
            Err(MediaError::UnsupportedPlatform { platform: api })
                if !platform.requires_probe() =>
            {
                debug!("{} cannot report permission state; enumerating directly", api);
                GateState::Granted
            }
            Err(e) if platform.requires_probe() => {
                debug!("Permission query unavailable ({}), probing instead", e);
                GateState::MustProbe
            }
            Err(e) => {
                self.state = GateState::Failed;
                return Err(e);
            }
        };

        if self.state == GateState::Granted {
            return Ok(PermissionOutcome::Granted);
        }

        match self.probe(platform).await {
            Ok(()) => {
                self.state = GateState::Granted;
                Ok(PermissionOutcome::GrantedAfterProbe)
            }
            Err(e) => {
                self.state = GateState::Failed;
                Err(e)
            }
        }
    }

    /// Forget the cached result; the next `ensure` queries again
    pub fn reset(&mut self) {
        self.state = GateState::Unknown;
    }

    async fn probe(&self, platform: &dyn MediaDevices) -> MediaResult<()> {
        let stream = platform
            .get_user_media(MediaConstraints::any_video())
            .await
            .map_err(|e| match e {
                MediaError::PermissionDenied { .. } => e,
                other => MediaError::PermissionDenied {
                    operation: format!("camera probe: {}", other),
                },
            })?;

        // Release right away; the probe only exists to unlock device labels
        for failure in stream.stop_all() {
            warn!("Probe track release failed: {}", failure);
        }
        info!("Camera permission obtained through probe stream {}", stream.id());
        Ok(())
    }
}
