//! Device enumeration records and panel-based selection.
//!
//! Cameras report which enclosure panel they are mounted on. Selection
//! prefers a configured panel and degrades to the first device found,
//! so a desktop webcam still works when no rear camera exists.

use serde::{Deserialize, Serialize};

/// Enclosure panel a camera is mounted on.
///
/// External cameras (USB webcams) report no enclosure location and
/// are represented as [`Panel::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    /// Screen side of the device.
    Front,
    /// Side opposite the screen.
    Back,
    /// Top edge.
    Top,
    /// Bottom edge.
    Bottom,
    /// Left edge.
    Left,
    /// Right edge.
    Right,
    /// No enclosure location reported.
    Unknown,
}

/// Identity and placement of a single video capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Backend-specific identifier, stable across enumerations.
    pub id: String,
    /// Human-readable device name.
    pub name: String,
    /// Enclosure panel the device is mounted on.
    pub panel: Panel,
}

impl DeviceInfo {
    /// Returns true if the device reports no enclosure location.
    ///
    /// External devices manage their own orientation, so preview
    /// rotation correction is skipped for them.
    pub fn is_external(&self) -> bool {
        self.panel == Panel::Unknown
    }

    /// Returns true if the device faces the user.
    pub fn is_front(&self) -> bool {
        self.panel == Panel::Front
    }
}

/// Selects a capture device, preferring the given panel.
///
/// Returns the first device mounted on `preferred`, or the first
/// device overall when none matches, or `None` when the list is empty.
pub fn select_device(devices: &[DeviceInfo], preferred: Panel) -> Option<&DeviceInfo> {
    devices
        .iter()
        .find(|d| d.panel == preferred)
        .or_else(|| devices.first())
}
