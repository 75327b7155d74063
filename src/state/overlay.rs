//! State shown by the in-game overlay window.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Screen corner or edge the overlay is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OverlayPosition {
    #[serde(rename = "tl")]
    TopLeft,
    #[serde(rename = "tr")]
    TopRight,
    #[serde(rename = "cl")]
    CenterLeft,
    #[serde(rename = "cr")]
    CenterRight,
    #[serde(rename = "bl")]
    BottomLeft,
    #[default]
    #[serde(rename = "br")]
    BottomRight,
}

impl OverlayPosition {
    pub const ALL: [OverlayPosition; 6] = [
        OverlayPosition::TopLeft,
        OverlayPosition::TopRight,
        OverlayPosition::CenterLeft,
        OverlayPosition::CenterRight,
        OverlayPosition::BottomLeft,
        OverlayPosition::BottomRight,
    ];

    pub fn code(self) -> &'static str {
        match self {
            OverlayPosition::TopLeft => "tl",
            OverlayPosition::TopRight => "tr",
            OverlayPosition::CenterLeft => "cl",
            OverlayPosition::CenterRight => "cr",
            OverlayPosition::BottomLeft => "bl",
            OverlayPosition::BottomRight => "br",
        }
    }
}

impl fmt::Display for OverlayPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OverlayPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| format!("Unknown overlay position: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayUser {
    pub uuid: String,
    pub user_name: String,
    pub avatar_url: String,
    pub is_speaking: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayState {
    pub users: Vec<OverlayUser>,
    pub position_id: OverlayPosition,
    pub guest_count: usize,
}

/// A partial [`OverlayState`]. Present fields replace the whole field.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<OverlayUser>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_id: Option<OverlayPosition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_count: Option<usize>,
}

impl OverlayPatch {
    pub fn position(position_id: OverlayPosition) -> Self {
        Self {
            position_id: Some(position_id),
            ..Default::default()
        }
    }
}

impl OverlayState {
    /// Shallow merge: lists are replaced, never combined.
    pub fn apply(&mut self, patch: OverlayPatch) {
        if let Some(users) = patch.users {
            self.users = users;
        }
        if let Some(position_id) = patch.position_id {
            self.position_id = position_id;
        }
        if let Some(guest_count) = patch.guest_count {
            self.guest_count = guest_count;
        }
    }
}

/// Persisted overlay preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayOptions {
    pub enabled: bool,
    pub position_id: OverlayPosition,
    pub display_id: Option<usize>,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            position_id: OverlayPosition::default(),
            display_id: Some(0),
        }
    }
}
