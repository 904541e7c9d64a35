//! Volume references: named image artifacts with orientation and voxel grid.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Canonical preprocessed volumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VolumeName {
    /// Bias-corrected FLAIR in its native space
    #[serde(rename = "FLAIR")]
    Flair,
    /// T1 aligned to FLAIR and resampled onto FLAIR's grid
    #[serde(rename = "T1")]
    T1,
    /// T1 aligned to FLAIR at its original resolution
    #[serde(rename = "3DT1")]
    T1Native,
}

impl VolumeName {
    pub fn as_str(self) -> &'static str {
        match self {
            VolumeName::Flair => "FLAIR",
            VolumeName::T1 => "T1",
            VolumeName::T1Native => "3DT1",
        }
    }

    /// File name inside `proc/pre`
    pub fn file_name(self) -> String {
        format!("{}.nii.gz", self.as_str())
    }
}

impl fmt::Display for VolumeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-letter axis orientation code (AFNI convention, e.g. `RPI`)
///
/// Each letter names the direction the axis points *from*; the three axes
/// must cover R/L, A/P and I/S exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation([u8; 3]);

impl Orientation {
    /// Canonical T1 orientation
    pub const LPI: Orientation = Orientation(*b"LPI");
    /// Canonical FLAIR orientation
    pub const RPI: Orientation = Orientation(*b"RPI");

    pub fn as_str(&self) -> &str {
        // Only ASCII letters are ever stored.
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        let bytes = code.as_bytes();
        if bytes.len() != 3 {
            return Err(format!("orientation code must have 3 letters, got '{code}'"));
        }

        let axis = |c: u8| match c {
            b'R' | b'L' => Some(0),
            b'A' | b'P' => Some(1),
            b'I' | b'S' => Some(2),
            _ => None,
        };
        let mut seen = [false; 3];
        for &c in bytes {
            let a = axis(c).ok_or_else(|| format!("invalid orientation letter in '{code}'"))?;
            if seen[a] {
                return Err(format!("orientation '{code}' repeats an axis"));
            }
            seen[a] = true;
        }

        Ok(Orientation([bytes[0], bytes[1], bytes[2]]))
    }
}

impl Serialize for Orientation {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Orientation {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Voxel spacing in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Spacing {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Volume of one voxel in µl (mm³)
    pub fn voxel_volume_ul(&self) -> f64 {
        self.x * self.y * self.z
    }
}

impl FromStr for Spacing {
    type Err = String;

    /// Parses whitespace-separated axis sizes, as printed by `3dinfo -ad3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split_whitespace()
            .map(|v| v.parse::<f64>().map_err(|e| format!("bad voxel size '{v}': {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        match values.as_slice() {
            [x, y, z] if *x > 0.0 && *y > 0.0 && *z > 0.0 => Ok(Spacing::new(*x, *y, *z)),
            [_, _, _] => Err(format!("voxel sizes must be positive, got '{}'", s.trim())),
            _ => Err(format!("expected 3 voxel sizes, got '{}'", s.trim())),
        }
    }
}

/// Orientation and spacing of a volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub orientation: Orientation,
    pub spacing: Spacing,
}

/// Named image artifact on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRef {
    pub name: VolumeName,
    pub path: PathBuf,
    /// Known only when the volume was produced during this run
    pub geometry: Option<Geometry>,
}

impl VolumeRef {
    pub fn new(name: VolumeName, path: impl Into<PathBuf>) -> Self {
        Self {
            name,
            path: path.into(),
            geometry: None,
        }
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }
}
