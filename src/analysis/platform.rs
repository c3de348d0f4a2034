//! Target platform description: the bit sizes of the integer types.

use crate::analysis::analysis_result::{ConfigError, Result};
use az::CheckedAs;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformKind {
    /// The host running the analysis
    Native,
    Unspecified,
    Unix32,
    Unix64,
    Win32A,
    Win32W,
    Win64,
    /// Loaded from a platform file
    File,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Platform {
    pub kind: PlatformKind,
    pub char_bit: u8,
    pub short_bit: u8,
    pub int_bit: u8,
    pub long_bit: u8,
    pub long_long_bit: u8,
}

impl Default for Platform {
    fn default() -> Self {
        Self::native()
    }
}

impl Platform {
    fn with_sizes(kind: PlatformKind, sizes: [u8; 5]) -> Self {
        Self {
            kind,
            char_bit: sizes[0],
            short_bit: sizes[1],
            int_bit: sizes[2],
            long_bit: sizes[3],
            long_long_bit: sizes[4],
        }
    }

    fn host_sizes() -> [u8; 5] {
        use std::mem::size_of;
        use std::os::raw::{c_char, c_int, c_long, c_longlong, c_short};
        [
            (size_of::<c_char>() * 8) as u8,
            (size_of::<c_short>() * 8) as u8,
            (size_of::<c_int>() * 8) as u8,
            (size_of::<c_long>() * 8) as u8,
            (size_of::<c_longlong>() * 8) as u8,
        ]
    }

    pub fn native() -> Self {
        Self::with_sizes(PlatformKind::Native, Self::host_sizes())
    }

    pub fn unspecified() -> Self {
        Self::with_sizes(PlatformKind::Unspecified, Self::host_sizes())
    }

    pub fn unix32() -> Self {
        Self::with_sizes(PlatformKind::Unix32, [8, 16, 32, 32, 64])
    }

    pub fn unix64() -> Self {
        Self::with_sizes(PlatformKind::Unix64, [8, 16, 32, 64, 64])
    }

    pub fn win32a() -> Self {
        Self::with_sizes(PlatformKind::Win32A, [8, 16, 32, 32, 64])
    }

    pub fn win32w() -> Self {
        Self::with_sizes(PlatformKind::Win32W, [8, 16, 32, 32, 64])
    }

    pub fn win64() -> Self {
        Self::with_sizes(PlatformKind::Win64, [8, 16, 32, 32, 64])
    }

    /// Resolve a preset by name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "native" => Ok(Self::native()),
            "unspecified" => Ok(Self::unspecified()),
            "unix32" => Ok(Self::unix32()),
            "unix64" => Ok(Self::unix64()),
            "win32A" => Ok(Self::win32a()),
            "win32W" => Ok(Self::win32w()),
            "win64" => Ok(Self::win64()),
            _ => Err(ConfigError::UnknownPlatform(name.to_owned()).into()),
        }
    }

    /// Parse a platform description such as
    /// `{"char_bit": 8, "short_bit": 16, "int_bit": 32, "long_bit": 64, "long_long_bit": 64}`
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ConfigError::MalformedPlatform(e.to_string()))?;
        let object = value
            .as_object()
            .ok_or_else(|| ConfigError::MalformedPlatform("expected a JSON object".to_owned()))?;

        let field = |name: &str| -> Result<u8> {
            let bits = object
                .get(name)
                .and_then(Value::as_u64)
                .ok_or_else(|| ConfigError::MalformedPlatform(format!("missing field {}", name)))?;
            match bits.checked_as::<u8>() {
                Some(bits) if bits > 0 => Ok(bits),
                _ => Err(ConfigError::MalformedPlatform(format!(
                    "{} = {} is not a valid bit size",
                    name, bits
                ))
                .into()),
            }
        };

        let platform = Self::with_sizes(
            PlatformKind::File,
            [
                field("char_bit")?,
                field("short_bit")?,
                field("int_bit")?,
                field("long_bit")?,
                field("long_long_bit")?,
            ],
        );
        debug!("Loaded platform {:?}", platform);
        Ok(platform)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ConfigError::UnreadablePlatformFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&text)
    }

    /// Type ranges are only meaningful when the target was chosen explicitly
    pub fn has_known_type_ranges(&self) -> bool {
        !matches!(self.kind, PlatformKind::Native | PlatformKind::Unspecified)
    }
}
