//! ArFS tag vocabulary.
//!
//! Tag names are mapped through the closed [`KnownTag`] set. Anything outside
//! it is kept verbatim as an unknown tag by the caller instead of being
//! assigned to a field by name.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Tags understood by the state reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownTag {
    AppName,
    AppVersion,
    AppPlatform,
    ArFs,
    ContentType,
    EntityType,
    DriveId,
    FolderId,
    FileId,
    ParentFolderId,
    DrivePrivacy,
    DriveAuthMode,
    Cipher,
    CipherIv,
    UnixTime,
}

impl KnownTag {
    pub const ALL: [Self; 15] = [
        Self::AppName,
        Self::AppVersion,
        Self::AppPlatform,
        Self::ArFs,
        Self::ContentType,
        Self::EntityType,
        Self::DriveId,
        Self::FolderId,
        Self::FileId,
        Self::ParentFolderId,
        Self::DrivePrivacy,
        Self::DriveAuthMode,
        Self::Cipher,
        Self::CipherIv,
        Self::UnixTime,
    ];

    /// Tag name as written on the ledger.
    pub const fn name(self) -> &'static str {
        match self {
            Self::AppName => "App-Name",
            Self::AppVersion => "App-Version",
            Self::AppPlatform => "App-Platform",
            Self::ArFs => "ArFS",
            Self::ContentType => "Content-Type",
            Self::EntityType => "Entity-Type",
            Self::DriveId => "Drive-Id",
            Self::FolderId => "Folder-Id",
            Self::FileId => "File-Id",
            Self::ParentFolderId => "Parent-Folder-Id",
            Self::DrivePrivacy => "Drive-Privacy",
            Self::DriveAuthMode => "Drive-Auth-Mode",
            Self::Cipher => "Cipher",
            Self::CipherIv => "Cipher-IV",
            Self::UnixTime => "Unix-Time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tag| tag.name() == name)
    }
}

impl fmt::Display for KnownTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of ArFS entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Drive,
    Folder,
    File,
}

impl EntityKind {
    /// Value of the `Entity-Type` tag.
    pub const fn as_tag_value(self) -> &'static str {
        match self {
            Self::Drive => "drive",
            Self::Folder => "folder",
            Self::File => "file",
        }
    }

    /// Tag carrying this kind's identifier.
    pub const fn id_tag(self) -> KnownTag {
        match self {
            Self::Drive => KnownTag::DriveId,
            Self::Folder => KnownTag::FolderId,
            Self::File => KnownTag::FileId,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag_value())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drive" => Ok(Self::Drive),
            "folder" => Ok(Self::Folder),
            "file" => Ok(Self::File),
            other => Err(format!(
                "unknown entity kind '{other}' (expected drive, folder or file)"
            )),
        }
    }
}

/// Whether an entity's metadata is readable without keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Privacy {
    #[default]
    Public,
    Private,
}

impl Privacy {
    /// Private if `Drive-Privacy` is `private` or any cipher is declared.
    pub fn derive(drive_privacy: Option<&str>, cipher: Option<&str>) -> Self {
        if drive_privacy.is_some_and(|p| p.eq_ignore_ascii_case("private")) || cipher.is_some() {
            Self::Private
        } else {
            Self::Public
        }
    }

    pub const fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }
}

impl fmt::Display for Privacy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => f.write_str("public"),
            Self::Private => f.write_str("private"),
        }
    }
}
