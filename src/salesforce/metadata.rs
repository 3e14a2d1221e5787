use std::fmt;
use std::ops::BitOrAssign;

use serde::{Deserialize, Deserializer, Serialize};

/// Metadata types that carry object permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataType {
    Profile,
    PermissionSet,
}

impl MetadataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataType::Profile => "Profile",
            MetadataType::PermissionSet => "PermissionSet",
        }
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a metadata listing.
///
/// `full_name` is namespace-qualified (`ns__Name`) for managed records, so it
/// is unique per type. `id` is what reads are issued against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataListing {
    pub full_name: String,
    pub id: String,
}

/// A Profile or Permission Set as read from the metadata endpoint.
///
/// The read does not return the record id; it stays with the listing the
/// record was read for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub full_name: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub object_permissions: Vec<ObjectPermission>,
}

impl MetadataRecord {
    /// Permissions for `object_name`, if the record mentions it at all.
    pub fn permissions_for(&self, object_name: &str) -> Option<&ObjectPermission> {
        self.object_permissions
            .iter()
            .find(|permission| permission.object == object_name)
    }
}

/// Flags for one object inside a Profile or Permission Set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPermission {
    pub object: String,
    #[serde(flatten)]
    pub flags: ObjectPermissionFlags,
}

/// The six object-level permission flags.
///
/// The metadata API sends these as the strings `"true"`/`"false"`. They are
/// normalized here; only `"true"` or a JSON `true` counts as granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPermissionFlags {
    #[serde(default, deserialize_with = "flag")]
    pub allow_create: bool,
    #[serde(default, deserialize_with = "flag")]
    pub allow_delete: bool,
    #[serde(default, deserialize_with = "flag")]
    pub allow_edit: bool,
    #[serde(default, deserialize_with = "flag")]
    pub allow_read: bool,
    #[serde(default, deserialize_with = "flag")]
    pub modify_all_records: bool,
    #[serde(default, deserialize_with = "flag")]
    pub view_all_records: bool,
}

impl ObjectPermissionFlags {
    /// True if any of the six flags is granted.
    pub fn any(&self) -> bool {
        self.allow_create
            || self.allow_delete
            || self.allow_edit
            || self.allow_read
            || self.modify_all_records
            || self.view_all_records
    }
}

impl BitOrAssign<&ObjectPermissionFlags> for ObjectPermissionFlags {
    fn bitor_assign(&mut self, other: &ObjectPermissionFlags) {
        self.allow_create |= other.allow_create;
        self.allow_delete |= other.allow_delete;
        self.allow_edit |= other.allow_edit;
        self.allow_read |= other.allow_read;
        self.modify_all_records |= other.modify_all_records;
        self.view_all_records |= other.view_all_records;
    }
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawFlag {
        Bool(bool),
        Text(String),
    }

    Ok(match Option::<RawFlag>::deserialize(deserializer)? {
        Some(RawFlag::Bool(value)) => value,
        Some(RawFlag::Text(value)) => value == "true",
        None => false,
    })
}

// The metadata read collapses single-element lists into a bare object.
fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(values)) => values,
        Some(OneOrMany::One(value)) => vec![value],
        None => vec![],
    })
}
