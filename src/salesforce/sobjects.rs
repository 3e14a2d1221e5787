use serde::{Deserialize, Serialize};

/// `PermissionSetGroupComponent` row linking a permission set to a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionSetGroupLink {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "PermissionSetId")]
    pub permission_set_id: String,
    #[serde(rename = "PermissionSetGroupId")]
    pub permission_set_group_id: String,
    /// Group names from the `PermissionSetGroup` relationship, when selected.
    #[serde(rename = "PermissionSetGroup", default)]
    pub permission_set_group: Option<PermissionSetGroupName>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionSetGroupName {
    #[serde(rename = "DeveloperName", default)]
    pub developer_name: Option<String>,
    #[serde(rename = "MasterLabel", default)]
    pub master_label: Option<String>,
}

/// What a `PermissionSetAssignment` grants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssignmentTarget {
    PermissionSet(String),
    PermissionSetGroup(String),
}

/// `PermissionSetAssignment` row.
///
/// Rows for group assignments also carry the group's aggregate permission set
/// id, so a populated group id takes precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AssignmentRow", into = "AssignmentRow")]
pub struct Assignment {
    pub assignee_id: String,
    pub target: AssignmentTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssignmentRow {
    #[serde(rename = "AssigneeId")]
    assignee_id: String,
    #[serde(rename = "PermissionSetId", default)]
    permission_set_id: Option<String>,
    #[serde(rename = "PermissionSetGroupId", default)]
    permission_set_group_id: Option<String>,
}

impl TryFrom<AssignmentRow> for Assignment {
    type Error = String;

    fn try_from(row: AssignmentRow) -> Result<Self, Self::Error> {
        let non_empty = |id: Option<String>| id.filter(|id| !id.is_empty());

        let target = match (
            non_empty(row.permission_set_group_id),
            non_empty(row.permission_set_id),
        ) {
            (Some(group_id), _) => AssignmentTarget::PermissionSetGroup(group_id),
            (None, Some(permission_set_id)) => AssignmentTarget::PermissionSet(permission_set_id),
            (None, None) => {
                return Err(format!(
                    "Assignment for {} has neither PermissionSetId nor PermissionSetGroupId",
                    row.assignee_id
                ));
            }
        };

        Ok(Assignment {
            assignee_id: row.assignee_id,
            target,
        })
    }
}

impl From<Assignment> for AssignmentRow {
    fn from(assignment: Assignment) -> Self {
        let (permission_set_id, permission_set_group_id) = match assignment.target {
            AssignmentTarget::PermissionSet(id) => (Some(id), None),
            AssignmentTarget::PermissionSetGroup(id) => (None, Some(id)),
        };
        AssignmentRow {
            assignee_id: assignment.assignee_id,
            permission_set_id,
            permission_set_group_id,
        }
    }
}

/// `User` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "ProfileId", default)]
    pub profile_id: Option<String>,
}
