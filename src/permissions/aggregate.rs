use std::collections::HashMap;

use serde::Serialize;

use crate::permissions::resolver::ResolvedPermissions;
use crate::salesforce::metadata::ObjectPermissionFlags;
use crate::salesforce::sobjects::{Assignment, AssignmentTarget, PermissionSetGroupLink, User};

/// One exported row: a user and the union of everything they were granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedUserPermission {
    pub id: String,
    pub username: String,
    pub allow_create: bool,
    pub allow_delete: bool,
    pub allow_edit: bool,
    pub allow_read: bool,
    pub modify_all_records: bool,
    pub view_all_records: bool,
}

impl AggregatedUserPermission {
    pub fn new(user: &User, flags: ObjectPermissionFlags) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            allow_create: flags.allow_create,
            allow_delete: flags.allow_delete,
            allow_edit: flags.allow_edit,
            allow_read: flags.allow_read,
            modify_all_records: flags.modify_all_records,
            view_all_records: flags.view_all_records,
        }
    }

    pub fn flags(&self) -> ObjectPermissionFlags {
        ObjectPermissionFlags {
            allow_create: self.allow_create,
            allow_delete: self.allow_delete,
            allow_edit: self.allow_edit,
            allow_read: self.allow_read,
            modify_all_records: self.modify_all_records,
            view_all_records: self.view_all_records,
        }
    }
}

/// Lookups built once per aggregation.
struct GrantIndex<'a> {
    profiles: HashMap<&'a str, &'a ObjectPermissionFlags>,
    permission_sets: HashMap<&'a str, &'a ObjectPermissionFlags>,
    groups: HashMap<&'a str, Vec<&'a PermissionSetGroupLink>>,
    assignments: HashMap<&'a str, Vec<&'a Assignment>>,
}

impl<'a> GrantIndex<'a> {
    fn build(resolved: &'a ResolvedPermissions) -> Self {
        let profiles = resolved
            .profiles
            .iter()
            .map(|p| (p.id.as_str(), &p.flags))
            .collect();
        let permission_sets = resolved
            .permission_sets
            .iter()
            .map(|p| (p.id.as_str(), &p.flags))
            .collect();

        let mut groups: HashMap<&str, Vec<&PermissionSetGroupLink>> = HashMap::new();
        for link in &resolved.groups {
            groups
                .entry(link.permission_set_group_id.as_str())
                .or_default()
                .push(link);
        }

        let mut assignments: HashMap<&str, Vec<&Assignment>> = HashMap::new();
        for assignment in &resolved.assignments {
            assignments
                .entry(assignment.assignee_id.as_str())
                .or_default()
                .push(assignment);
        }

        Self {
            profiles,
            permission_sets,
            groups,
            assignments,
        }
    }

    fn flags_for(&self, user: &User) -> ObjectPermissionFlags {
        let mut flags = ObjectPermissionFlags::default();

        if let Some(profile) = user
            .profile_id
            .as_deref()
            .and_then(|id| self.profiles.get(id))
        {
            flags |= *profile;
        }

        for assignment in self.assignments.get(user.id.as_str()).into_iter().flatten() {
            match &assignment.target {
                AssignmentTarget::PermissionSetGroup(group_id) => {
                    for link in self.groups.get(group_id.as_str()).into_iter().flatten() {
                        if let Some(permission_set) =
                            self.permission_sets.get(link.permission_set_id.as_str())
                        {
                            flags |= *permission_set;
                        }
                    }
                }
                AssignmentTarget::PermissionSet(permission_set_id) => {
                    if let Some(permission_set) = self.permission_sets.get(permission_set_id.as_str()) {
                        flags |= *permission_set;
                    }
                }
            }
        }

        flags
    }
}

/// Merge every grant into one row per distinct user id, in first-seen order.
///
/// A user listed more than once is OR-merged into the same row, so repeating
/// the inputs never changes the output.
pub fn aggregate(resolved: &ResolvedPermissions, users: &[User]) -> Vec<AggregatedUserPermission> {
    let index = GrantIndex::build(resolved);

    let mut rows: Vec<AggregatedUserPermission> = vec![];
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for user in users {
        let flags = index.flags_for(user);
        match positions.get(user.id.as_str()) {
            Some(&position) => {
                let mut merged = rows[position].flags();
                merged |= &flags;
                rows[position] = AggregatedUserPermission::new(user, merged);
            }
            None => {
                positions.insert(user.id.as_str(), rows.len());
                rows.push(AggregatedUserPermission::new(user, flags));
            }
        }
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::resolver::GrantedPermission;

    fn user(id: &str, profile_id: Option<&str>) -> User {
        User {
            id: id.to_string(),
            username: format!("{}@example.com", id),
            profile_id: profile_id.map(str::to_string),
        }
    }

    fn granted(id: &str, flags: ObjectPermissionFlags) -> GrantedPermission {
        GrantedPermission {
            id: id.to_string(),
            object: "Account".to_string(),
            flags,
        }
    }

    fn read_only() -> ObjectPermissionFlags {
        ObjectPermissionFlags {
            allow_read: true,
            ..Default::default()
        }
    }

    fn assignment(assignee: &str, target: AssignmentTarget) -> Assignment {
        Assignment {
            assignee_id: assignee.to_string(),
            target,
        }
    }

    fn sample() -> ResolvedPermissions {
        ResolvedPermissions {
            profiles: vec![granted("00eADMIN", read_only())],
            permission_sets: vec![
                granted(
                    "0PSEDIT",
                    ObjectPermissionFlags {
                        allow_edit: true,
                        ..Default::default()
                    },
                ),
                granted(
                    "0PSVIEWALL",
                    ObjectPermissionFlags {
                        view_all_records: true,
                        ..Default::default()
                    },
                ),
            ],
            groups: vec![PermissionSetGroupLink {
                id: "0PC1".to_string(),
                permission_set_id: "0PSVIEWALL".to_string(),
                permission_set_group_id: "0PGSALES".to_string(),
                permission_set_group: None,
            }],
            assignments: vec![
                assignment("005B", AssignmentTarget::PermissionSet("0PSEDIT".to_string())),
                assignment(
                    "005C",
                    AssignmentTarget::PermissionSetGroup("0PGSALES".to_string()),
                ),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_profile_only_user() {
        let resolved = ResolvedPermissions {
            profiles: vec![granted("00eSYSADMIN", read_only())],
            ..Default::default()
        };
        let rows = aggregate(&resolved, &[user("005A", Some("00eSYSADMIN"))]);

        assert_eq!(
            rows,
            vec![AggregatedUserPermission {
                id: "005A".to_string(),
                username: "005A@example.com".to_string(),
                allow_create: false,
                allow_delete: false,
                allow_edit: false,
                allow_read: true,
                modify_all_records: false,
                view_all_records: false,
            }]
        );
    }

    #[test]
    fn test_sources_are_or_merged() {
        let rows = aggregate(
            &sample(),
            &[
                user("005A", Some("00eADMIN")),
                user("005B", Some("00eADMIN")),
                user("005C", None),
            ],
        );

        assert_eq!(rows.len(), 3);
        assert!(rows[0].allow_read && !rows[0].allow_edit);
        assert!(rows[1].allow_read && rows[1].allow_edit);
        assert!(rows[2].view_all_records && !rows[2].allow_read);
    }

    #[test]
    fn test_overselected_user_keeps_all_false_row() {
        let rows = aggregate(&sample(), &[user("005Z", Some("00eOTHER"))]);
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].flags().any());
    }

    #[test]
    fn test_group_without_granting_members_adds_nothing() {
        let mut resolved = sample();
        resolved.assignments = vec![assignment(
            "005D",
            AssignmentTarget::PermissionSetGroup("0PGUNKNOWN".to_string()),
        )];
        let rows = aggregate(&resolved, &[user("005D", None)]);
        assert!(!rows[0].flags().any());
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let users = vec![
            user("005A", Some("00eADMIN")),
            user("005B", None),
            user("005C", None),
        ];
        let once = aggregate(&sample(), &users);
        let twice = aggregate(&sample(), &users);
        assert_eq!(once, twice);

        let doubled: Vec<User> = users.iter().chain(users.iter()).cloned().collect();
        assert_eq!(aggregate(&sample(), &doubled), once);
    }

    #[test]
    fn test_additional_assignment_never_clears_flags() {
        let users = vec![user("005B", Some("00eADMIN"))];
        let before = aggregate(&sample(), &users);

        let mut resolved = sample();
        resolved.assignments.push(assignment(
            "005B",
            AssignmentTarget::PermissionSet("0PSVIEWALL".to_string()),
        ));
        let after = aggregate(&resolved, &users);

        let (before, after) = (before[0].flags(), after[0].flags());
        let mut union = before;
        union |= &after;
        assert_eq!(union, after, "every flag set before is still set");
        assert!(after.view_all_records);
    }
}
