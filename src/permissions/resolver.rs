use std::collections::{BTreeSet, HashMap};

use log::{debug, info, warn};

use crate::error::Result;
use crate::fetcher::MetadataFetcher;
use crate::salesforce::SalesforceApi;
use crate::salesforce::metadata::{MetadataListing, MetadataType, ObjectPermissionFlags};
use crate::salesforce::sobjects::{Assignment, PermissionSetGroupLink, User};
use crate::salesforce::soql::{generate_query, in_clause};

const GROUP_COMPONENT: &str = "PermissionSetGroupComponent";
const GROUP_COMPONENT_FIELDS: [&str; 5] = [
    "Id",
    "PermissionSetGroup.DeveloperName",
    "PermissionSetGroup.MasterLabel",
    "PermissionSetId",
    "PermissionSetGroupId",
];

const ASSIGNMENT: &str = "PermissionSetAssignment";
const ASSIGNMENT_FIELDS: [&str; 3] = ["PermissionSetId", "PermissionSetGroupId", "AssigneeId"];

const USER: &str = "User";
const USER_FIELDS: [&str; 3] = ["Id", "Username", "ProfileId"];

const OR: &str = " OR ";

/// `fullName -> id` for each metadata type, filled from the listings.
#[derive(Debug, Default, Clone)]
pub struct MetadataIndex {
    profiles: HashMap<String, String>,
    permission_sets: HashMap<String, String>,
}

impl MetadataIndex {
    pub fn insert(&mut self, metadata_type: MetadataType, listings: &[MetadataListing]) {
        let ids = self.ids_mut(metadata_type);
        for listing in listings {
            ids.insert(listing.full_name.clone(), listing.id.clone());
        }
    }

    pub fn id_for(&self, metadata_type: MetadataType, full_name: &str) -> Option<&str> {
        let ids = match metadata_type {
            MetadataType::Profile => &self.profiles,
            MetadataType::PermissionSet => &self.permission_sets,
        };
        ids.get(full_name).map(String::as_str)
    }

    fn ids_mut(&mut self, metadata_type: MetadataType) -> &mut HashMap<String, String> {
        match metadata_type {
            MetadataType::Profile => &mut self.profiles,
            MetadataType::PermissionSet => &mut self.permission_sets,
        }
    }
}

/// The object permissions one Profile or Permission Set grants, tagged with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantedPermission {
    pub id: String,
    pub object: String,
    pub flags: ObjectPermissionFlags,
}

/// Everything that can grant access to the target object.
#[derive(Debug, Default, Clone)]
pub struct ResolvedPermissions {
    pub index: MetadataIndex,
    pub profiles: Vec<GrantedPermission>,
    pub permission_sets: Vec<GrantedPermission>,
    pub groups: Vec<PermissionSetGroupLink>,
    pub assignments: Vec<Assignment>,
}

impl ResolvedPermissions {
    pub fn profile_ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn permission_set_ids(&self) -> Vec<&str> {
        self.permission_sets.iter().map(|p| p.id.as_str()).collect()
    }

    /// Distinct group ids, sorted.
    pub fn group_ids(&self) -> Vec<&str> {
        self.groups
            .iter()
            .map(|g| g.permission_set_group_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct assignee ids, sorted.
    pub fn assignee_ids(&self) -> Vec<&str> {
        self.assignments
            .iter()
            .map(|a| a.assignee_id.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Finds the Profiles, Permission Sets, groups and assignments granting access to an object.
pub struct PermissionResolver<'a, A> {
    fetcher: &'a MetadataFetcher<'a, A>,
}

impl<'a, A: SalesforceApi> PermissionResolver<'a, A> {
    pub fn new(fetcher: &'a MetadataFetcher<'a, A>) -> Self {
        Self { fetcher }
    }

    /// Resolve every grant for `object_name`. Any failed query aborts the resolution.
    pub async fn resolve(&self, object_name: &str) -> Result<ResolvedPermissions> {
        let mut resolved = ResolvedPermissions::default();

        resolved.profiles = self
            .granted_permissions(&mut resolved.index, MetadataType::Profile, object_name)
            .await?;
        resolved.permission_sets = self
            .granted_permissions(&mut resolved.index, MetadataType::PermissionSet, object_name)
            .await?;

        info!("Found {} profiles with access", resolved.profiles.len());
        info!(
            "Found {} permission sets with access",
            resolved.permission_sets.len()
        );

        resolved.groups = self.find_groups(&resolved).await?;
        info!("Found {} permission set groups", resolved.groups.len());
        for group in &resolved.groups {
            let name = group
                .permission_set_group
                .as_ref()
                .and_then(|g| g.developer_name.as_deref().or(g.master_label.as_deref()))
                .unwrap_or("(unnamed)");
            debug!(
                "Group {} {} contains {}",
                group.permission_set_group_id, name, group.permission_set_id
            );
        }

        resolved.assignments = self.find_assignments(&resolved).await?;

        Ok(resolved)
    }

    /// List, index and read every record of `metadata_type`, keeping those that
    /// grant anything on `object_name`.
    pub async fn granted_permissions(
        &self,
        index: &mut MetadataIndex,
        metadata_type: MetadataType,
        object_name: &str,
    ) -> Result<Vec<GrantedPermission>> {
        info!("Fetching {} metadata", metadata_type);

        let listings = self.fetcher.list(metadata_type).await?;
        index.insert(metadata_type, &listings);

        let records = self.fetcher.read_all(metadata_type, &listings).await;

        let mut granted = vec![];
        for (listing, record) in records {
            let Some(permission) = record.permissions_for(object_name) else {
                continue;
            };
            if !permission.flags.any() {
                continue;
            }
            if index.id_for(metadata_type, &listing.full_name) != Some(listing.id.as_str()) {
                warn!(
                    "{} {} is listed under more than one id; its cached read may be shared",
                    metadata_type, listing.full_name
                );
            }

            granted.push(GrantedPermission {
                id: listing.id.clone(),
                object: permission.object.clone(),
                flags: permission.flags,
            });
        }

        Ok(granted)
    }

    /// Groups containing any of the granting permission sets.
    async fn find_groups(&self, resolved: &ResolvedPermissions) -> Result<Vec<PermissionSetGroupLink>> {
        let permission_set_ids = resolved.permission_set_ids();
        info!(
            "Fetching permission set groups for {} permission sets",
            permission_set_ids.len()
        );

        let Some(predicate) = in_clause("PermissionSetId", &permission_set_ids) else {
            return Ok(vec![]);
        };
        let soql = generate_query(
            &GROUP_COMPONENT_FIELDS,
            GROUP_COMPONENT,
            Some((&vec![predicate]).into()),
            None,
            None,
        );

        self.fetcher.query(&soql).await
    }

    /// Assignments of those groups OR of the granting permission sets directly.
    async fn find_assignments(&self, resolved: &ResolvedPermissions) -> Result<Vec<Assignment>> {
        let predicates: Vec<String> = [
            in_clause("PermissionSetGroupId", &resolved.group_ids()),
            in_clause("PermissionSetId", &resolved.permission_set_ids()),
        ]
        .into_iter()
        .flatten()
        .collect();

        if predicates.is_empty() {
            return Ok(vec![]);
        }

        let where_clause = predicates.join(OR);
        let soql = generate_query(
            &ASSIGNMENT_FIELDS,
            ASSIGNMENT,
            Some((&where_clause).into()),
            None,
            None,
        );

        self.fetcher.query(&soql).await
    }

    /// Users directly assigned a grant OR holding a granting profile.
    ///
    /// The `OR` can select users whose assignments turn out to grant nothing on
    /// the object; they are still exported, with all flags false.
    pub async fn fetch_users(&self, resolved: &ResolvedPermissions) -> Result<Vec<User>> {
        let assignee_ids = resolved.assignee_ids();
        let profile_ids = resolved.profile_ids();
        info!(
            "Fetching users for {} profiles and {} direct assignments",
            profile_ids.len(),
            assignee_ids.len()
        );

        let predicates: Vec<String> = [
            in_clause("Id", &assignee_ids),
            in_clause("ProfileId", &profile_ids),
        ]
        .into_iter()
        .flatten()
        .collect();

        if predicates.is_empty() {
            return Ok(vec![]);
        }

        let where_clause = predicates.join(OR);
        let soql = generate_query(&USER_FIELDS, USER, Some((&where_clause).into()), None, None);

        let users: Vec<User> = self.fetcher.bulk_query(&soql).await?;
        info!("Found {} users", users.len());
        Ok(users)
    }
}
