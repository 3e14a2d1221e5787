use std::path::Path;

use log::info;

use crate::cache::ContentCache;
use crate::error::Result;
use crate::export::write_csv;
use crate::fetcher::MetadataFetcher;
use crate::salesforce::SalesforceApi;

/// Per-user OR-merge of profile, permission set and group grants.
pub mod aggregate;
/// Which Profiles, Permission Sets, groups and assignments grant access.
pub mod resolver;

pub use aggregate::{AggregatedUserPermission, aggregate};
pub use resolver::{GrantedPermission, MetadataIndex, PermissionResolver, ResolvedPermissions};

/// Resolve who can access `object_name` and write one CSV row per user to `file`.
///
/// Returns the number of rows written.
pub async fn export_object_permissions<A: SalesforceApi>(
    api: &A,
    cache: &ContentCache,
    object_name: &str,
    file: &Path,
    force: bool,
) -> Result<usize> {
    let fetcher = MetadataFetcher::new(api, cache);
    let resolver = PermissionResolver::new(&fetcher);

    let resolved = resolver.resolve(object_name).await?;
    let users = resolver.fetch_users(&resolved).await?;
    let rows = aggregate(&resolved, &users);

    info!("Writing {} users to {}", rows.len(), file.display());
    Ok(write_csv(file, &rows, force)?)
}
