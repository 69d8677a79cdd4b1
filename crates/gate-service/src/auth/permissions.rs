//! Permission enforcement.

use crate::auth::claims::ClaimSet;
use crate::errors::AuthError;

/// Check that `claims` grants `permission`.
///
/// Membership is exact string equality. No wildcards, hierarchy or case folding.
///
/// # Errors
///
/// - `PermissionsMissing` - the token carries no `permissions` claim at all
/// - `PermissionDenied` - the claim is present but does not contain `permission`
pub fn check_permissions(permission: &str, claims: &ClaimSet) -> Result<(), AuthError> {
    let Some(granted) = claims.permissions.as_ref() else {
        tracing::debug!(target: "gate.auth.permissions", "Token has no permissions claim");
        return Err(AuthError::PermissionsMissing);
    };

    if granted.iter().any(|p| p == permission) {
        Ok(())
    } else {
        tracing::debug!(
            target: "gate.auth.permissions",
            required = %permission,
            granted_count = granted.len(),
            "Required permission not granted"
        );
        Err(AuthError::PermissionDenied)
    }
}
