//! Authorization and outcome bookkeeping shared by the coordinator and the
//! group composition manager.
//!
//! Checks run against the calling node's local view. The ledger re-validates
//! on commit, so a stale view can only cause a spurious rejection here, never
//! an unauthorized commit. Records the view does not hold are left to the
//! ledger to resolve.

use bn_telemetry::{metric_inc, MEMBERSHIP_OPERATIONS};
use tracing::{debug, warn};

use crate::domain::{
    invariant_authorized, MembershipError, MembershipState, MembershipStatus, NetworkId,
    OperationKind, Permission,
};
use crate::ports::{membership_of, memberships_by_status, NodeHandle};

/// The caller's own membership in `network_id`, provided it administers
/// `permission` there.
pub(crate) async fn authorize(
    node: &dyn NodeHandle,
    network_id: NetworkId,
    permission: &Permission,
) -> Result<MembershipState, MembershipError> {
    let own = membership_of(node, network_id, node.identity()).await?;
    invariant_authorized(node.identity(), own.as_ref(), permission)?;
    own.ok_or_else(|| unauthorized(node, permission))
}

/// Gate for a record id missing from the caller's view.
///
/// A caller that administers `permission` nowhere gets `Unauthorized` and
/// learns nothing about the id. Any other caller may still be an authority
/// of the record's network, so the operation goes to the ledger, whose
/// canonical registry answers `NotFound` or `Unauthorized`.
pub(crate) async fn any_authority(
    node: &dyn NodeHandle,
    permission: &Permission,
) -> Result<(), MembershipError> {
    let active = memberships_by_status(node, &[MembershipStatus::Active]).await?;
    let administers = active
        .iter()
        .any(|m| m.party == *node.identity() && m.can_administer(permission));
    if administers {
        Ok(())
    } else {
        Err(unauthorized(node, permission))
    }
}

/// Count the outcome of an operation and log failures.
pub(crate) fn record<T>(
    operation: OperationKind,
    node: &dyn NodeHandle,
    result: Result<T, MembershipError>,
) -> Result<T, MembershipError> {
    match &result {
        Ok(_) => {
            metric_inc!(MEMBERSHIP_OPERATIONS, &[operation.as_str(), "committed"]);
            debug!(node = %node.name(), %operation, "Operation committed");
        }
        Err(err) => {
            metric_inc!(MEMBERSHIP_OPERATIONS, &[operation.as_str(), err.kind()]);
            warn!(node = %node.name(), %operation, error = %err, "Operation failed");
        }
    }
    result
}

fn unauthorized(node: &dyn NodeHandle, permission: &Permission) -> MembershipError {
    MembershipError::Unauthorized {
        party: node.identity().clone(),
        permission: permission.clone(),
    }
}
