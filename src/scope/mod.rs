// Scope Resolver: computes, per request, the set of learner identities an
// actor may read or act upon. Derived fresh from the identity graph each time
// (no cross-request caching, so role changes take effect immediately).
use std::collections::{HashSet, VecDeque};

use thiserror::Error;
use uuid::Uuid;

use crate::identity::Role;
use crate::store::{IdentityStore, StoreError};

#[derive(Debug, Error)]
pub enum ScopeError {
    /// The leader tree walk exceeded the configured depth cap. Either the
    /// graph is corrupted or someone built an org deeper than anything we
    /// support; fail closed rather than keep walking.
    #[error("leader tree exceeded depth cap {0}")]
    DepthCapExceeded(u32),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The actor on whose behalf a request runs. `role` is `None` when the stored
/// role string did not parse; such actors hold no scope and pass no
/// capability check.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub role: Option<Role>,
    pub leader_id: Option<Uuid>,
}

/// Request-scoped authorization set. Super-admins get `Unrestricted`, never
/// an enumerated set of every id in the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeSet {
    Unrestricted,
    Members(HashSet<Uuid>),
}

impl ScopeSet {
    pub fn contains(&self, id: Uuid) -> bool {
        match self {
            ScopeSet::Unrestricted => true,
            ScopeSet::Members(set) => set.contains(&id),
        }
    }

    /// `None` means "no filter" for the storage layer.
    pub fn as_filter(&self) -> Option<Vec<Uuid>> {
        match self {
            ScopeSet::Unrestricted => None,
            ScopeSet::Members(set) => Some(set.iter().copied().collect()),
        }
    }

    pub fn empty() -> Self {
        ScopeSet::Members(HashSet::new())
    }
}

/// Resolve the actor's scope. Never fails for a valid role; unknown/legacy
/// roles resolve to the empty set (fail closed, never open).
pub async fn resolve_scope(
    actor: &Actor,
    identities: &dyn IdentityStore,
    max_tree_depth: u32,
) -> Result<ScopeSet, ScopeError> {
    match actor.role {
        Some(Role::SuperAdmin) => Ok(ScopeSet::Unrestricted),
        Some(Role::Leader) => leader_closure(actor.id, identities, max_tree_depth).await,
        Some(Role::Coach) => {
            let ids = identities.coached_by(actor.id).await?;
            Ok(ScopeSet::Members(ids.into_iter().collect()))
        }
        Some(Role::Assistant) => {
            let ids = identities.created_by(actor.id, actor.leader_id).await?;
            Ok(ScopeSet::Members(ids.into_iter().collect()))
        }
        Some(Role::Student) | Some(Role::Trader) | None => Ok(ScopeSet::empty()),
    }
}

/// BFS over the `leader_id` back-edge starting at (and including) the leader.
/// The visited set makes diamond edges and cycles terminate; a revisit is
/// logged as graph corruption. Depth beyond the cap aborts the walk.
async fn leader_closure(
    leader_id: Uuid,
    identities: &dyn IdentityStore,
    max_tree_depth: u32,
) -> Result<ScopeSet, ScopeError> {
    let mut visited: HashSet<Uuid> = HashSet::new();
    visited.insert(leader_id);

    let mut frontier: VecDeque<Uuid> = VecDeque::new();
    frontier.push_back(leader_id);

    let mut depth = 0u32;
    while !frontier.is_empty() {
        if depth >= max_tree_depth {
            tracing::error!(
                leader = %leader_id,
                depth_cap = max_tree_depth,
                "leader tree walk aborted at depth cap"
            );
            return Err(ScopeError::DepthCapExceeded(max_tree_depth));
        }

        let mut next: VecDeque<Uuid> = VecDeque::new();
        while let Some(current) = frontier.pop_front() {
            for child in identities.children_of(current).await? {
                if !visited.insert(child) {
                    // A back-edge into an already-collected node: the org
                    // tree has a cycle or duplicate edge. The closure is
                    // still exactly the reachable set, so keep going.
                    tracing::warn!(leader = %leader_id, node = %child, "cycle detected in leader tree");
                    continue;
                }
                next.push_back(child);
            }
        }
        frontier = next;
        depth += 1;
    }

    Ok(ScopeSet::Members(visited))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrestricted_contains_everything() {
        let scope = ScopeSet::Unrestricted;
        assert!(scope.contains(Uuid::new_v4()));
        assert_eq!(scope.as_filter(), None);
    }

    #[test]
    fn test_empty_scope_contains_nothing() {
        let scope = ScopeSet::empty();
        assert!(!scope.contains(Uuid::new_v4()));
        assert_eq!(scope.as_filter().map(|v| v.len()), Some(0));
    }
}
