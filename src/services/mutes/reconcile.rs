use std::collections::{BTreeSet, HashSet};

use serenity::all::RoleId;

/// Compute the role set a member should end up with when a mute is lifted.
///
/// Starts from the member's current roles without the mute role, then adds
/// back every role from `roles_to_restore` that still exists in the guild
/// and is not the mute role. Input order and duplicates do not matter.
pub fn compute_restored_roles(
    current_roles: &[RoleId],
    mute_role: Option<RoleId>,
    roles_to_restore: &[RoleId],
    guild_roles: &HashSet<RoleId>,
) -> BTreeSet<RoleId> {
    let is_mute_role = |role: &RoleId| Some(*role) == mute_role;

    let mut roles: BTreeSet<RoleId> = current_roles
        .iter()
        .filter(|role| !is_mute_role(*role))
        .copied()
        .collect();

    roles.extend(
        roles_to_restore
            .iter()
            .filter(|role| guild_roles.contains(*role) && !is_mute_role(*role))
            .copied(),
    );

    roles
}

/// Roles to remember when muting a member: everything but the mute role
pub fn capture_roles_to_restore(current_roles: &[RoleId], mute_role: Option<RoleId>) -> Vec<RoleId> {
    let captured: BTreeSet<RoleId> = current_roles
        .iter()
        .filter(|role| Some(**role) != mute_role)
        .copied()
        .collect();

    captured.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(ids: &[u64]) -> Vec<RoleId> {
        ids.iter().map(|id| RoleId::new(*id)).collect()
    }

    fn guild(ids: &[u64]) -> HashSet<RoleId> {
        ids.iter().map(|id| RoleId::new(*id)).collect()
    }

    const MUTE: u64 = 99;

    #[test]
    fn test_restores_roles_and_drops_mute_role() {
        let result = compute_restored_roles(
            &roles(&[MUTE, 5]),
            Some(RoleId::new(MUTE)),
            &roles(&[1, 2]),
            &guild(&[1, 2, 5, MUTE]),
        );

        assert_eq!(result, roles(&[1, 2, 5]).into_iter().collect());
    }

    #[test]
    fn test_skips_deleted_roles() {
        let result = compute_restored_roles(
            &roles(&[MUTE]),
            Some(RoleId::new(MUTE)),
            &roles(&[1, 2, 3]),
            &guild(&[1, 3, MUTE]),
        );

        assert_eq!(result, roles(&[1, 3]).into_iter().collect());
    }

    #[test]
    fn test_never_restores_mute_role() {
        let result = compute_restored_roles(
            &[],
            Some(RoleId::new(MUTE)),
            &roles(&[MUTE, 1]),
            &guild(&[1, MUTE]),
        );

        assert_eq!(result, roles(&[1]).into_iter().collect());
    }

    #[test]
    fn test_duplicates_and_order_do_not_matter() {
        let guild_roles = guild(&[1, 2, 3, MUTE]);
        let a = compute_restored_roles(
            &roles(&[3, MUTE]),
            Some(RoleId::new(MUTE)),
            &roles(&[2, 1, 2, 3]),
            &guild_roles,
        );
        let b = compute_restored_roles(
            &roles(&[MUTE, 3]),
            Some(RoleId::new(MUTE)),
            &roles(&[1, 3, 2]),
            &guild_roles,
        );

        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_without_mute_role_configured() {
        let result = compute_restored_roles(&roles(&[4]), None, &roles(&[1]), &guild(&[1, 4]));
        assert_eq!(result, roles(&[1, 4]).into_iter().collect());
    }

    #[test]
    fn test_capture_excludes_mute_role() {
        let captured = capture_roles_to_restore(&roles(&[3, MUTE, 1, 3]), Some(RoleId::new(MUTE)));
        assert_eq!(captured, roles(&[1, 3]));
    }
}
