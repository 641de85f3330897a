use serde::{Deserialize, Serialize};

use super::enums::StaffRole;

/// Authenticated staff member performing a request. Identity is established
/// upstream by the hospital gateway; this engine only reads the forwarded
/// headers and enforces role gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
    pub role: StaffRole,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == StaffRole::Admin
    }

    /// True when the actor may service the given investigation role, either
    /// by holding that exact role or by being an admin. The lab head counts
    /// as lab staff.
    pub fn can_act_as(&self, role: &StaffRole) -> bool {
        if self.is_admin() {
            return true;
        }
        if self.role == *role {
            return true;
        }
        *role == StaffRole::Lab && self.role == StaffRole::LabHead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: StaffRole) -> Actor {
        Actor {
            id: "STF-001".into(),
            name: "Test Staff".into(),
            role,
        }
    }

    #[test]
    fn admin_can_act_as_anything() {
        let admin = actor(StaffRole::Admin);
        assert!(admin.can_act_as(&StaffRole::Lab));
        assert!(admin.can_act_as(&StaffRole::Scan));
        assert!(admin.can_act_as(&StaffRole::Claims));
    }

    #[test]
    fn lab_head_counts_as_lab_staff() {
        let head = actor(StaffRole::LabHead);
        assert!(head.can_act_as(&StaffRole::Lab));
        assert!(!head.can_act_as(&StaffRole::Scan));
    }

    #[test]
    fn exact_role_matches() {
        let scan = actor(StaffRole::Scan);
        assert!(scan.can_act_as(&StaffRole::Scan));
        assert!(!scan.can_act_as(&StaffRole::Lab));
        assert!(!scan.is_admin());
    }
}
