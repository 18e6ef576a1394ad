use crate::workflow::status::ActorRole;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin = 1,
    Manager = 2,
    Employee = 3,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Manager),
            3 => Some(Role::Employee),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Admins and managers decide on submitted KPIs.
    pub fn actor_role(self) -> ActorRole {
        match self {
            Role::Admin | Role::Manager => ActorRole::Approver,
            Role::Employee => ActorRole::Employee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip() {
        for role in [Role::Admin, Role::Manager, Role::Employee] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
        assert_eq!(Role::from_id(4), None);
    }

    #[test]
    fn approver_mapping() {
        assert_eq!(Role::Admin.actor_role(), ActorRole::Approver);
        assert_eq!(Role::Manager.actor_role(), ActorRole::Approver);
        assert_eq!(Role::Employee.actor_role(), ActorRole::Employee);
    }
}
