//! Visibility policy
//!
//! Who may see which users, requests and chat contacts. Every handler that
//! filters or guards by role goes through [`Visible`] so the rules live in
//! one place.

use crate::auth::AuthUser;
use crate::repositories::{CareLink, PlanRequestRecord, UserRecord};
use helix_shared::Role;
use uuid::Uuid;

pub trait Visible {
    fn visible_to(&self, actor: &AuthUser) -> bool;
}

/// Clients see their own requests, doctors the ones assigned to them,
/// admins everything.
impl Visible for PlanRequestRecord {
    fn visible_to(&self, actor: &AuthUser) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Doctor => self.doctor_id == Some(actor.user_id),
            Role::Client => self.client_id == actor.user_id,
        }
    }
}

/// Directory listing: admins see everyone, doctors see clients and
/// clients see the care team.
impl Visible for UserRecord {
    fn visible_to(&self, actor: &AuthUser) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Doctor => self.role == Role::Client,
            Role::Client => matches!(self.role, Role::Admin | Role::Doctor),
        }
    }
}

/// A potential chat partner together with whether a care link connects
/// them to the actor
pub struct ContactCandidate<'a> {
    pub user: &'a UserRecord,
    pub linked: bool,
}

impl Visible for ContactCandidate<'_> {
    fn visible_to(&self, actor: &AuthUser) -> bool {
        if self.user.id == actor.user_id {
            return false;
        }
        match (actor.role, self.user.role) {
            (Role::Admin, other) => other != Role::Admin,
            (_, Role::Admin) => true,
            (Role::Client, Role::Doctor) | (Role::Doctor, Role::Client) => self.linked,
            _ => false,
        }
    }
}

/// Keep only the items `actor` may see
pub fn filter_visible<T: Visible>(items: Vec<T>, actor: &AuthUser) -> Vec<T> {
    items.into_iter().filter(|item| item.visible_to(actor)).collect()
}

/// Whether any care link pairs `actor` with `other`
pub fn is_linked(links: &[CareLink], actor: Uuid, other: Uuid) -> bool {
    links.iter().any(|link| {
        (link.client_id == actor && link.doctor_id == other)
            || (link.doctor_id == actor && link.client_id == other)
    })
}

/// Users the actor may message, given every user and the actor's care links
pub fn allowed_contacts(
    actor: &AuthUser,
    users: Vec<UserRecord>,
    links: &[CareLink],
) -> Vec<UserRecord> {
    users
        .into_iter()
        .filter(|user| {
            ContactCandidate {
                user,
                linked: is_linked(links, actor.user_id, user.id),
            }
            .visible_to(actor)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use helix_shared::PlanStatus;
    use rstest::rstest;
    use sqlx::types::Json;

    fn user(role: Role) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: Uuid::new_v4(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: String::new(),
            name: role.as_str().to_string(),
            role,
            avatar: None,
            active_package_id: None,
            package_end_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn actor(record: &UserRecord) -> AuthUser {
        AuthUser {
            user_id: record.id,
            role: record.role,
        }
    }

    fn request(client_id: Uuid, doctor_id: Option<Uuid>) -> PlanRequestRecord {
        let now = Utc::now();
        PlanRequestRecord {
            id: Uuid::new_v4(),
            client_id,
            client_name: "Alice".to_string(),
            doctor_id,
            doctor_name: None,
            status: PlanStatus::Processing,
            goals: "Eat better".to_string(),
            current_weight: None,
            target_weight: None,
            height: None,
            age: None,
            gender: None,
            activity_level: None,
            allergies: None,
            preferred_meals: None,
            draft_tasks: Json(Vec::new()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_request_visibility() {
        let client = user(Role::Client);
        let doctor = user(Role::Doctor);
        let other_doctor = user(Role::Doctor);
        let admin = user(Role::Admin);
        let req = request(client.id, Some(doctor.id));

        assert!(req.visible_to(&actor(&client)));
        assert!(req.visible_to(&actor(&doctor)));
        assert!(req.visible_to(&actor(&admin)));
        assert!(!req.visible_to(&actor(&other_doctor)));
        assert!(!req.visible_to(&actor(&user(Role::Client))));
    }

    #[rstest]
    #[case(Role::Admin, Role::Client, true)]
    #[case(Role::Admin, Role::Admin, true)]
    #[case(Role::Doctor, Role::Client, true)]
    #[case(Role::Doctor, Role::Doctor, false)]
    #[case(Role::Client, Role::Doctor, true)]
    #[case(Role::Client, Role::Admin, true)]
    #[case(Role::Client, Role::Client, false)]
    fn test_directory_visibility(#[case] viewer: Role, #[case] target: Role, #[case] visible: bool) {
        let viewer = user(viewer);
        assert_eq!(user(target).visible_to(&actor(&viewer)), visible);
    }

    #[test]
    fn test_contacts_follow_care_links() {
        let client = user(Role::Client);
        let doctor_a = user(Role::Doctor);
        let doctor_b = user(Role::Doctor);
        let admin = user(Role::Admin);
        let other_client = user(Role::Client);
        let links = vec![CareLink {
            client_id: client.id,
            doctor_id: doctor_a.id,
        }];
        let everyone = vec![
            client.clone(),
            doctor_a.clone(),
            doctor_b.clone(),
            admin.clone(),
            other_client.clone(),
        ];

        let ids = |users: Vec<UserRecord>| users.into_iter().map(|u| u.id).collect::<Vec<_>>();

        let for_client = ids(allowed_contacts(&actor(&client), everyone.clone(), &links));
        assert_eq!(for_client, vec![doctor_a.id, admin.id]);

        let for_doctor = ids(allowed_contacts(&actor(&doctor_a), everyone.clone(), &links));
        assert_eq!(for_doctor, vec![client.id, admin.id]);

        let for_unlinked = ids(allowed_contacts(&actor(&doctor_b), everyone.clone(), &[]));
        assert_eq!(for_unlinked, vec![admin.id]);

        let for_admin = ids(allowed_contacts(&actor(&admin), everyone, &links));
        assert_eq!(
            for_admin,
            vec![client.id, doctor_a.id, doctor_b.id, other_client.id]
        );
    }
}
