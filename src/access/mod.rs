//! Authorization guard.
//!
//! [`authorize`] decides whether a caller may perform an [`Action`]. It is a
//! pure predicate over the caller's identity and role and the identities
//! attached to the resource; callers fetch those identities from storage
//! first and check the decision before issuing any mutating call.

use crate::db::Role;
use crate::error::Error;

/// The authenticated identity behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub email: String,
    pub role: Role,
}

impl Caller {
    pub fn new(email: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            role,
        }
    }

    fn is(&self, email: &str) -> bool {
        self.email == email
    }
}

/// Everything a caller can ask for, with the identities the rules look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    // Public, read-only listings
    ViewTime,
    ListEvents,
    ViewEvent,
    ListApproved,

    /// Sign-up. Only an admin may create another admin.
    CreateAccount { role: Role },
    ViewAccount { owner: &'a str },

    // Self-service
    UpdateAccount { owner: &'a str },
    ChangePassword { owner: &'a str },
    RegisterForEvent { owner: &'a str },
    ViewSchedule { owner: &'a str },
    ViewEnrollment { owner: &'a str },

    // Event management
    CreateEvent,
    UpdateEvent,
    DeleteEvent,

    // Registration approval
    ListRegistrations,
    ApproveRegistration,
    ResetPassword { owner: &'a str },

    // Interview administration
    ListEventInterviews,
    CreateInterview { interviewer: &'a str },
    ViewInterview { interviewer: &'a str, interviewee: &'a str },
    ModifyInterview { interviewer: &'a str },
    DeleteInterview { interviewer: &'a str },

    // Live interview
    StartInterview { interviewer: &'a str, interviewee: &'a str },
    UseLiveSession,
}

impl Action<'_> {
    /// Actions any caller, authenticated or not, may perform
    pub fn is_public(&self) -> bool {
        matches!(
            self,
            Action::ViewTime
                | Action::ListEvents
                | Action::ViewEvent
                | Action::ListApproved
                | Action::CreateAccount { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No authenticated session
    Unauthenticated,
    /// Authenticated, but the rules do not allow it
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Turn a denial into a `NotAuthorized` error carrying `code`
    pub fn require(self, code: u16) -> Result<(), Error> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::Unauthenticated) => {
                Err(Error::not_authorized(code, "Not Logged In"))
            }
            Decision::Deny(DenyReason::Forbidden) => {
                Err(Error::not_authorized(code, "Not Authorized"))
            }
        }
    }
}

fn allow_if(condition: bool) -> Decision {
    if condition {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::Forbidden)
    }
}

/// Decide whether `caller` may perform `action`.
pub fn authorize(caller: Option<&Caller>, action: &Action<'_>) -> Decision {
    let caller = match caller {
        Some(caller) => caller,
        None => {
            return match action {
                Action::CreateAccount { role } => allow_if(!role.is_admin()),
                action if action.is_public() => Decision::Allow,
                _ => Decision::Deny(DenyReason::Unauthenticated),
            };
        }
    };
    let admin = caller.role.is_admin();

    match *action {
        Action::ViewTime | Action::ListEvents | Action::ViewEvent | Action::ListApproved => {
            Decision::Allow
        }
        Action::CreateAccount { role } => allow_if(!role.is_admin() || admin),
        Action::ViewAccount { .. } | Action::UseLiveSession => Decision::Allow,

        Action::UpdateAccount { owner }
        | Action::ChangePassword { owner }
        | Action::RegisterForEvent { owner } => allow_if(caller.is(owner)),
        Action::ViewSchedule { owner } | Action::ViewEnrollment { owner } => {
            allow_if(admin || caller.is(owner))
        }

        Action::CreateEvent
        | Action::UpdateEvent
        | Action::DeleteEvent
        | Action::ListRegistrations
        | Action::ApproveRegistration
        | Action::ResetPassword { .. }
        | Action::ListEventInterviews => allow_if(admin),

        Action::CreateInterview { interviewer }
        | Action::ModifyInterview { interviewer }
        | Action::DeleteInterview { interviewer } => allow_if(admin || caller.is(interviewer)),
        Action::ViewInterview {
            interviewer,
            interviewee,
        } => allow_if(admin || caller.is(interviewer) || caller.is(interviewee)),

        Action::StartInterview {
            interviewer,
            interviewee,
        } => allow_if(caller.is(interviewer) || caller.is(interviewee)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Caller {
        Caller::new("root@x.com", Role::Admin)
    }

    fn interviewer() -> Caller {
        Caller::new("a@x.com", Role::Interviewer)
    }

    fn interviewee() -> Caller {
        Caller::new("b@x.com", Role::Interviewee)
    }

    fn outsider() -> Caller {
        Caller::new("c@x.com", Role::Interviewee)
    }

    #[test]
    fn test_unauthenticated_only_public() {
        for action in [
            Action::ViewTime,
            Action::ListEvents,
            Action::ViewEvent,
            Action::ListApproved,
        ] {
            assert_eq!(authorize(None, &action), Decision::Allow);
        }

        for action in [
            Action::CreateEvent,
            Action::ApproveRegistration,
            Action::UseLiveSession,
            Action::ViewAccount { owner: "a@x.com" },
            Action::RegisterForEvent { owner: "a@x.com" },
            Action::ViewInterview {
                interviewer: "a@x.com",
                interviewee: "b@x.com",
            },
        ] {
            assert_eq!(
                authorize(None, &action),
                Decision::Deny(DenyReason::Unauthenticated),
                "{:?}",
                action
            );
        }
    }

    #[test]
    fn test_account_creation_roles() {
        let admin_role = Action::CreateAccount { role: Role::Admin };
        let interviewee_role = Action::CreateAccount {
            role: Role::Interviewee,
        };

        assert!(authorize(None, &interviewee_role).is_allowed());
        assert!(!authorize(None, &admin_role).is_allowed());
        assert!(!authorize(Some(&interviewer()), &admin_role).is_allowed());
        assert!(authorize(Some(&admin()), &admin_role).is_allowed());
    }

    #[test]
    fn test_admin_manages_events_and_approvals() {
        for action in [
            Action::CreateEvent,
            Action::UpdateEvent,
            Action::DeleteEvent,
            Action::ListRegistrations,
            Action::ApproveRegistration,
            Action::ListEventInterviews,
        ] {
            assert!(authorize(Some(&admin()), &action).is_allowed());
            assert_eq!(
                authorize(Some(&interviewer()), &action),
                Decision::Deny(DenyReason::Forbidden)
            );
        }
    }

    #[test]
    fn test_self_service_requires_matching_identity() {
        let caller = interviewee();
        for action in [
            Action::UpdateAccount { owner: "b@x.com" },
            Action::ChangePassword { owner: "b@x.com" },
            Action::RegisterForEvent { owner: "b@x.com" },
            Action::ViewSchedule { owner: "b@x.com" },
        ] {
            assert!(authorize(Some(&caller), &action).is_allowed());
        }
        for action in [
            Action::UpdateAccount { owner: "a@x.com" },
            Action::ChangePassword { owner: "a@x.com" },
            Action::RegisterForEvent { owner: "a@x.com" },
            Action::ViewSchedule { owner: "a@x.com" },
        ] {
            assert!(!authorize(Some(&caller), &action).is_allowed());
        }

        // Admins may read schedules but not edit other accounts
        assert!(authorize(Some(&admin()), &Action::ViewSchedule { owner: "b@x.com" }).is_allowed());
        assert!(!authorize(Some(&admin()), &Action::UpdateAccount { owner: "b@x.com" }).is_allowed());
    }

    #[test]
    fn test_interview_creation() {
        let action = Action::CreateInterview {
            interviewer: "a@x.com",
        };
        assert!(authorize(Some(&admin()), &action).is_allowed());
        assert!(authorize(Some(&interviewer()), &action).is_allowed());
        assert!(!authorize(Some(&interviewee()), &action).is_allowed());
    }

    #[test]
    fn test_interview_view_denies_outsiders() {
        let action = Action::ViewInterview {
            interviewer: "a@x.com",
            interviewee: "b@x.com",
        };
        assert!(authorize(Some(&admin()), &action).is_allowed());
        assert!(authorize(Some(&interviewer()), &action).is_allowed());
        assert!(authorize(Some(&interviewee()), &action).is_allowed());
        assert_eq!(
            authorize(Some(&outsider()), &action),
            Decision::Deny(DenyReason::Forbidden)
        );
    }

    #[test]
    fn test_interview_modification_and_deletion() {
        for action in [
            Action::ModifyInterview {
                interviewer: "a@x.com",
            },
            Action::DeleteInterview {
                interviewer: "a@x.com",
            },
        ] {
            assert!(authorize(Some(&admin()), &action).is_allowed());
            assert!(authorize(Some(&interviewer()), &action).is_allowed());
            // The interviewee cannot edit their own results
            assert!(!authorize(Some(&interviewee()), &action).is_allowed());
        }
    }

    #[test]
    fn test_start_is_for_participants_only() {
        let action = Action::StartInterview {
            interviewer: "a@x.com",
            interviewee: "b@x.com",
        };
        assert!(authorize(Some(&interviewer()), &action).is_allowed());
        assert!(authorize(Some(&interviewee()), &action).is_allowed());
        assert!(!authorize(Some(&outsider()), &action).is_allowed());
        assert!(!authorize(Some(&admin()), &action).is_allowed());
    }

    #[test]
    fn test_require_maps_to_not_authorized() {
        let err = Decision::Deny(DenyReason::Forbidden).require(121).unwrap_err();
        assert_eq!(err.to_string(), "121: Not Authorized");

        let err = Decision::Deny(DenyReason::Unauthenticated)
            .require(112)
            .unwrap_err();
        assert_eq!(err.to_string(), "112: Not Logged In");

        assert!(Decision::Allow.require(100).is_ok());
    }
}
