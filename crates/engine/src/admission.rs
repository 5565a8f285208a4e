//! Signup admission policy.
//!
//! Every representation the server offers asks the same question before an
//! account is created: given the state of the store, the requester and the
//! site configuration, may this signup go ahead and does the new account become
//! an administrator? The answer is a pure function of [`AdmissionContext`].

/// Snapshot of everything the policy looks at.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdmissionContext {
    /// No account exists yet.
    pub store_empty: bool,
    /// The requester is logged in as an administrator.
    pub requester_is_admin: bool,
    /// The site lets anyone register.
    pub open_signups: bool,
    /// The site publishes a terms of service link.
    pub tos_published: bool,
    /// The request carries the terms of service acceptance flag.
    pub tos_accepted: bool,
}

/// Why a signup was let through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The store is empty: the account bootstraps the site.
    FirstUser,
    /// An administrator creates an account on someone else's behalf.
    ByAdmin,
    /// Self-service registration on an open site.
    OpenSignup,
}

impl Admission {
    /// The new account is an administrator.
    pub fn grants_admin(self) -> bool {
        matches!(self, Self::FirstUser)
    }

    /// The new account is logged in right away.
    pub fn starts_session(self) -> bool {
        !matches!(self, Self::ByAdmin)
    }
}

/// Why a signup was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
    SignupsClosed,
    TermsNotAccepted,
}

/// Which variant of the signup form to show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignupView {
    FirstUser,
    NewUser,
    Closed,
}

/// Decide whether a signup may proceed, terms of service included.
pub fn evaluate(context: &AdmissionContext) -> Result<Admission, Denial> {
    let admission = admit(context)?;
    check_terms(context)?;
    Ok(admission)
}

/// The admission decision alone, without the terms of service gate.
pub fn admit(context: &AdmissionContext) -> Result<Admission, Denial> {
    if context.store_empty {
        Ok(Admission::FirstUser)
    } else if context.requester_is_admin {
        Ok(Admission::ByAdmin)
    } else if context.open_signups {
        Ok(Admission::OpenSignup)
    } else {
        Err(Denial::SignupsClosed)
    }
}

pub fn check_terms(context: &AdmissionContext) -> Result<(), Denial> {
    if context.tos_published && !context.tos_accepted {
        return Err(Denial::TermsNotAccepted);
    }
    Ok(())
}

/// Signup form heading for a visitor, or the closed notice.
pub fn signup_view(context: &AdmissionContext) -> SignupView {
    match admit(context) {
        Ok(Admission::FirstUser) => SignupView::FirstUser,
        Ok(_) => SignupView::NewUser,
        Err(_) => SignupView::Closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AdmissionContext {
        AdmissionContext::default()
    }

    #[test]
    fn empty_store_always_admits_an_admin() {
        for requester_is_admin in [false, true] {
            for open_signups in [false, true] {
                let ctx = AdmissionContext {
                    store_empty: true,
                    requester_is_admin,
                    open_signups,
                    ..context()
                };
                let admission = evaluate(&ctx).unwrap();
                assert_eq!(admission, Admission::FirstUser);
                assert!(admission.grants_admin());
                assert!(admission.starts_session());
            }
        }
    }

    #[test]
    fn admin_creates_plain_accounts_without_switching_session() {
        let ctx = AdmissionContext {
            requester_is_admin: true,
            ..context()
        };
        let admission = evaluate(&ctx).unwrap();
        assert_eq!(admission, Admission::ByAdmin);
        assert!(!admission.grants_admin());
        assert!(!admission.starts_session());
    }

    #[test]
    fn open_signups_admit_anonymous_visitors() {
        let ctx = AdmissionContext {
            open_signups: true,
            ..context()
        };
        assert_eq!(evaluate(&ctx), Ok(Admission::OpenSignup));
    }

    #[test]
    fn closed_site_denies_non_admins() {
        assert_eq!(evaluate(&context()), Err(Denial::SignupsClosed));
        assert_eq!(signup_view(&context()), SignupView::Closed);
    }

    #[test]
    fn terms_gate_applies_after_admission() {
        let ctx = AdmissionContext {
            open_signups: true,
            tos_published: true,
            ..context()
        };
        assert_eq!(evaluate(&ctx), Err(Denial::TermsNotAccepted));

        let accepted = AdmissionContext {
            tos_accepted: true,
            ..ctx
        };
        assert_eq!(evaluate(&accepted), Ok(Admission::OpenSignup));
    }

    #[test]
    fn closed_site_reports_closed_even_without_terms() {
        let ctx = AdmissionContext {
            tos_published: true,
            ..context()
        };
        assert_eq!(evaluate(&ctx), Err(Denial::SignupsClosed));
    }

    #[test]
    fn signup_view_tracks_admission() {
        let first = AdmissionContext {
            store_empty: true,
            ..context()
        };
        assert_eq!(signup_view(&first), SignupView::FirstUser);

        let admin = AdmissionContext {
            requester_is_admin: true,
            ..context()
        };
        assert_eq!(signup_view(&admin), SignupView::NewUser);
    }
}
