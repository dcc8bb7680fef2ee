//! Role assignment from the configured auditor list.

use shared_types::Role;
use std::collections::HashSet;

/// Decides which role a new identity receives.
///
/// Emails listed here become `Auditor`; everyone else is a `Member`.
/// Matching is case-insensitive on the trimmed address.
#[derive(Debug, Clone, Default)]
pub struct RolePolicy {
    auditor_emails: HashSet<String>,
}

impl RolePolicy {
    pub fn new<I, S>(auditor_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            auditor_emails: auditor_emails
                .into_iter()
                .map(|e| normalize(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn role_for(&self, email: &str) -> Role {
        if self.auditor_emails.contains(&normalize(email)) {
            Role::Auditor
        } else {
            Role::Member
        }
    }

    pub fn auditor_count(&self) -> usize {
        self.auditor_emails.len()
    }

    /// Normalized auditor emails, sorted.
    pub fn auditor_emails(&self) -> Vec<String> {
        let mut emails: Vec<String> = self.auditor_emails.iter().cloned().collect();
        emails.sort();
        emails
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listed_email_is_auditor() {
        let policy = RolePolicy::new([" Dev@Example.com ", ""]);
        assert_eq!(policy.auditor_count(), 1);
        assert_eq!(policy.role_for("dev@example.com"), Role::Auditor);
        assert_eq!(policy.role_for("someone@example.com"), Role::Member);
        assert_eq!(policy.auditor_emails(), vec!["dev@example.com".to_string()]);
    }

    #[test]
    fn test_default_policy_has_no_auditors() {
        assert_eq!(RolePolicy::default().role_for("dev@example.com"), Role::Member);
    }
}
