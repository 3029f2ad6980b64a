/// Runtime settings injected into the picks service.
#[derive(Clone, Debug, Default)]
pub struct PicksConfig {
    admin_emails: Vec<String>,
    /// When false, a line may not have more primary winners than its
    /// `choice_limit`.
    pub allow_multiple_primary_winners: bool,
}

impl PicksConfig {
    pub fn new<I, S>(admin_emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admin_emails: admin_emails
                .into_iter()
                .map(|email| email.as_ref().trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
            allow_multiple_primary_winners: false,
        }
    }

    pub fn with_multiple_primary_winners(mut self, allow: bool) -> Self {
        self.allow_multiple_primary_winners = allow;
        self
    }

    pub fn admin_emails(&self) -> &[String] {
        &self.admin_emails
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_match_is_case_insensitive() {
        let config = PicksConfig::new(["Admin@Example.com", " "]);
        assert_eq!(config.admin_emails().len(), 1);
        assert!(config.is_admin_email("admin@example.com"));
        assert!(config.is_admin_email(" ADMIN@example.COM "));
        assert!(!config.is_admin_email("player@example.com"));
    }
}
