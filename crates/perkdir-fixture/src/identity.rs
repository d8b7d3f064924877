use time::OffsetDateTime;
use uuid::Uuid;

pub const TEST_IDENTITY_PASSWORD: &str = "UITest-StrongPass1!";

/// The ephemeral identity a suite run registers and later destroys. The
/// email is the unique key the backing store is cleaned by, so it combines a
/// timestamp with fresh randomness: a shared store may see many concurrent
/// runs, and a clock alone cannot keep them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestIdentity {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl TestIdentity {
    pub fn generate() -> Self {
        let run_token = Uuid::new_v4().simple().to_string();
        let stamp = OffsetDateTime::now_utc().unix_timestamp();
        Self {
            name: format!("UI Test User {run_token}"),
            email: format!("ui.tester.{stamp}.{run_token}@example.com"),
            password: TEST_IDENTITY_PASSWORD.to_owned(),
        }
    }

    /// The store matches identities by lowercased email.
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_identities_do_not_collide() {
        let a = TestIdentity::generate();
        let b = TestIdentity::generate();
        assert_ne!(a.email, b.email);
        assert_ne!(a.name, b.name);
        assert!(a.email.starts_with("ui.tester."));
        assert!(a.email.ends_with("@example.com"));
    }

    #[test]
    fn email_normalization_lowercases_and_trims() {
        let identity = TestIdentity {
            name: "n".to_owned(),
            email: "  UI.Tester.1.ABC@Example.COM ".to_owned(),
            password: TEST_IDENTITY_PASSWORD.to_owned(),
        };
        assert_eq!(identity.normalized_email(), "ui.tester.1.abc@example.com");
    }
}
