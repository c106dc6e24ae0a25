use serde::{Deserialize, Serialize};

use crate::types::DocId;

/// Display name used for comment authors without one.
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// The signed-in user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: DocId,
    pub email: String,
    pub display_name: Option<String>,
}

impl Identity {
    /// Name stamped on comments written by this user.
    pub fn author_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => ANONYMOUS_AUTHOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(display_name: Option<&str>) -> Identity {
        Identity {
            uid: "u1".into(),
            email: "a@example.com".into(),
            display_name: display_name.map(str::to_string),
        }
    }

    #[test]
    fn author_name_prefers_display_name() {
        assert_eq!(identity(Some("Ada")).author_name(), "Ada");
    }

    #[test]
    fn author_name_falls_back_to_anonymous() {
        assert_eq!(identity(None).author_name(), ANONYMOUS_AUTHOR);
        assert_eq!(identity(Some("  ")).author_name(), ANONYMOUS_AUTHOR);
    }
}
