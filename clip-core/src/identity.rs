//! Acting-user identity.

/// The user an upload is performed for.
///
/// Resolved by the host identity provider before the pipeline runs; the
/// pipeline only uses it to title stored recordings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
}

impl Actor {
    pub fn new<I, N>(id: I, display_name: N) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Display name, falling back to the id when the provider left it blank.
    pub fn label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.id
        } else {
            self.display_name.trim()
        }
    }
}
