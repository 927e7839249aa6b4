//! Identifier matching.
//!
//! A [`Matcher`] decides whether a handler owns an identifier string: a
//! component or modal custom id, or a command path.
//!
//! ```rust,ignore
//! use wicket_framework::Matcher;
//!
//! let close = Matcher::exact("close");
//! let add_admin = Matcher::prefix("addadmin-");
//! let panels = Matcher::catch_all();
//!
//! assert!(add_admin.matches("addadmin-role-123"));
//! assert!(panels.matches("anything"));
//! ```

use std::fmt;
use std::sync::Arc;

/// A type-erased predicate over identifiers.
pub type PredicateFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Decides whether a handler owns an identifier.
#[derive(Clone)]
pub enum Matcher {
    /// The identifier equals a fixed string.
    Exact(String),
    /// The identifier satisfies an arbitrary function.
    Predicate(PredicateFn),
    /// Matches anything no other handler claims.
    Default,
}

impl Matcher {
    pub fn exact(id: impl Into<String>) -> Self {
        Self::Exact(id.into())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// Matches identifiers starting with `prefix`, the usual shape for ids
    /// carrying embedded parameters.
    pub fn prefix(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self::predicate(move |id| id.starts_with(prefix.as_str()))
    }

    pub fn catch_all() -> Self {
        Self::Default
    }

    pub fn matches(&self, id: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == id,
            Self::Predicate(f) => f(id),
            Self::Default => true,
        }
    }

    pub fn is_catch_all(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(id) => f.debug_tuple("Exact").field(id).finish(),
            Self::Predicate(_) => f.write_str("Predicate(<fn>)"),
            Self::Default => f.write_str("Default"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matcher() {
        let m = Matcher::exact("close");
        assert!(m.matches("close"));
        assert!(!m.matches("close-confirm"));
        assert!(!m.is_catch_all());
    }

    #[test]
    fn test_prefix_matcher() {
        let m = Matcher::prefix("addadmin-");
        assert!(m.matches("addadmin-role-1"));
        assert!(!m.matches("addsupport-role-1"));
    }

    #[test]
    fn test_catch_all_matches_everything() {
        let m = Matcher::catch_all();
        assert!(m.matches(""));
        assert!(m.matches("panel-8812"));
        assert!(m.is_catch_all());
    }
}
