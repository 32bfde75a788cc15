//! Route lookup against the active snapshot.
//!
//! # Responsibilities
//! - Resolve a request path to the winning rule
//! - Enforce `requires_auth` before any backend is contacted
//! - Return matched route or an explicit routing error
//!
//! # Design Decisions
//! - Reads only the config store, never sync state
//! - A match holds its snapshot's `Arc`, so a concurrent commit cannot
//!   change the rule mid-request
//! - Explicit NotFound rather than a silent default

use std::sync::Arc;

use crate::routing::matcher::{has_dot_segment, longest_prefix_match};
use crate::snapshot::store::ConfigStore;
use crate::snapshot::types::{ConfigurationSnapshot, RouteRule, SnapshotVersion};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no route matches the request path")]
    NotFound,

    #[error("route requires a valid credential")]
    Unauthorized,

    #[error("request path contains dot segments")]
    InvalidPath,
}

/// Resolve `path` within one snapshot. Pure.
pub fn resolve<'a>(
    snapshot: &'a ConfigurationSnapshot,
    path: &str,
    credential: Option<&str>,
) -> Result<(usize, &'a RouteRule), RouteError> {
    // A `..` under an open prefix could land on a protected one after
    // backend normalization.
    if has_dot_segment(path) {
        return Err(RouteError::InvalidPath);
    }
    let (index, rule) = longest_prefix_match(&snapshot.routes, path).ok_or(RouteError::NotFound)?;

    if rule.requires_auth {
        let known = credential
            .filter(|c| !c.is_empty())
            .map(|c| snapshot.credentials.iter().any(|k| k == c))
            .unwrap_or(false);
        if !known {
            return Err(RouteError::Unauthorized);
        }
    }

    Ok((index, rule))
}

/// A resolved rule together with the snapshot generation it came from.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    snapshot: Arc<ConfigurationSnapshot>,
    index: usize,
}

impl RouteMatch {
    pub fn rule(&self) -> &RouteRule {
        &self.snapshot.routes[self.index]
    }

    pub fn snapshot_version(&self) -> SnapshotVersion {
        self.snapshot.version
    }
}

/// Routes requests using whatever snapshot is active at lookup time.
#[derive(Clone)]
pub struct RequestRouter {
    store: Arc<ConfigStore>,
}

impl RequestRouter {
    pub fn new(store: Arc<ConfigStore>) -> Self {
        Self { store }
    }

    pub fn route(&self, path: &str, credential: Option<&str>) -> Result<RouteMatch, RouteError> {
        let snapshot = self.store.active_snapshot();
        let (index, _) = resolve(&snapshot, path, credential)?;
        Ok(RouteMatch { snapshot, index })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::state::SyncState;
    use url::Url;

    fn snapshot() -> ConfigurationSnapshot {
        let open = RouteRule::new("/a", Url::parse("http://open").unwrap());
        let mut secured = RouteRule::new("/a/b", Url::parse("http://secured").unwrap());
        secured.requires_auth = true;
        ConfigurationSnapshot::remote(1, vec![open, secured]).with_credentials(vec!["key-1".into()])
    }

    #[test]
    fn test_resolve_open_route() {
        let snapshot = snapshot();
        let (_, rule) = resolve(&snapshot, "/a/x", None).unwrap();
        assert_eq!(rule.backend_target.host_str(), Some("open"));
    }

    #[test]
    fn test_auth_checked_on_winning_rule() {
        let snapshot = snapshot();
        assert_eq!(resolve(&snapshot, "/a/b/c", None).unwrap_err(), RouteError::Unauthorized);
        assert_eq!(
            resolve(&snapshot, "/a/b/c", Some("wrong")).unwrap_err(),
            RouteError::Unauthorized
        );
        assert_eq!(resolve(&snapshot, "/a/b/c", Some("")).unwrap_err(), RouteError::Unauthorized);

        let (_, rule) = resolve(&snapshot, "/a/b/c", Some("key-1")).unwrap();
        assert_eq!(rule.path_prefix, "/a/b");
    }

    #[test]
    fn test_not_found() {
        let snapshot = snapshot();
        assert_eq!(resolve(&snapshot, "/other", Some("key-1")).unwrap_err(), RouteError::NotFound);
        assert_eq!(
            resolve(&ConfigurationSnapshot::empty(), "/", None).unwrap_err(),
            RouteError::NotFound
        );
    }

    #[tokio::test]
    async fn test_router_follows_commits() {
        let store = Arc::new(ConfigStore::new(None));
        let router = RequestRouter::new(store.clone());
        assert_eq!(router.route("/a", None).unwrap_err(), RouteError::NotFound);

        store.commit(snapshot(), &SyncState::default()).await.unwrap();
        let matched = router.route("/a/b", Some("key-1")).unwrap();
        assert_eq!(matched.snapshot_version(), 1);

        let replacement = ConfigurationSnapshot::remote(
            2,
            vec![RouteRule::new("/a", Url::parse("http://v2").unwrap())],
        );
        store.commit(replacement, &SyncState::default()).await.unwrap();

        // The earlier match keeps its generation
        assert_eq!(matched.rule().backend_target.host_str(), Some("secured"));
        let fresh = router.route("/a/b", None).unwrap();
        assert_eq!(fresh.rule().backend_target.host_str(), Some("v2"));
    }

    #[test]
    fn test_dot_segments_rejected_before_matching() {
        let mut admin = RouteRule::new("/admin", Url::parse("http://shared").unwrap());
        admin.requires_auth = true;
        let public = RouteRule::new("/public", Url::parse("http://shared").unwrap());
        let snapshot = ConfigurationSnapshot::remote(1, vec![public, admin]);

        for path in ["/public/../admin/secrets", "/public/%2E%2E/admin", "/public/./x"] {
            assert_eq!(resolve(&snapshot, path, None).unwrap_err(), RouteError::InvalidPath);
        }
        assert!(resolve(&snapshot, "/public/..hidden", None).is_ok());
    }
}
