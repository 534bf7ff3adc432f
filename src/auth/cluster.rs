//! Request cluster routing.

use http::Uri;

use crate::types::ClusterId;

/// How the authenticator extracts the target cluster from a request URI.
pub type ClusterRoute = fn(&Uri) -> Option<ClusterId>;

/// Extract the target cluster from a proxied path.
///
/// Requests routed to a downstream cluster carry it in the path as
/// `/k8s/clusters/<id>/...`; everything else targets no cluster.
pub fn cluster_from_uri(uri: &Uri) -> Option<ClusterId> {
    let mut segments = uri.path().split('/').filter(|s| !s.is_empty());
    if segments.next() != Some("k8s") || segments.next() != Some("clusters") {
        return None;
    }
    segments.next().map(ClusterId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> Uri {
        path.parse().unwrap()
    }

    #[test]
    fn test_cluster_path() {
        assert_eq!(
            cluster_from_uri(&uri("/k8s/clusters/c-955nj/api/v1/pods")),
            Some(ClusterId::new("c-955nj"))
        );
    }

    #[test]
    fn test_cluster_path_without_trailing_segments() {
        assert_eq!(
            cluster_from_uri(&uri("/k8s/clusters/c-955nj")),
            Some(ClusterId::new("c-955nj"))
        );
    }

    #[test]
    fn test_non_cluster_paths() {
        assert_eq!(cluster_from_uri(&uri("/")), None);
        assert_eq!(cluster_from_uri(&uri("/v1/whoami")), None);
        assert_eq!(cluster_from_uri(&uri("/k8s/clusters")), None);
        assert_eq!(cluster_from_uri(&uri("/k8s/other/c-955nj")), None);
        assert_eq!(cluster_from_uri(&uri("/clusters/c-955nj")), None);
    }

    #[test]
    fn test_query_is_ignored() {
        assert_eq!(
            cluster_from_uri(&uri("/k8s/clusters/c-955nj/api?watch=true")),
            Some(ClusterId::new("c-955nj"))
        );
    }
}
