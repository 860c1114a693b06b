//! Stable comparison keys for resources whose generated names change between
//! refreshes.

const TCP_SUFFIX: &str = "/TCP";

// Alphabet used by the apiserver when it generates pod-template hashes and
// pod name suffixes (no vowels, no ambiguous digits).
const SAFE_ENCODING: &str = "bcdfghjklmnpqrstvwxz2456789";

pub fn is_tcp_port(descriptor: &str) -> bool {
    descriptor.ends_with(TCP_SUFFIX)
}

/// Joins a namespace and a name into the canonical `namespace/name` identity.
/// An empty namespace yields the bare name.
pub fn fqn(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        return name.to_string();
    }

    format!("{namespace}/{name}")
}

/// Identity of a container that survives pod replacement: the owning
/// workload's base name is recovered from the pod name before the container is
/// appended, so `ns/web-78f8b5d78c-f8588` and `ns/web-1` both become `ns/web`.
pub fn container_id(resource_path: &str, container: &str) -> String {
    let (namespace, name) = match resource_path.rsplit_once('/') {
        Some((namespace, name)) => (namespace, name),
        None => ("", resource_path),
    };

    format!("{}:{container}", fqn(namespace, workload_base_name(name)))
}

/// Extracts the port token from `host:port`, `port` or `service:port/PROTO`.
pub fn strip_port(descriptor: &str) -> String {
    let tail = match descriptor.rsplit_once(':') {
        Some((_, tail)) => tail,
        None => descriptor,
    };

    match tail.split_once('/') {
        Some((port, _)) => port.to_string(),
        None => tail.to_string(),
    }
}

/// Name of the workload owning a pod: the pod-template hash and suffix of a
/// Deployment pod, or the ordinal of a StatefulSet pod, are dropped.
pub fn workload_base_name(name: &str) -> &str {
    let mut tokens = name.rsplitn(3, '-');
    let last = tokens.next().unwrap_or_default();
    let middle = tokens.next();
    let head = tokens.next();

    if let (Some(template_hash), Some(base)) = (middle, head)
        && !base.is_empty()
        && is_pod_suffix(last)
        && is_template_hash(template_hash)
    {
        return base;
    }

    if let Some((base, ordinal)) = name.rsplit_once('-')
        && !base.is_empty()
        && !ordinal.is_empty()
        && ordinal.chars().all(|c| c.is_ascii_digit())
    {
        return base;
    }

    name
}

fn is_pod_suffix(token: &str) -> bool {
    token.len() == 5 && is_safe_encoded(token)
}

fn is_template_hash(token: &str) -> bool {
    (6..=10).contains(&token.len()) && is_safe_encoded(token)
}

fn is_safe_encoded(token: &str) -> bool {
    token.chars().all(|c| SAFE_ENCODING.contains(c))
}

#[cfg(test)]
mod tests {
    use super::{container_id, fqn, is_tcp_port, strip_port};

    #[test]
    fn tcp_ports_are_detected_by_protocol_suffix() {
        assert!(is_tcp_port("80/TCP"));
        assert!(is_tcp_port("http:8080/TCP"));
        assert!(!is_tcp_port("80/UDP"));
        assert!(!is_tcp_port("80/tcp"));
        assert!(!is_tcp_port("8080"));
    }

    #[test]
    fn fqn_joins_namespace_and_name() {
        assert_eq!(fqn("blee", "fred"), "blee/fred");
        assert_eq!(fqn("", "fred"), "fred");
    }

    #[test]
    fn container_id_strips_generated_suffixes() {
        let cases = [
            ("fred/blee", "c1", "fred/blee:c1"),
            ("fred/blee-78f8b5d78c-f8588", "c1", "fred/blee:c1"),
            ("fred/blee-1", "c1", "fred/blee:c1"),
            ("fred/blee-web-12", "nginx", "fred/blee-web:nginx"),
            ("blee-78f8b5d78c-f8588", "c1", "blee:c1"),
        ];

        for (path, container, expected) in cases {
            assert_eq!(container_id(path, container), expected, "path={path}");
        }
    }

    #[test]
    fn container_id_keeps_names_that_only_look_hashed() {
        assert_eq!(
            container_id("fred/my-backend-abcde", "c1"),
            "fred/my-backend-abcde:c1"
        );
        assert_eq!(container_id("fred/-1", "c1"), "fred/-1:c1");
        assert_eq!(container_id("fred/blee-", "c1"), "fred/blee-:c1");
    }

    #[test]
    fn container_id_is_stable_across_pod_replacement() {
        let before = container_id("prod/api-5d9c7f6b48-x2kzq", "app");
        let after = container_id("prod/api-5d9c7f6b48-9rtvw", "app");
        assert_eq!(before, after);
    }

    #[test]
    fn strip_port_extracts_port_token() {
        assert_eq!(strip_port("fred:8000"), "8000");
        assert_eq!(strip_port("8000"), "8000");
        assert_eq!(strip_port("dns:53/UDP"), "53");
        assert_eq!(strip_port("53/UDP"), "53");
        assert_eq!(strip_port("c1:http:8080/TCP"), "8080");
    }
}
