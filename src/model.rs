use chrono::{DateTime, Local};
use std::fmt::{Display, Formatter};

use crate::identity::fqn;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Pods,
    Deployments,
    StatefulSets,
    Services,
    ConfigMaps,
    Events,
    Nodes,
    Namespaces,
    /// Command tokens known to krill; listed locally, never fetched.
    Aliases,
}

impl ResourceKind {
    pub const ALL: [Self; 9] = [
        Self::Pods,
        Self::Deployments,
        Self::StatefulSets,
        Self::Services,
        Self::ConfigMaps,
        Self::Events,
        Self::Nodes,
        Self::Namespaces,
        Self::Aliases,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pods => "Pods",
            Self::Deployments => "Deployments",
            Self::StatefulSets => "StatefulSets",
            Self::Services => "Services",
            Self::ConfigMaps => "ConfigMaps",
            Self::Events => "Events",
            Self::Nodes => "Nodes",
            Self::Namespaces => "Namespaces",
            Self::Aliases => "Aliases",
        }
    }

    /// Built-in command tokens, canonical token first.
    pub fn tokens(self) -> &'static [&'static str] {
        match self {
            Self::Pods => &["pods", "po", "pod"],
            Self::Deployments => &["deploy", "dp", "deployment", "deployments"],
            Self::StatefulSets => &["sts", "statefulset", "statefulsets"],
            Self::Services => &["svc", "service", "services"],
            Self::ConfigMaps => &[
                "cm",
                "configmap",
                "configmaps",
                "config-map",
                "config-maps",
            ],
            Self::Events => &["ev", "event", "events"],
            Self::Nodes => &["no", "node", "nodes"],
            Self::Namespaces => &["ns", "namespace", "namespaces"],
            Self::Aliases => &["aliases", "alias", "a"],
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.tokens().contains(&token.as_str()))
    }

    /// Canonical command token, the form recorded in the navigation history.
    pub fn command(self) -> &'static str {
        self.tokens()[0]
    }

    pub fn api_group(self) -> &'static str {
        match self {
            Self::Deployments | Self::StatefulSets => "apps/v1",
            Self::Aliases => "krill",
            _ => "v1",
        }
    }

    pub fn namespaced(self) -> bool {
        !matches!(self, Self::Nodes | Self::Namespaces | Self::Aliases)
    }

    /// Kinds whose table is built in-process instead of listed from the
    /// cluster.
    pub fn local(self) -> bool {
        matches!(self, Self::Aliases)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    /// Parses a namespace argument; `all`, `*` and the empty string select
    /// every namespace.
    pub fn parse(token: &str) -> Self {
        match token.trim() {
            "" | "*" | "all" => Self::All,
            namespace => Self::Named(namespace.to_string()),
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Named(namespace) => namespace.clone(),
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RowData {
    pub name: String,
    pub namespace: Option<String>,
    pub columns: Vec<String>,
    pub detail: String,
}

impl RowData {
    pub fn id(&self) -> String {
        fqn(self.namespace.as_deref().unwrap_or_default(), &self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<RowData>,
    pub last_refreshed: Option<DateTime<Local>>,
}

impl TableData {
    pub fn set_rows(
        &mut self,
        headers: Vec<String>,
        rows: Vec<RowData>,
        refreshed_at: DateTime<Local>,
    ) {
        self.headers = headers;
        self.rows = rows;
        self.last_refreshed = Some(refreshed_at);
    }
}

#[cfg(test)]
mod tests {
    use super::{NamespaceScope, ResourceKind, RowData};

    #[test]
    fn resource_aliases_map_to_expected_kinds() {
        assert_eq!(ResourceKind::from_token("po"), Some(ResourceKind::Pods));
        assert_eq!(
            ResourceKind::from_token("Deployments"),
            Some(ResourceKind::Deployments)
        );
        assert_eq!(
            ResourceKind::from_token("config-maps"),
            Some(ResourceKind::ConfigMaps)
        );
        assert_eq!(ResourceKind::from_token("no"), Some(ResourceKind::Nodes));
        assert_eq!(ResourceKind::from_token("crd"), None);
        assert_eq!(ResourceKind::from_token("alias"), Some(ResourceKind::Aliases));
    }

    #[test]
    fn canonical_commands_round_trip() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_token(kind.command()), Some(kind));
        }
    }

    #[test]
    fn cluster_scoped_kinds_are_not_namespaced() {
        assert!(!ResourceKind::Nodes.namespaced());
        assert!(!ResourceKind::Namespaces.namespaced());
        assert!(!ResourceKind::Aliases.namespaced());
        assert!(ResourceKind::Pods.namespaced());
    }

    #[test]
    fn tokens_are_unique_across_kinds() {
        let mut seen = std::collections::HashSet::new();
        for kind in ResourceKind::ALL {
            for token in kind.tokens() {
                assert!(seen.insert(*token), "duplicate token {token}");
            }
        }
        assert!(ResourceKind::Aliases.local());
        assert!(!ResourceKind::Pods.local());
    }

    #[test]
    fn namespace_scope_parses_all_sentinels() {
        assert_eq!(NamespaceScope::parse("all"), NamespaceScope::All);
        assert_eq!(NamespaceScope::parse("*"), NamespaceScope::All);
        assert_eq!(NamespaceScope::parse(""), NamespaceScope::All);
        assert_eq!(
            NamespaceScope::parse("kube-system"),
            NamespaceScope::Named("kube-system".to_string())
        );
    }

    #[test]
    fn row_identity_uses_namespace_when_present() {
        let namespaced = RowData {
            name: "api".to_string(),
            namespace: Some("prod".to_string()),
            ..RowData::default()
        };
        let cluster_scoped = RowData {
            name: "node-1".to_string(),
            ..RowData::default()
        };
        assert_eq!(namespaced.id(), "prod/api");
        assert_eq!(cluster_scoped.id(), "node-1");
    }
}
