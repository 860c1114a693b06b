use anyhow::{Context, Result};
use chrono::Local;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{ConfigMap, Event, Namespace, Node, Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client, Config, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Debug;
use tracing::{debug, warn};

use crate::delta::{MISSING_VALUE, NA_VALUE};
use crate::identity::fqn;
use crate::model::{NamespaceScope, ResourceKind, RowData, TableData};

const NAMESPACE_HEADER: &str = "NAMESPACE";
const MEBIBYTE: u64 = 1_048_576;

type Rows = (Vec<String>, Vec<RowData>);

#[derive(Clone)]
pub struct KubeGateway {
    client: Client,
    context: String,
    cluster: String,
    default_namespace: String,
}

impl KubeGateway {
    pub async fn new() -> Result<Self> {
        let kubeconfig = Kubeconfig::read().ok();

        let config = match kubeconfig.clone() {
            Some(kubeconfig) => {
                Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                    .await
                    .context("failed to load Kubernetes configuration from kubeconfig")?
            }
            None => Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?,
        };

        let cluster = config.cluster_url.to_string();
        let default_namespace = config.default_namespace.clone();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        let context = kubeconfig
            .and_then(|config| config.current_context)
            .unwrap_or_else(|| "in-cluster".to_string());

        Ok(Self {
            client,
            context,
            cluster,
            default_namespace,
        })
    }

    pub fn client(&self) -> Client {
        self.client.clone()
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn default_namespace(&self) -> &str {
        &self.default_namespace
    }

    pub async fn fetch_table(&self, kind: ResourceKind, scope: &NamespaceScope) -> Result<TableData> {
        let refreshed_at = Local::now();
        let (headers, mut rows) = match kind {
            ResourceKind::Pods => self.fetch_pods(scope).await,
            ResourceKind::Deployments => self.fetch_deployments(scope).await,
            ResourceKind::StatefulSets => self.fetch_statefulsets(scope).await,
            ResourceKind::Services => self.fetch_services(scope).await,
            ResourceKind::ConfigMaps => self.fetch_configmaps(scope).await,
            ResourceKind::Events => self.fetch_events(scope).await,
            ResourceKind::Nodes => self.fetch_nodes().await,
            ResourceKind::Namespaces => self.fetch_namespaces().await,
            ResourceKind::Aliases => {
                anyhow::bail!("{} are built locally, not listed", kind.title())
            }
        }
        .with_context(|| format!("failed to list {} in '{scope}'", kind.title()))?;

        rows.sort_by(|left, right| {
            left.namespace
                .cmp(&right.namespace)
                .then_with(|| left.name.cmp(&right.name))
        });
        let headers = with_namespace_column(kind, scope, headers, &mut rows);
        debug!(kind = kind.title(), %scope, rows = rows.len(), "listed resources");

        let mut table = TableData::default();
        table.set_rows(headers, rows, refreshed_at);
        Ok(table)
    }

    fn api<K>(&self, scope: &NamespaceScope) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + Debug,
        <K as kube::Resource>::DynamicType: Default,
    {
        match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        }
    }

    async fn fetch_pod_usage(&self, scope: &NamespaceScope) -> Result<HashMap<String, (u64, u64)>> {
        let gvk = GroupVersionKind::gvk("metrics.k8s.io", "v1beta1", "PodMetrics");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "pods");
        let api: Api<DynamicObject> = match scope {
            NamespaceScope::All => Api::all_with(self.client.clone(), &resource),
            NamespaceScope::Named(namespace) => {
                Api::namespaced_with(self.client.clone(), namespace, &resource)
            }
        };

        let metrics = api.list(&list_params()).await?;
        Ok(metrics
            .into_iter()
            .map(|metric| {
                let key = fqn(&metric.namespace().unwrap_or_default(), &metric.name_any());
                (key, parse_pod_metrics_usage(&metric.data))
            })
            .collect())
    }

    async fn fetch_pods(&self, scope: &NamespaceScope) -> Result<Rows> {
        let pods: Api<Pod> = self.api(scope);
        let list = pods.list(&list_params()).await?;
        let usage = match self.fetch_pod_usage(scope).await {
            Ok(usage) => Some(usage),
            Err(error) => {
                warn!(%error, "pod metrics unavailable");
                None
            }
        };

        let rows = list
            .into_iter()
            .map(|pod| {
                let name = pod.name_any();
                let namespace = pod.namespace();
                let (ready, total, restarts) =
                    pod.status.as_ref().map(pod_readiness).unwrap_or((0, 0, 0));
                let (cpu, memory) = usage_cells(
                    usage.as_ref(),
                    &fqn(namespace.as_deref().unwrap_or_default(), &name),
                );
                let ip = pod
                    .status
                    .as_ref()
                    .and_then(|status| status.pod_ip.clone())
                    .unwrap_or_else(|| MISSING_VALUE.to_string());
                let node = pod
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.node_name.clone())
                    .unwrap_or_else(|| MISSING_VALUE.to_string());

                RowData {
                    name: name.clone(),
                    namespace,
                    columns: vec![
                        name,
                        format!("{ready}/{total}"),
                        pod_phase(&pod),
                        restarts.to_string(),
                        cpu,
                        memory,
                        ip,
                        node,
                        pod_ports(&pod),
                        human_age(pod.metadata.creation_timestamp.as_ref()),
                    ],
                    detail: yaml_detail(&pod),
                }
            })
            .collect::<Vec<_>>();

        Ok((
            headers(&[
                "NAME", "READY", "STATUS", "RESTARTS", "CPU", "MEM", "IP", "NODE", "PORTS", "AGE",
            ]),
            rows,
        ))
    }

    async fn fetch_deployments(&self, scope: &NamespaceScope) -> Result<Rows> {
        let deployments: Api<Deployment> = self.api(scope);
        let list = deployments.list(&list_params()).await?;
        let rows = list
            .into_iter()
            .map(|deployment| {
                let name = deployment.name_any();
                let desired = deployment
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(1);
                let status = deployment.status.as_ref();
                let ready = status.and_then(|status| status.ready_replicas).unwrap_or(0);
                let updated = status
                    .and_then(|status| status.updated_replicas)
                    .unwrap_or(0);
                let available = status
                    .and_then(|status| status.available_replicas)
                    .unwrap_or(0);

                RowData {
                    name: name.clone(),
                    namespace: deployment.namespace(),
                    columns: vec![
                        name,
                        format!("{ready}/{desired}"),
                        updated.to_string(),
                        available.to_string(),
                        human_age(deployment.metadata.creation_timestamp.as_ref()),
                    ],
                    detail: yaml_detail(&deployment),
                }
            })
            .collect::<Vec<_>>();

        Ok((
            headers(&["NAME", "READY", "UP-TO-DATE", "AVAILABLE", "AGE"]),
            rows,
        ))
    }

    async fn fetch_statefulsets(&self, scope: &NamespaceScope) -> Result<Rows> {
        let statefulsets: Api<StatefulSet> = self.api(scope);
        let list = statefulsets.list(&list_params()).await?;
        let rows = list
            .into_iter()
            .map(|statefulset| {
                let name = statefulset.name_any();
                let desired = statefulset
                    .spec
                    .as_ref()
                    .and_then(|spec| spec.replicas)
                    .unwrap_or(1);
                let status = statefulset.status.as_ref();
                let ready = status.and_then(|status| status.ready_replicas).unwrap_or(0);
                let current = status
                    .and_then(|status| status.current_replicas)
                    .unwrap_or(0);

                RowData {
                    name: name.clone(),
                    namespace: statefulset.namespace(),
                    columns: vec![
                        name,
                        format!("{ready}/{desired}"),
                        current.to_string(),
                        human_age(statefulset.metadata.creation_timestamp.as_ref()),
                    ],
                    detail: yaml_detail(&statefulset),
                }
            })
            .collect::<Vec<_>>();

        Ok((headers(&["NAME", "READY", "CURRENT", "AGE"]), rows))
    }

    async fn fetch_services(&self, scope: &NamespaceScope) -> Result<Rows> {
        let services: Api<Service> = self.api(scope);
        let list = services.list(&list_params()).await?;
        let rows = list
            .into_iter()
            .map(|service| {
                let name = service.name_any();
                let spec = service.spec.as_ref();
                let service_type = spec
                    .and_then(|spec| spec.type_.clone())
                    .unwrap_or_else(|| "ClusterIP".to_string());
                let cluster_ip = spec
                    .and_then(|spec| spec.cluster_ip.clone())
                    .unwrap_or_else(|| MISSING_VALUE.to_string());

                RowData {
                    name: name.clone(),
                    namespace: service.namespace(),
                    columns: vec![
                        name,
                        service_type,
                        cluster_ip,
                        service_external_ips(&service),
                        service_ports(&service),
                        human_age(service.metadata.creation_timestamp.as_ref()),
                    ],
                    detail: yaml_detail(&service),
                }
            })
            .collect::<Vec<_>>();

        Ok((
            headers(&["NAME", "TYPE", "CLUSTER-IP", "EXTERNAL-IP", "PORTS", "AGE"]),
            rows,
        ))
    }

    async fn fetch_configmaps(&self, scope: &NamespaceScope) -> Result<Rows> {
        let configmaps: Api<ConfigMap> = self.api(scope);
        let list = configmaps.list(&list_params()).await?;
        let rows = list
            .into_iter()
            .map(|configmap| {
                let name = configmap.name_any();
                let entries = configmap.data.as_ref().map(|data| data.len()).unwrap_or(0)
                    + configmap
                        .binary_data
                        .as_ref()
                        .map(|data| data.len())
                        .unwrap_or(0);

                RowData {
                    name: name.clone(),
                    namespace: configmap.namespace(),
                    columns: vec![
                        name,
                        entries.to_string(),
                        human_age(configmap.metadata.creation_timestamp.as_ref()),
                    ],
                    detail: yaml_detail(&configmap),
                }
            })
            .collect::<Vec<_>>();

        Ok((headers(&["NAME", "DATA", "AGE"]), rows))
    }

    async fn fetch_events(&self, scope: &NamespaceScope) -> Result<Rows> {
        let events: Api<Event> = self.api(scope);
        let list = events.list(&list_params()).await?;
        let rows = list
            .into_iter()
            .map(|event| {
                let name = event.name_any();
                let object = match (
                    event.involved_object.kind.as_deref(),
                    event.involved_object.name.as_deref(),
                ) {
                    (Some(kind), Some(object)) => format!("{}/{object}", kind.to_lowercase()),
                    (None, Some(object)) => object.to_string(),
                    _ => MISSING_VALUE.to_string(),
                };

                RowData {
                    name: name.clone(),
                    namespace: event.namespace(),
                    columns: vec![
                        name,
                        event.type_.clone().unwrap_or_else(|| MISSING_VALUE.to_string()),
                        event.reason.clone().unwrap_or_else(|| MISSING_VALUE.to_string()),
                        object,
                        event.count.unwrap_or(1).to_string(),
                        truncate(event.message.as_deref().unwrap_or_default(), 72),
                        event_age(&event),
                    ],
                    detail: yaml_detail(&event),
                }
            })
            .collect::<Vec<_>>();

        Ok((
            headers(&["NAME", "TYPE", "REASON", "OBJECT", "COUNT", "MESSAGE", "AGE"]),
            rows,
        ))
    }

    async fn fetch_nodes(&self) -> Result<Rows> {
        let nodes: Api<Node> = Api::all(self.client.clone());
        let list = nodes.list(&list_params()).await?;
        let rows = list
            .into_iter()
            .map(|node| {
                let name = node.name_any();
                let ready = node
                    .status
                    .as_ref()
                    .and_then(|status| status.conditions.as_ref())
                    .and_then(|conditions| {
                        conditions
                            .iter()
                            .find(|condition| condition.type_ == "Ready")
                    })
                    .map(|condition| match condition.status.as_str() {
                        "True" => "Ready",
                        "False" => "NotReady",
                        _ => "Unknown",
                    })
                    .unwrap_or("Unknown")
                    .to_string();
                let version = node
                    .status
                    .as_ref()
                    .and_then(|status| status.node_info.as_ref())
                    .map(|info| info.kubelet_version.clone())
                    .unwrap_or_else(|| MISSING_VALUE.to_string());

                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![
                        name,
                        ready,
                        node_roles(&node),
                        version,
                        human_age(node.metadata.creation_timestamp.as_ref()),
                    ],
                    detail: yaml_detail(&node),
                }
            })
            .collect::<Vec<_>>();

        Ok((headers(&["NAME", "STATUS", "ROLES", "VERSION", "AGE"]), rows))
    }

    async fn fetch_namespaces(&self) -> Result<Rows> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces.list(&list_params()).await?;
        let rows = list
            .into_iter()
            .map(|namespace| {
                let name = namespace.name_any();
                let phase = namespace
                    .status
                    .as_ref()
                    .and_then(|status| status.phase.clone())
                    .unwrap_or_else(|| "Active".to_string());

                RowData {
                    name: name.clone(),
                    namespace: None,
                    columns: vec![
                        name,
                        phase,
                        human_age(namespace.metadata.creation_timestamp.as_ref()),
                    ],
                    detail: yaml_detail(&namespace),
                }
            })
            .collect::<Vec<_>>();

        Ok((headers(&["NAME", "STATUS", "AGE"]), rows))
    }
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// Namespaced kinds listed across every namespace lead with a NAMESPACE
/// column, so that the first two columns form the row identity.
fn with_namespace_column(
    kind: ResourceKind,
    scope: &NamespaceScope,
    mut headers: Vec<String>,
    rows: &mut [RowData],
) -> Vec<String> {
    if !kind.namespaced() || *scope != NamespaceScope::All {
        return headers;
    }

    headers.insert(0, NAMESPACE_HEADER.to_string());
    for row in rows {
        let namespace = row
            .namespace
            .clone()
            .unwrap_or_else(|| MISSING_VALUE.to_string());
        row.columns.insert(0, namespace);
    }
    headers
}

fn pod_phase(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }

    let waiting = pod
        .status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .and_then(|statuses| {
            statuses.iter().find_map(|status| {
                status
                    .state
                    .as_ref()
                    .and_then(|state| state.waiting.as_ref())
                    .and_then(|waiting| waiting.reason.clone())
            })
        });
    if let Some(reason) = waiting {
        return reason;
    }

    pod.status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn pod_ports(pod: &Pod) -> String {
    let ports = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .flat_map(|container| {
                    container
                        .ports
                        .iter()
                        .flatten()
                        .map(move |port| {
                            format!(
                                "{}:{}/{}",
                                container.name,
                                port.container_port,
                                port.protocol.as_deref().unwrap_or("TCP")
                            )
                        })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if ports.is_empty() {
        return MISSING_VALUE.to_string();
    }
    ports.join(",")
}

fn service_ports(service: &Service) -> String {
    let ports = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|port| {
                    let protocol = port.protocol.as_deref().unwrap_or("TCP");
                    match port.name.as_deref() {
                        Some(name) if !name.is_empty() => {
                            format!("{name}:{}/{protocol}", port.port)
                        }
                        _ => format!("{}/{protocol}", port.port),
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if ports.is_empty() {
        return MISSING_VALUE.to_string();
    }
    ports.join(",")
}

fn service_external_ips(service: &Service) -> String {
    let mut addresses = service
        .spec
        .as_ref()
        .and_then(|spec| spec.external_ips.clone())
        .unwrap_or_default();
    if let Some(ingress) = service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|balancer| balancer.ingress.as_ref())
    {
        addresses.extend(
            ingress
                .iter()
                .filter_map(|entry| entry.ip.clone().or_else(|| entry.hostname.clone())),
        );
    }

    if addresses.is_empty() {
        return MISSING_VALUE.to_string();
    }
    addresses.join(",")
}

/// CPU and MEM cells of one pod. An unavailable metrics API reads `n/a`; a pod
/// absent from a successful listing reads `<none>` until it is sampled.
fn usage_cells(usage: Option<&HashMap<String, (u64, u64)>>, pod: &str) -> (String, String) {
    let Some(usage) = usage else {
        return (NA_VALUE.to_string(), NA_VALUE.to_string());
    };

    match usage.get(pod) {
        Some((cpu, memory)) => (format!("{cpu}m"), format!("{}Mi", memory / MEBIBYTE)),
        None => (MISSING_VALUE.to_string(), MISSING_VALUE.to_string()),
    }
}

fn parse_pod_metrics_usage(data: &Value) -> (u64, u64) {
    let Some(containers) = data.get("containers").and_then(Value::as_array) else {
        return (0, 0);
    };

    containers
        .iter()
        .fold((0u64, 0u64), |(cpu, memory), container| {
            let (container_cpu, container_memory) = container
                .get("usage")
                .map(parse_usage_from_value)
                .unwrap_or((0, 0));
            (
                cpu.saturating_add(container_cpu),
                memory.saturating_add(container_memory),
            )
        })
}

fn parse_usage_from_value(value: &Value) -> (u64, u64) {
    let cpu = value
        .get("cpu")
        .and_then(Value::as_str)
        .and_then(parse_cpu_millicores)
        .unwrap_or(0);
    let memory = value
        .get("memory")
        .and_then(Value::as_str)
        .and_then(parse_memory_bytes)
        .unwrap_or(0);
    (cpu, memory)
}

fn parse_cpu_millicores(value: &str) -> Option<u64> {
    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    let (number, multiplier) = if let Some(number) = raw.strip_suffix('m') {
        (number, 1.0)
    } else if let Some(number) = raw.strip_suffix('u') {
        (number, 0.001)
    } else if let Some(number) = raw.strip_suffix('n') {
        (number, 0.000_001)
    } else {
        (raw, 1000.0)
    };

    non_negative_round(number.parse::<f64>().ok()? * multiplier)
}

fn parse_memory_bytes(value: &str) -> Option<u64> {
    const UNITS: [(&str, f64); 12] = [
        ("Ei", 1_152_921_504_606_846_976.0),
        ("Pi", 1_125_899_906_842_624.0),
        ("Ti", 1_099_511_627_776.0),
        ("Gi", 1_073_741_824.0),
        ("Mi", 1_048_576.0),
        ("Ki", 1_024.0),
        ("E", 1_000_000_000_000_000_000.0),
        ("P", 1_000_000_000_000_000.0),
        ("T", 1_000_000_000_000.0),
        ("G", 1_000_000_000.0),
        ("M", 1_000_000.0),
        ("k", 1_000.0),
    ];

    let raw = value.trim();
    if raw.is_empty() {
        return None;
    }

    for (suffix, multiplier) in UNITS {
        if let Some(number) = raw.strip_suffix(suffix) {
            return non_negative_round(number.parse::<f64>().ok()? * multiplier);
        }
    }

    non_negative_round(raw.parse::<f64>().ok()?)
}

fn non_negative_round(value: f64) -> Option<u64> {
    let rounded = value.round();
    if !rounded.is_finite() || rounded < 0.0 {
        return None;
    }
    Some(rounded as u64)
}

fn pod_readiness(status: &k8s_openapi::api::core::v1::PodStatus) -> (usize, usize, i32) {
    let container_statuses = status.container_statuses.as_deref().unwrap_or(&[]);
    let total = container_statuses.len();
    let ready = container_statuses
        .iter()
        .filter(|container| container.ready)
        .count();
    let restarts = container_statuses
        .iter()
        .map(|container| container.restart_count)
        .sum();

    (ready, total, restarts)
}

fn node_roles(node: &Node) -> String {
    let Some(labels) = node.metadata.labels.as_ref() else {
        return MISSING_VALUE.to_string();
    };

    let mut roles = labels
        .keys()
        .filter_map(|key| key.strip_prefix("node-role.kubernetes.io/"))
        .map(|role| {
            if role.is_empty() {
                "worker".to_string()
            } else {
                role.to_string()
            }
        })
        .collect::<Vec<_>>();

    if roles.is_empty() {
        return MISSING_VALUE.to_string();
    }
    roles.sort();
    roles.dedup();
    roles.join(",")
}

fn event_age(event: &Event) -> String {
    if let Some(event_time) = event.event_time.as_ref() {
        return human_age_timestamp(event_time.0);
    }

    human_age(
        event
            .last_timestamp
            .as_ref()
            .or(event.first_timestamp.as_ref())
            .or(event.metadata.creation_timestamp.as_ref()),
    )
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }

    let mut out = value
        .chars()
        .take(max.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn human_age(timestamp: Option<&Time>) -> String {
    let Some(timestamp) = timestamp else {
        return MISSING_VALUE.to_string();
    };

    human_age_timestamp(timestamp.0)
}

fn human_age_timestamp(ts: k8s_openapi::jiff::Timestamp) -> String {
    let elapsed_seconds = (k8s_openapi::jiff::Timestamp::now().as_second() - ts.as_second()).max(0);
    format_elapsed_seconds(elapsed_seconds)
}

/// Two-unit duration such as `2m33s`, `3h4m` or `5d2h`.
fn format_elapsed_seconds(seconds: i64) -> String {
    const UNITS: [(i64, &str); 4] = [(86_400, "d"), (3_600, "h"), (60, "m"), (1, "s")];

    let seconds = seconds.max(0);
    for (index, (size, unit)) in UNITS.iter().enumerate() {
        if seconds < *size {
            continue;
        }

        let major = seconds / size;
        let remainder = seconds % size;
        return match UNITS.get(index + 1) {
            Some((minor_size, minor_unit)) if remainder / minor_size > 0 => {
                format!("{major}{unit}{}{minor_unit}", remainder / minor_size)
            }
            _ => format!("{major}{unit}"),
        };
    }

    "0s".to_string()
}

fn yaml_detail<T>(value: &T) -> String
where
    T: Serialize,
{
    serde_yaml::to_string(value).unwrap_or_else(|error| format!("failed to format detail: {error}"))
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}

#[cfg(test)]
mod tests {
    use super::{
        format_elapsed_seconds, parse_cpu_millicores, parse_memory_bytes, parse_pod_metrics_usage,
        pod_ports, service_ports, truncate, usage_cells, with_namespace_column,
    };
    use crate::delta::{DeltaMarker, MISSING_VALUE, NA_VALUE, classify};
    use crate::model::{NamespaceScope, ResourceKind, RowData};
    use k8s_openapi::api::core::v1::{
        Container, ContainerPort, Pod, PodSpec, Service, ServicePort, ServiceSpec,
    };
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn unsampled_pod_reads_missing_until_metrics_arrive() {
        let sampled = HashMap::from([("default/api".to_string(), (250, 64 * 1_048_576))]);

        assert_eq!(
            usage_cells(Some(&sampled), "default/api"),
            ("250m".to_string(), "64Mi".to_string())
        );
        let (cpu, memory) = usage_cells(Some(&sampled), "default/new");
        assert_eq!(cpu, MISSING_VALUE);
        assert_eq!(memory, MISSING_VALUE);
        assert_eq!(
            usage_cells(None, "default/api"),
            (NA_VALUE.to_string(), NA_VALUE.to_string())
        );

        let later = HashMap::from([("default/new".to_string(), (5, 1_048_576))]);
        let (cpu_later, _) = usage_cells(Some(&later), "default/new");
        assert_eq!(classify(&cpu, &cpu_later), DeltaMarker::Indeterminate);
    }

    #[test]
    fn elapsed_time_uses_two_units() {
        let cases = [
            (0, "0s"),
            (42, "42s"),
            (60, "1m"),
            (153, "2m33s"),
            (3_600, "1h"),
            (11_040, "3h4m"),
            (439_200, "5d2h"),
            (86_400 * 3, "3d"),
        ];
        for (seconds, expected) in cases {
            assert_eq!(format_elapsed_seconds(seconds), expected, "seconds={seconds}");
        }
    }

    #[test]
    fn all_namespace_listing_prepends_namespace_column() {
        let mut rows = vec![RowData {
            name: "api".to_string(),
            namespace: Some("prod".to_string()),
            columns: vec!["api".to_string(), "1/1".to_string()],
            detail: String::new(),
        }];
        let headers = with_namespace_column(
            ResourceKind::Pods,
            &NamespaceScope::All,
            vec!["NAME".to_string(), "READY".to_string()],
            &mut rows,
        );
        assert_eq!(headers, vec!["NAMESPACE", "NAME", "READY"]);
        assert_eq!(rows[0].columns, vec!["prod", "api", "1/1"]);
    }

    #[test]
    fn single_namespace_and_cluster_kinds_keep_name_first() {
        let mut rows = vec![RowData {
            name: "node-1".to_string(),
            namespace: None,
            columns: vec!["node-1".to_string()],
            detail: String::new(),
        }];
        let headers = with_namespace_column(
            ResourceKind::Nodes,
            &NamespaceScope::All,
            vec!["NAME".to_string()],
            &mut rows,
        );
        assert_eq!(headers, vec!["NAME"]);

        let headers = with_namespace_column(
            ResourceKind::Pods,
            &NamespaceScope::Named("prod".to_string()),
            vec!["NAME".to_string()],
            &mut rows,
        );
        assert_eq!(headers, vec!["NAME"]);
        assert_eq!(rows[0].columns, vec!["node-1"]);
    }

    #[test]
    fn pod_ports_name_their_container() {
        let pod = Pod {
            spec: Some(PodSpec {
                containers: vec![
                    Container {
                        name: "web".to_string(),
                        ports: Some(vec![
                            ContainerPort {
                                container_port: 8080,
                                ..ContainerPort::default()
                            },
                            ContainerPort {
                                container_port: 53,
                                protocol: Some("UDP".to_string()),
                                ..ContainerPort::default()
                            },
                        ]),
                        ..Container::default()
                    },
                    Container {
                        name: "sidecar".to_string(),
                        ..Container::default()
                    },
                ],
                ..PodSpec::default()
            }),
            ..Pod::default()
        };
        assert_eq!(pod_ports(&pod), "web:8080/TCP,web:53/UDP");
        assert_eq!(pod_ports(&Pod::default()), MISSING_VALUE);
    }

    #[test]
    fn service_ports_use_port_name_when_present() {
        let service = Service {
            spec: Some(ServiceSpec {
                ports: Some(vec![
                    ServicePort {
                        name: Some("http".to_string()),
                        port: 80,
                        ..ServicePort::default()
                    },
                    ServicePort {
                        port: 53,
                        protocol: Some("UDP".to_string()),
                        ..ServicePort::default()
                    },
                ]),
                ..ServiceSpec::default()
            }),
            ..Service::default()
        };
        assert_eq!(service_ports(&service), "http:80/TCP,53/UDP");
    }

    #[test]
    fn metrics_quantities_parse() {
        assert_eq!(parse_cpu_millicores("250m"), Some(250));
        assert_eq!(parse_cpu_millicores("2"), Some(2_000));
        assert_eq!(parse_cpu_millicores("1500000n"), Some(2));
        assert_eq!(parse_memory_bytes("64Mi"), Some(64 * 1_048_576));
        assert_eq!(parse_memory_bytes("1k"), Some(1_000));
        assert_eq!(parse_memory_bytes("bogus"), None);
    }

    #[test]
    fn pod_metrics_sum_containers() {
        let data = json!({
            "containers": [
                {"name": "web", "usage": {"cpu": "100m", "memory": "10Mi"}},
                {"name": "sidecar", "usage": {"cpu": "5m", "memory": "2Mi"}}
            ]
        });
        assert_eq!(parse_pod_metrics_usage(&data), (105, 12 * 1_048_576));
        assert_eq!(parse_pod_metrics_usage(&json!({})), (0, 0));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 4), "abc…");
    }
}
