//! Kubernetes manifest generation.
//!
//! The manifest always carries a Deployment and a Service. A ConfigMap,
//! Secret and PersistentVolumeClaim are prepended and a
//! HorizontalPodAutoscaler appended only when their input section is present.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_yaml::Mapping;
use std::collections::BTreeMap;

use super::GenerateError;
use super::dockerfile::EnvVar;
use crate::domain::naming::resource_base_name;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpec {
    pub size: String,
    pub mount_path: String,
    #[serde(default)]
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoscalingSpec {
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub cpu_utilization: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceSpec {
    pub cpu_request: Option<String>,
    pub memory_request: Option<String>,
    pub cpu_limit: Option<String>,
    pub memory_limit: Option<String>,
}

/// Inputs of the manifest generator. Empty optional sections count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestParams {
    pub username: String,
    pub project_name: String,
    pub image: String,
    pub container_port: u16,
    pub replicas: Option<u32>,
    pub config_map: Option<Vec<EnvVar>>,
    pub secret: Option<Vec<EnvVar>>,
    pub volume: Option<VolumeSpec>,
    pub autoscaling: Option<AutoscalingSpec>,
    pub resources: Option<ResourceSpec>,
}

// ============================================================================
// Kubernetes object shapes (only the fields we emit)
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMeta {
    name: String,
    labels: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigMap {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    data: Mapping,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Secret {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    #[serde(rename = "type")]
    secret_type: &'static str,
    data: Mapping,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PersistentVolumeClaim {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    spec: PvcSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PvcSpec {
    access_modes: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    storage_class_name: Option<String>,
    resources: PvcResources,
}

#[derive(Serialize)]
struct PvcResources {
    requests: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Deployment {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    spec: DeploymentSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentSpec {
    replicas: u32,
    selector: LabelSelector,
    template: PodTemplate,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LabelSelector {
    match_labels: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
struct PodTemplate {
    metadata: PodMeta,
    spec: PodSpec,
}

#[derive(Serialize)]
struct PodMeta {
    labels: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    security_context: PodSecurityContext,
    containers: Vec<Container>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volumes: Vec<PodVolume>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PodSecurityContext {
    run_as_non_root: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Container {
    name: String,
    image: String,
    ports: Vec<ContainerPort>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    env_from: Vec<EnvFromSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resources: Option<ContainerResources>,
    security_context: ContainerSecurityContext,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volume_mounts: Vec<VolumeMount>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainerPort {
    container_port: u16,
    protocol: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvFromSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_map_ref: Option<NameRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_ref: Option<NameRef>,
}

#[derive(Serialize)]
struct NameRef {
    name: String,
}

#[derive(Serialize)]
struct ContainerResources {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    requests: BTreeMap<&'static str, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    limits: BTreeMap<&'static str, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ContainerSecurityContext {
    allow_privilege_escalation: bool,
    run_as_non_root: bool,
    capabilities: Capabilities,
}

#[derive(Serialize)]
struct Capabilities {
    drop: Vec<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VolumeMount {
    name: &'static str,
    mount_path: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PodVolume {
    name: &'static str,
    persistent_volume_claim: ClaimRef,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ClaimRef {
    claim_name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Service {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    spec: ServiceSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceSpec {
    #[serde(rename = "type")]
    service_type: &'static str,
    selector: BTreeMap<&'static str, String>,
    ports: Vec<ServicePort>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServicePort {
    port: u16,
    target_port: u16,
    protocol: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HorizontalPodAutoscaler {
    api_version: &'static str,
    kind: &'static str,
    metadata: ObjectMeta,
    spec: HpaSpec,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HpaSpec {
    scale_target_ref: ScaleTargetRef,
    min_replicas: u32,
    max_replicas: u32,
    metrics: Vec<HpaMetric>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScaleTargetRef {
    api_version: &'static str,
    kind: &'static str,
    name: String,
}

#[derive(Serialize)]
struct HpaMetric {
    #[serde(rename = "type")]
    metric_type: &'static str,
    resource: HpaResource,
}

#[derive(Serialize)]
struct HpaResource {
    name: &'static str,
    target: HpaTarget,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HpaTarget {
    #[serde(rename = "type")]
    target_type: &'static str,
    average_utilization: u32,
}

const DATA_VOLUME: &str = "data";

// ============================================================================
// Generation
// ============================================================================

/// Renders the multi-document manifest for one project.
pub fn generate(params: &ManifestParams) -> Result<String, GenerateError> {
    validate(params)?;

    let base = resource_base_name(&params.username, &params.project_name);
    let labels = labels(&base, params);
    let meta = |name: String| ObjectMeta {
        name,
        labels: labels.clone(),
    };

    let config_map = non_empty(params.config_map.as_deref());
    let secret = non_empty(params.secret.as_deref());

    let mut documents = Vec::with_capacity(6);

    if let Some(entries) = config_map {
        documents.push(to_yaml(&ConfigMap {
            api_version: "v1",
            kind: "ConfigMap",
            metadata: meta(format!("{base}-config")),
            data: mapping(entries, |v| v.to_string()),
        })?);
    }

    if let Some(entries) = secret {
        documents.push(to_yaml(&Secret {
            api_version: "v1",
            kind: "Secret",
            metadata: meta(format!("{base}-secret")),
            secret_type: "Opaque",
            data: mapping(entries, |v| STANDARD.encode(v.as_bytes())),
        })?);
    }

    if let Some(volume) = &params.volume {
        documents.push(to_yaml(&PersistentVolumeClaim {
            api_version: "v1",
            kind: "PersistentVolumeClaim",
            metadata: meta(format!("{base}-pvc")),
            spec: PvcSpec {
                access_modes: vec!["ReadWriteOnce"],
                storage_class_name: volume
                    .storage_class
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
                resources: PvcResources {
                    requests: BTreeMap::from([("storage", volume.size.trim().to_string())]),
                },
            },
        })?);
    }

    let mut env_from = Vec::new();
    if config_map.is_some() {
        env_from.push(EnvFromSource {
            config_map_ref: Some(NameRef {
                name: format!("{base}-config"),
            }),
            secret_ref: None,
        });
    }
    if secret.is_some() {
        env_from.push(EnvFromSource {
            config_map_ref: None,
            secret_ref: Some(NameRef {
                name: format!("{base}-secret"),
            }),
        });
    }

    let (volume_mounts, volumes) = match &params.volume {
        Some(volume) => (
            vec![VolumeMount {
                name: DATA_VOLUME,
                mount_path: volume.mount_path.trim().to_string(),
            }],
            vec![PodVolume {
                name: DATA_VOLUME,
                persistent_volume_claim: ClaimRef {
                    claim_name: format!("{base}-pvc"),
                },
            }],
        ),
        None => (Vec::new(), Vec::new()),
    };

    let selector = BTreeMap::from([("app.kubernetes.io/name", base.clone())]);

    documents.push(to_yaml(&Deployment {
        api_version: "apps/v1",
        kind: "Deployment",
        metadata: meta(base.clone()),
        spec: DeploymentSpec {
            replicas: params.replicas.unwrap_or(1),
            selector: LabelSelector {
                match_labels: selector.clone(),
            },
            template: PodTemplate {
                metadata: PodMeta {
                    labels: labels.clone(),
                },
                spec: PodSpec {
                    security_context: PodSecurityContext {
                        run_as_non_root: true,
                    },
                    containers: vec![Container {
                        name: base.clone(),
                        image: params.image.trim().to_string(),
                        ports: vec![ContainerPort {
                            container_port: params.container_port,
                            protocol: "TCP",
                        }],
                        env_from,
                        resources: params.resources.as_ref().and_then(container_resources),
                        security_context: ContainerSecurityContext {
                            allow_privilege_escalation: false,
                            run_as_non_root: true,
                            capabilities: Capabilities { drop: vec!["ALL"] },
                        },
                        volume_mounts,
                    }],
                    volumes,
                },
            },
        },
    })?);

    documents.push(to_yaml(&Service {
        api_version: "v1",
        kind: "Service",
        metadata: meta(format!("{base}-service")),
        spec: ServiceSpec {
            service_type: "ClusterIP",
            selector,
            ports: vec![ServicePort {
                port: 80,
                target_port: params.container_port,
                protocol: "TCP",
            }],
        },
    })?);

    if let Some(hpa) = params.autoscaling {
        documents.push(to_yaml(&HorizontalPodAutoscaler {
            api_version: "autoscaling/v2",
            kind: "HorizontalPodAutoscaler",
            metadata: meta(format!("{base}-hpa")),
            spec: HpaSpec {
                scale_target_ref: ScaleTargetRef {
                    api_version: "apps/v1",
                    kind: "Deployment",
                    name: base.clone(),
                },
                min_replicas: hpa.min_replicas,
                max_replicas: hpa.max_replicas,
                metrics: vec![HpaMetric {
                    metric_type: "Resource",
                    resource: HpaResource {
                        name: "cpu",
                        target: HpaTarget {
                            target_type: "Utilization",
                            average_utilization: hpa.cpu_utilization,
                        },
                    },
                }],
            },
        })?);
    }

    Ok(documents.join("---\n"))
}

fn labels(base: &str, params: &ManifestParams) -> BTreeMap<&'static str, String> {
    BTreeMap::from([
        ("app.kubernetes.io/name", base.to_string()),
        ("shipwright.io/owner", params.username.trim().to_string()),
        ("shipwright.io/project", params.project_name.trim().to_string()),
    ])
}

fn non_empty(entries: Option<&[EnvVar]>) -> Option<&[EnvVar]> {
    entries.filter(|e| !e.is_empty())
}

fn mapping(entries: &[EnvVar], encode: impl Fn(&str) -> String) -> Mapping {
    let mut map = Mapping::new();
    for entry in entries {
        map.insert(entry.key.clone().into(), encode(&entry.value).into());
    }
    map
}

fn container_resources(spec: &ResourceSpec) -> Option<ContainerResources> {
    let pick = |pairs: [(&'static str, &Option<String>); 2]| -> BTreeMap<&'static str, String> {
        pairs
            .into_iter()
            .filter_map(|(k, v)| {
                v.as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| (k, s.to_string()))
            })
            .collect()
    };
    let requests = pick([("cpu", &spec.cpu_request), ("memory", &spec.memory_request)]);
    let limits = pick([("cpu", &spec.cpu_limit), ("memory", &spec.memory_limit)]);
    if requests.is_empty() && limits.is_empty() {
        None
    } else {
        Some(ContainerResources { requests, limits })
    }
}

fn to_yaml<T: Serialize>(value: &T) -> Result<String, GenerateError> {
    serde_yaml::to_string(value).map_err(|e| GenerateError::Render(e.to_string()))
}

fn validate(params: &ManifestParams) -> Result<(), GenerateError> {
    for (parameter, value) in [
        ("username", &params.username),
        ("projectName", &params.project_name),
        ("image", &params.image),
    ] {
        if value.trim().is_empty() {
            return Err(GenerateError::invalid(parameter, "must not be empty"));
        }
    }

    if params.container_port == 0 {
        return Err(GenerateError::invalid(
            "containerPort",
            "must be between 1 and 65535",
        ));
    }

    if params.replicas == Some(0) {
        return Err(GenerateError::invalid("replicas", "must be at least 1"));
    }

    for (parameter, entries) in [("configMap", &params.config_map), ("secret", &params.secret)] {
        for entry in entries.iter().flatten() {
            let key = entry.key.as_str();
            if key.is_empty()
                || !key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            {
                return Err(GenerateError::invalid(
                    parameter,
                    format!("'{key}' is not a valid data key"),
                ));
            }
        }
    }

    if let Some(volume) = &params.volume {
        if volume.size.trim().is_empty() {
            return Err(GenerateError::invalid("volume.size", "must not be empty"));
        }
        if !volume.mount_path.trim().starts_with('/') {
            return Err(GenerateError::invalid(
                "volume.mountPath",
                "must be an absolute path",
            ));
        }
    }

    if let Some(hpa) = params.autoscaling {
        if hpa.min_replicas == 0 {
            return Err(GenerateError::invalid(
                "autoscaling.minReplicas",
                "must be at least 1",
            ));
        }
        if hpa.min_replicas > hpa.max_replicas {
            return Err(GenerateError::invalid(
                "autoscaling.maxReplicas",
                "must not be lower than minReplicas",
            ));
        }
        if !(1..=100).contains(&hpa.cpu_utilization) {
            return Err(GenerateError::invalid(
                "autoscaling.cpuUtilization",
                "must be between 1 and 100",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde::Deserialize as _;
    use serde_yaml::Value;

    fn base_params() -> ManifestParams {
        ManifestParams {
            username: "alice".to_string(),
            project_name: "blog".to_string(),
            image: "registry.local/alice-blog:latest".to_string(),
            container_port: 8080,
            ..ManifestParams::default()
        }
    }

    fn documents(yaml: &str) -> Vec<Value> {
        serde_yaml::Deserializer::from_str(yaml)
            .map(|doc| Value::deserialize(doc).unwrap())
            .collect()
    }

    fn kinds(yaml: &str) -> Vec<String> {
        documents(yaml)
            .iter()
            .map(|d| d["kind"].as_str().unwrap().to_string())
            .collect()
    }

    #[rstest]
    fn optional_sections_toggle_independently(
        #[values(false, true)] with_config: bool,
        #[values(false, true)] with_secret: bool,
        #[values(false, true)] with_volume: bool,
        #[values(false, true)] with_hpa: bool,
    ) {
        let mut params = base_params();
        if with_config {
            params.config_map = Some(vec![EnvVar::new("MODE", "production")]);
        }
        if with_secret {
            params.secret = Some(vec![EnvVar::new("DB_PASSWORD", "hunter2")]);
        }
        if with_volume {
            params.volume = Some(VolumeSpec {
                size: "1Gi".to_string(),
                mount_path: "/data".to_string(),
                storage_class: None,
            });
        }
        if with_hpa {
            params.autoscaling = Some(AutoscalingSpec {
                min_replicas: 1,
                max_replicas: 4,
                cpu_utilization: 70,
            });
        }

        let yaml = generate(&params).unwrap();

        let mut expected = Vec::new();
        if with_config {
            expected.push("ConfigMap");
        }
        if with_secret {
            expected.push("Secret");
        }
        if with_volume {
            expected.push("PersistentVolumeClaim");
        }
        expected.push("Deployment");
        expected.push("Service");
        if with_hpa {
            expected.push("HorizontalPodAutoscaler");
        }
        assert_eq!(kinds(&yaml), expected);

        let docs = documents(&yaml);
        let deployment = docs.iter().find(|d| d["kind"] == "Deployment").unwrap();
        let container = &deployment["spec"]["template"]["spec"]["containers"][0];
        let env_from = container["envFrom"].as_sequence().map_or(0, Vec::len);
        assert_eq!(env_from, usize::from(with_config) + usize::from(with_secret));
        assert_eq!(container["volumeMounts"].is_sequence(), with_volume);
    }

    #[test]
    fn secret_values_round_trip_through_base64() {
        let originals = [
            ("PLAIN", "hunter2"),
            ("UNICODE", "pässwörd ✓"),
            ("EMPTY", ""),
            ("SYMBOLS", "a+b/c=d\n"),
        ];
        let mut params = base_params();
        params.secret = Some(
            originals
                .iter()
                .map(|(k, v)| EnvVar::new(*k, *v))
                .collect(),
        );

        let yaml = generate(&params).unwrap();
        let docs = documents(&yaml);
        let secret = docs.iter().find(|d| d["kind"] == "Secret").unwrap();

        for (key, original) in originals {
            let encoded = secret["data"][key].as_str().unwrap();
            let decoded = STANDARD.decode(encoded).unwrap();
            assert_eq!(String::from_utf8(decoded).unwrap(), original);
        }
    }

    #[test]
    fn objects_are_named_and_labelled_after_owner_and_project() {
        let mut params = base_params();
        params.config_map = Some(vec![EnvVar::new("A", "1")]);
        params.autoscaling = Some(AutoscalingSpec {
            min_replicas: 2,
            max_replicas: 5,
            cpu_utilization: 60,
        });

        let docs = documents(&generate(&params).unwrap());
        let names: Vec<&str> = docs
            .iter()
            .map(|d| d["metadata"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["alice-blog-config", "alice-blog", "alice-blog-service", "alice-blog-hpa"]
        );
        for doc in &docs {
            let labels = &doc["metadata"]["labels"];
            assert_eq!(labels["shipwright.io/owner"], "alice");
            assert_eq!(labels["shipwright.io/project"], "blog");
        }
        let hpa = docs.last().unwrap();
        assert_eq!(hpa["spec"]["scaleTargetRef"]["name"], "alice-blog");
    }

    #[test]
    fn pod_never_runs_as_root() {
        let docs = documents(&generate(&base_params()).unwrap());
        let deployment = docs.iter().find(|d| d["kind"] == "Deployment").unwrap();
        let pod = &deployment["spec"]["template"]["spec"];
        assert_eq!(pod["securityContext"]["runAsNonRoot"], true);
        let container = &pod["containers"][0];
        assert_eq!(container["securityContext"]["allowPrivilegeEscalation"], false);
        assert_eq!(container["ports"][0]["containerPort"], 8080);
        assert_eq!(deployment["spec"]["replicas"], 1);
    }

    #[rstest]
    #[case::empty_image(|p: &mut ManifestParams| p.image = String::new())]
    #[case::zero_port(|p: &mut ManifestParams| p.container_port = 0)]
    #[case::zero_replicas(|p: &mut ManifestParams| p.replicas = Some(0))]
    #[case::hpa_inverted(|p: &mut ManifestParams| p.autoscaling = Some(AutoscalingSpec { min_replicas: 5, max_replicas: 2, cpu_utilization: 50 }))]
    #[case::hpa_cpu(|p: &mut ManifestParams| p.autoscaling = Some(AutoscalingSpec { min_replicas: 1, max_replicas: 2, cpu_utilization: 150 }))]
    #[case::relative_mount(|p: &mut ManifestParams| p.volume = Some(VolumeSpec { size: "1Gi".into(), mount_path: "data".into(), storage_class: None }))]
    #[case::bad_key(|p: &mut ManifestParams| p.config_map = Some(vec![EnvVar::new("has space", "x")]))]
    fn invalid_input_is_rejected(#[case] mutate: fn(&mut ManifestParams)) {
        let mut params = base_params();
        mutate(&mut params);
        let err = generate(&params).unwrap_err();
        assert!(err.is_validation(), "{err}");
    }
}
