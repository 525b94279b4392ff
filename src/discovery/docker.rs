//! Docker Engine orchestrator.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::models::{ContainerInspectResponse, EventMessage};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::StreamExt;

use crate::discovery::orchestrator::{
    DiscoveryError, EventKind, EventStream, InstanceDescriptor, InstanceDetails, LifecycleEvent,
    Orchestrator, OrchestratorSession,
};

/// Orchestrator backed by the Docker Engine API.
///
/// Honours `DOCKER_HOST` and the other standard Docker client variables.
pub struct DockerOrchestrator {
    docker: Docker,
}

impl DockerOrchestrator {
    /// Build the client from the environment. Does not contact the daemon.
    pub fn from_env() -> Result<Self, DiscoveryError> {
        let docker = Docker::connect_with_defaults()?;
        Ok(Self { docker })
    }
}

#[async_trait]
impl Orchestrator for DockerOrchestrator {
    async fn connect(&self) -> Result<Box<dyn OrchestratorSession>, DiscoveryError> {
        let docker = self
            .docker
            .clone()
            .negotiate_version()
            .await
            .map_err(|e| DiscoveryError::Connect(e.to_string()))?;
        docker
            .ping()
            .await
            .map_err(|e| DiscoveryError::Connect(e.to_string()))?;

        tracing::info!("Connected to Docker");
        Ok(Box::new(DockerSession { docker }))
    }
}

struct DockerSession {
    docker: Docker,
}

#[async_trait]
impl OrchestratorSession for DockerSession {
    async fn list_instances(&self, label: &str) -> Result<Vec<InstanceDescriptor>, DiscoveryError> {
        let mut filters = HashMap::new();
        filters.insert("label".to_string(), vec![label.to_string()]);
        let opts = ListContainersOptions::<String> {
            all: false,
            filters,
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(opts)).await?;
        Ok(containers
            .into_iter()
            .filter_map(|c| {
                let id = c.id?;
                let name = c
                    .names
                    .and_then(|names| names.into_iter().next())
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_else(|| id.clone());
                Some(InstanceDescriptor {
                    id,
                    name,
                    image: c.image.unwrap_or_default(),
                })
            })
            .collect())
    }

    async fn inspect(&self, id: &str) -> Result<InstanceDetails, DiscoveryError> {
        let detail = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;
        Ok(details_from_inspect(&detail))
    }

    async fn subscribe_events(&self, label: &str) -> Result<EventStream, DiscoveryError> {
        let filters: HashMap<String, Vec<String>> = [
            ("type", vec!["container"]),
            ("event", vec!["start", "die"]),
            ("label", vec![label]),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.into_iter().map(str::to_string).collect()))
        .collect();
        let opts = EventsOptions::<String> {
            filters,
            ..Default::default()
        };

        let stream = self
            .docker
            .events(Some(opts))
            .map(|msg| msg.map(lifecycle_event).map_err(DiscoveryError::from));
        Ok(stream.boxed())
    }
}

/// Default-network IP (falling back to any attached network) plus every
/// exposed container port.
fn details_from_inspect(detail: &ContainerInspectResponse) -> InstanceDetails {
    let mut details = InstanceDetails::default();

    if let Some(settings) = &detail.network_settings {
        details.address = settings
            .ip_address
            .clone()
            .filter(|ip| !ip.is_empty())
            .or_else(|| {
                settings.networks.as_ref().and_then(|networks| {
                    networks
                        .values()
                        .filter_map(|net| net.ip_address.clone())
                        .find(|ip| !ip.is_empty())
                })
            });

        if let Some(ports) = &settings.ports {
            details.exposed_ports.extend(ports.keys().filter_map(|k| parse_port_key(k)));
        }
    }

    if let Some(exposed) = detail.config.as_ref().and_then(|c| c.exposed_ports.as_ref()) {
        details.exposed_ports.extend(exposed.keys().filter_map(|k| parse_port_key(k)));
    }

    details.exposed_ports.sort_unstable();
    details.exposed_ports.dedup();
    details
}

/// Parse Docker's `"80/tcp"` port keys.
fn parse_port_key(key: &str) -> Option<u16> {
    key.split('/').next()?.parse().ok()
}

fn lifecycle_event(msg: EventMessage) -> LifecycleEvent {
    let kind = match msg.action.as_deref() {
        Some("start") => EventKind::Started,
        Some("die") | Some("stop") | Some("kill") => EventKind::Stopped,
        other => EventKind::Other(other.unwrap_or_default().to_string()),
    };
    let instance_id = msg.actor.and_then(|actor| actor.id).unwrap_or_default();
    LifecycleEvent { kind, instance_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::{ContainerConfig, EndpointSettings, EventActor, NetworkSettings};

    #[test]
    fn test_port_keys() {
        assert_eq!(parse_port_key("80/tcp"), Some(80));
        assert_eq!(parse_port_key("1541"), Some(1541));
        assert_eq!(parse_port_key("x/udp"), None);
    }

    #[test]
    fn test_details_prefer_default_network_ip() {
        let detail = ContainerInspectResponse {
            network_settings: Some(NetworkSettings {
                ip_address: Some("172.17.0.4".into()),
                ports: Some(HashMap::from([("80/tcp".to_string(), None)])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let details = details_from_inspect(&detail);
        assert_eq!(details.address.as_deref(), Some("172.17.0.4"));
        assert_eq!(details.exposed_ports, vec![80]);
    }

    #[test]
    fn test_details_fall_back_to_attached_network() {
        let detail = ContainerInspectResponse {
            network_settings: Some(NetworkSettings {
                ip_address: Some(String::new()),
                networks: Some(HashMap::from([(
                    "crs".to_string(),
                    EndpointSettings {
                        ip_address: Some("10.5.0.7".into()),
                        ..Default::default()
                    },
                )])),
                ..Default::default()
            }),
            config: Some(ContainerConfig {
                exposed_ports: Some(HashMap::from([("1542/tcp".to_string(), HashMap::new())])),
                ..Default::default()
            }),
            ..Default::default()
        };
        let details = details_from_inspect(&detail);
        assert_eq!(details.address.as_deref(), Some("10.5.0.7"));
        assert_eq!(details.exposed_ports, vec![1542]);
    }

    #[test]
    fn test_event_translation() {
        let event = lifecycle_event(EventMessage {
            action: Some("die".into()),
            actor: Some(EventActor {
                id: Some("abc".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(event.kind, EventKind::Stopped);
        assert_eq!(event.instance_id, "abc");
    }
}
