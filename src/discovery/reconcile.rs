//! Full enumeration of running backends into a registry snapshot.

use crate::discovery::orchestrator::{DiscoveryError, OrchestratorSession};
use crate::registry::{Endpoint, Snapshot};

/// Separator between image name and tag.
const TAG_SEPARATOR: char = ':';

/// Version encoded in an image reference: the text after the last `:`.
///
/// Returns `None` for untagged references (`crserver`, `registry:5000/crserver`)
/// and empty tags. The tag itself is not checked against any version format.
pub fn version_from_image(image: &str) -> Option<&str> {
    let (_, tag) = image.rsplit_once(TAG_SEPARATOR)?;
    if tag.is_empty() || tag.contains('/') {
        return None;
    }
    Some(tag)
}

/// Build a snapshot from every labelled instance exposing `service_port`.
///
/// Instances that cannot be routed are skipped with a log line. When two
/// instances report the same version, the one listed last wins. Only a
/// failure to list instances is an error.
pub async fn reconcile(
    session: &dyn OrchestratorSession,
    label: &str,
    service_port: u16,
) -> Result<Snapshot, DiscoveryError> {
    let instances = session.list_instances(label).await?;
    let mut snapshot = Snapshot::new();

    for instance in instances {
        let details = match session.inspect(&instance.id).await {
            Ok(details) => details,
            Err(e) => {
                // Usually an instance that stopped between list and inspect.
                tracing::warn!(instance = %instance.name, error = %e, "Skipping instance: inspect failed");
                continue;
            }
        };

        if !details.exposed_ports.contains(&service_port) {
            tracing::info!(
                instance = %instance.name,
                port = service_port,
                "Skipping instance: service port not exposed"
            );
            continue;
        }

        let Some(version) = version_from_image(&instance.image) else {
            tracing::warn!(
                instance = %instance.name,
                image = %instance.image,
                "Skipping instance: cannot detect version from image tag"
            );
            continue;
        };

        let endpoint = match details.address.as_deref().map(Endpoint::parse) {
            Some(Ok(endpoint)) => endpoint,
            Some(Err(e)) => {
                tracing::warn!(instance = %instance.name, error = %e, "Skipping instance: bad address");
                continue;
            }
            None => {
                tracing::warn!(instance = %instance.name, "Skipping instance: no network address");
                continue;
            }
        };

        tracing::debug!(instance = %instance.name, version = %version, endpoint = %endpoint, "Discovered backend");
        if let Some(previous) = snapshot.insert(version, endpoint) {
            tracing::warn!(version = %version, replaced = %previous, "Duplicate version; last instance wins");
        }
    }

    Ok(snapshot)
}
