//! Credential discovery for the credentials initializer.
//!
//! Secrets attached to the run's service account are matched by their
//! `tekton.dev/git-*` and `tekton.dev/docker-*` annotations; each match becomes one
//! flag for the initializer and one mounted secret volume.
use tkr_model::{Secret, Volume, VolumeMount};
use tracing::{debug, warn};

use crate::{error::ClientError, ports::ClusterClient};

pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";
pub const SECRET_TYPE_BASIC_AUTH: &str = "kubernetes.io/basic-auth";
pub const SECRET_TYPE_SSH_AUTH: &str = "kubernetes.io/ssh-auth";

const GIT_ANNOTATION_PREFIX: &str = "tekton.dev/git-";
const DOCKER_ANNOTATION_PREFIX: &str = "tekton.dev/docker-";
const SECRETS_DIR: &str = "/var/build-secrets";

/// Flags and secrets handed to the credentials initializer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub flags: Vec<String>,
    /// Names of secrets that produced at least one flag.
    pub secrets: Vec<String>,
}

impl Credentials {
    pub fn volumes(&self) -> Vec<Volume> {
        self.secrets
            .iter()
            .map(|s| Volume::secret(volume_name(s), s.clone()))
            .collect()
    }

    pub fn mounts(&self) -> Vec<VolumeMount> {
        self.secrets
            .iter()
            .map(|s| VolumeMount::new(volume_name(s), format!("{SECRETS_DIR}/{s}")))
            .collect()
    }

    fn absorb(&mut self, secret: &Secret) {
        let name = &secret.metadata.name;
        let before = self.flags.len();

        for (key, url) in secret.metadata.annotations.iter() {
            let flag = if key.starts_with(GIT_ANNOTATION_PREFIX) {
                match secret.type_.as_str() {
                    SECRET_TYPE_BASIC_AUTH => Some("basic-git"),
                    SECRET_TYPE_SSH_AUTH => Some("ssh-git"),
                    _ => None,
                }
            } else if key.starts_with(DOCKER_ANNOTATION_PREFIX) {
                (secret.type_ == SECRET_TYPE_BASIC_AUTH).then_some("basic-docker")
            } else {
                None
            };
            if let Some(flag) = flag {
                self.flags.push(format!("-{flag}={name}={url}"));
            }
        }

        if self.flags.len() > before {
            self.secrets.push(name.clone());
        }
    }
}

fn volume_name(secret: &str) -> String {
    format!("secret-volume-{secret}")
}

/// Collect credentials for `service_account` (or the namespace default).
///
/// A missing default account yields no credentials; a missing named account is an
/// error. Secrets listed by the account but absent from the cluster are skipped.
pub async fn collect(
    client: &dyn ClusterClient,
    namespace: &str,
    service_account: Option<&str>,
) -> Result<Credentials, ClientError> {
    let name = service_account
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_SERVICE_ACCOUNT);

    let account = match client.get_service_account(namespace, name).await {
        Ok(sa) => sa,
        Err(e) if e.is_not_found() && name == DEFAULT_SERVICE_ACCOUNT => {
            debug!(namespace, "no default service account, skipping credentials");
            return Ok(Credentials::default());
        }
        Err(e) => return Err(e),
    };

    let mut creds = Credentials::default();
    for reference in &account.secrets {
        match client.get_secret(namespace, &reference.name).await {
            Ok(secret) => creds.absorb(&secret),
            Err(e) if e.is_not_found() => {
                warn!(namespace, secret = %reference.name, "service account lists a missing secret");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(creds)
}
