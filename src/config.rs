//! Step definitions loaded from YAML.
//!
//! ```yaml
//! delete:
//!   ref:
//!     apiVersion: v1
//!     kind: ConfigMap
//!     labels:
//!       app: demo
//!   deletionPropagationPolicy: Foreground
//!   timeout: 30
//! ```
//!
//! Instead of `ref`, `file` may point to a manifest file, relative to the step
//! file. Each document in it becomes a target.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_with::serde_as;
use snafu::{ResultExt, Snafu};

use crate::{client::Propagation, resource::TargetSpec};

pub const DEFAULT_DELETE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("could not read {}: {}", path.display(), source))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("could not parse {}: {}", path.display(), source))]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("invalid manifest in {}: {}", path.display(), source))]
    Manifest {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[snafu(display("a delete step needs exactly one of `ref` or `file`"))]
    Ambiguous,
}

/// A test step holding a single operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub delete: DeleteConfig,
}

impl StepConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path).context(ReadSnafu { path })?;
        serde_yaml::from_str(&text).context(ParseSnafu { path })
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DeleteConfig {
    /// The resource(s) to delete.
    #[serde(default, rename = "ref")]
    pub target: Option<TargetSpec>,

    /// A manifest file whose documents name the resources to delete.
    #[serde(default)]
    pub file: Option<PathBuf>,

    #[serde(default)]
    pub deletion_propagation_policy: Propagation,

    /// Seconds to wait for every resource to be gone.
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

const fn default_timeout() -> Duration {
    DEFAULT_DELETE_TIMEOUT
}

impl DeleteConfig {
    /// The targets this step deletes; `file` is resolved against `base_dir`.
    pub fn targets(&self, base_dir: &Path) -> Result<Vec<TargetSpec>, Error> {
        match (&self.target, &self.file) {
            (Some(target), None) => Ok(vec![target.clone()]),
            (None, Some(file)) => load_manifests(&base_dir.join(file)),
            _ => AmbiguousSnafu.fail(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    api_version: String,
    kind: String,
    #[serde(default)]
    metadata: ManifestMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct ManifestMetadata {
    name: Option<String>,
    namespace: Option<String>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
}

impl From<Manifest> for TargetSpec {
    fn from(manifest: Manifest) -> Self {
        Self {
            api_version: manifest.api_version,
            kind: manifest.kind,
            name: manifest.metadata.name,
            namespace: manifest.metadata.namespace,
            labels: manifest.metadata.labels,
            field_selector: None,
        }
    }
}

fn load_manifests(path: &Path) -> Result<Vec<TargetSpec>, Error> {
    let text = std::fs::read_to_string(path).context(ReadSnafu { path })?;

    let mut targets = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&text) {
        let value = serde_yaml::Value::deserialize(document).context(ParseSnafu { path })?;
        if value.is_null() {
            continue;
        }
        let manifest: Manifest =
            serde_yaml::from_value(value).context(ManifestSnafu { path })?;
        targets.push(manifest.into());
    }
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn inline_reference() {
        let step: StepConfig = serde_yaml::from_str(
            r#"
delete:
  ref:
    apiVersion: v1
    kind: ConfigMap
    name: settings
  deletionPropagationPolicy: Foreground
  timeout: 30
"#,
        )
        .unwrap();

        assert_eq!(
            step.delete.targets(Path::new(".")).unwrap(),
            vec![TargetSpec::new("v1", "ConfigMap").named("settings")]
        );
        assert_eq!(step.delete.deletion_propagation_policy, Propagation::Foreground);
        assert_eq!(step.delete.timeout, Duration::from_secs(30));
    }

    #[test]
    fn defaults() {
        let step: StepConfig = serde_yaml::from_str(
            r#"
delete:
  ref:
    apiVersion: apps/v1
    kind: Deployment
"#,
        )
        .unwrap();

        assert_eq!(step.delete.deletion_propagation_policy, Propagation::Background);
        assert_eq!(step.delete.timeout, DEFAULT_DELETE_TIMEOUT);
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = serde_yaml::from_str::<StepConfig>(
            r#"
delete:
  ref:
    apiVersion: v1
    kind: Pod
  bogus: true
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn timeout_key_follows_camel_case() {
        let result = serde_yaml::from_str::<StepConfig>(
            r#"
delete:
  ref:
    apiVersion: v1
    kind: Pod
  timeout_secs: 30
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn needs_exactly_one_source() {
        let neither: StepConfig = serde_yaml::from_str("delete: {}").unwrap();
        assert!(matches!(
            neither.delete.targets(Path::new(".")),
            Err(Error::Ambiguous)
        ));

        let both: StepConfig = serde_yaml::from_str(
            r#"
delete:
  ref:
    apiVersion: v1
    kind: Pod
  file: pods.yaml
"#,
        )
        .unwrap();
        assert!(matches!(
            both.delete.targets(Path::new(".")),
            Err(Error::Ambiguous)
        ));
    }

    #[test]
    fn manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifests = std::fs::File::create(dir.path().join("resources.yaml")).unwrap();
        write!(
            manifests,
            r#"
apiVersion: v1
kind: ConfigMap
metadata:
  name: settings
  namespace: demo
data:
  key: value
---
apiVersion: apps/v1
kind: Deployment
metadata:
  labels:
    app: web
---
"#
        )
        .unwrap();

        let step_path = dir.path().join("step.yaml");
        std::fs::write(&step_path, "delete:\n  file: resources.yaml\n").unwrap();

        let step = StepConfig::load(&step_path).unwrap();
        let targets = step.delete.targets(dir.path()).unwrap();
        assert_eq!(
            targets,
            vec![
                TargetSpec::new("v1", "ConfigMap")
                    .named("settings")
                    .within("demo"),
                TargetSpec::new("apps/v1", "Deployment").with_label("app", "web"),
            ]
        );
    }

    #[test]
    fn manifest_without_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        std::fs::write(&path, "apiVersion: v1\nmetadata:\n  name: x\n").unwrap();

        assert!(matches!(
            load_manifests(&path),
            Err(Error::Manifest { .. })
        ));
    }

    #[test]
    fn missing_step_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            StepConfig::load(&dir.path().join("absent.yaml")),
            Err(Error::Read { .. })
        ));
    }
}
