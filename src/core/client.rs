use crate::domain::model::{ArtifactCoordinate, ArtifactState, DeploymentTarget, RuntimeSnapshot};
use crate::domain::ports::ControlChannel;
use crate::utils::error::{DeployError, RemoteError, Result};
use serde_json::{json, Value};

/// Wire names of the container control methods.
pub mod methods {
    pub const GET_RUNTIME: &str = "getRuntime";
    pub const HAS_JAR: &str = "hasJar";
    pub const UPLOAD_JAR: &str = "uploadJar";
    pub const REGISTER_JAR: &str = "registerJar";
    pub const UNREGISTER_JAR: &str = "unregisterJar";
    pub const UNINSTALL: &str = "uninstall";
    pub const INSTALL: &str = "install";
    pub const SET_CONFIG: &str = "setConfig";
    pub const SET_STATUS: &str = "setStatus";
    pub const PUT_RESOURCE_FILE: &str = "putResourceFile";
}

pub const STATUS_RUNNING: i64 = 1;

pub struct ContainerClient<C: ControlChannel> {
    channel: C,
    target: DeploymentTarget,
}

impl<C: ControlChannel> ContainerClient<C> {
    pub fn new(channel: C, target: DeploymentTarget) -> Self {
        Self { channel, target }
    }

    pub fn target(&self) -> &DeploymentTarget {
        &self.target
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    async fn call(&self, method: &str, args: Vec<Value>) -> std::result::Result<Value, RemoteError> {
        tracing::debug!("→ {} {}", method, self.target);
        self.channel.call(method, args).await
    }

    pub async fn get_runtime(&self) -> Result<RuntimeSnapshot> {
        let value = self.call(methods::GET_RUNTIME, vec![]).await?;
        if value.is_null() {
            return Ok(RuntimeSnapshot::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    pub async fn has_artifact(&self, coordinate: &ArtifactCoordinate) -> Result<ArtifactState> {
        let value = self
            .call(methods::HAS_JAR, coordinate_args(coordinate))
            .await
            .map_err(|e| DeployError::install(coordinate.to_string(), e))?;
        let code = value.as_i64().ok_or_else(|| {
            DeployError::install(
                coordinate.to_string(),
                RemoteError::new(methods::HAS_JAR, format!("unexpected result {}", value)),
            )
        })?;
        Ok(ArtifactState::from_code(code))
    }

    pub async fn upload(&self, file_name: &str, offset: u64, bytes: Vec<u8>) -> Result<()> {
        self.call(
            methods::UPLOAD_JAR,
            vec![json!(file_name), json!(offset), Value::from(bytes)],
        )
        .await
        .map_err(|e| DeployError::install(file_name, e))?;
        Ok(())
    }

    pub async fn register(
        &self,
        coordinate: &ArtifactCoordinate,
        file_name: &str,
        depends: Option<&[ArtifactCoordinate]>,
    ) -> Result<()> {
        let depends = depends.map_or(Value::Null, |deps| {
            Value::Array(deps.iter().map(ArtifactCoordinate::to_args).collect())
        });
        let mut args = coordinate_args(coordinate);
        args.push(json!(file_name));
        args.push(depends);
        self.call(methods::REGISTER_JAR, args)
            .await
            .map_err(|e| DeployError::install(coordinate.to_string(), e))?;
        Ok(())
    }

    pub async fn unregister(&self, coordinate: &ArtifactCoordinate) -> std::result::Result<(), RemoteError> {
        self.call(methods::UNREGISTER_JAR, coordinate_args(coordinate))
            .await
            .map(|_| ())
    }

    /// Returns the container's reference count; zero means fully removed.
    pub async fn uninstall(&self, key: &str) -> Result<i64> {
        let value = self.call(methods::UNINSTALL, vec![json!(key)]).await?;
        if value.is_null() {
            return Ok(0);
        }
        value.as_i64().ok_or_else(|| {
            RemoteError::new(methods::UNINSTALL, format!("unexpected result {}", value)).into()
        })
    }

    pub async fn install(
        &self,
        name: Option<&str>,
        class_name: &str,
        owner: &ArtifactCoordinate,
    ) -> std::result::Result<(), RemoteError> {
        self.call(
            methods::INSTALL,
            vec![json!(name), json!(class_name), owner.to_args()],
        )
        .await
        .map(|_| ())
    }

    pub async fn set_config(&self, key: &str, payload: &str) -> Result<()> {
        self.call(methods::SET_CONFIG, vec![json!(key), json!(payload)])
            .await
            .map_err(|e| DeployError::install(key, e))?;
        Ok(())
    }

    pub async fn set_status(&self, key: &str, status: i64) -> Result<bool> {
        let value = self
            .call(methods::SET_STATUS, vec![json!(key), json!(status)])
            .await
            .map_err(|e| DeployError::install(key, e))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    pub async fn put_resource_file(
        &self,
        key: &str,
        dir: &str,
        file_name: &str,
        offset: u64,
        bytes: Vec<u8>,
    ) -> Result<()> {
        self.call(
            methods::PUT_RESOURCE_FILE,
            vec![
                json!(key),
                json!(dir),
                json!(file_name),
                json!(offset),
                Value::from(bytes),
            ],
        )
        .await
        .map_err(|e| DeployError::install(format!("{}/{}", key, file_name), e))?;
        Ok(())
    }
}

fn coordinate_args(coordinate: &ArtifactCoordinate) -> Vec<Value> {
    vec![
        json!(coordinate.group_id),
        json!(coordinate.artifact_id),
        json!(coordinate.version),
    ]
}
