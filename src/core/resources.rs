use crate::core::chunk::{FileChunks, CHUNK_SIZE};
use crate::core::client::ContainerClient;
use crate::domain::ports::ControlChannel;
use crate::utils::error::{DeployError, Result};
use std::path::Path;
use walkdir::WalkDir;

/// Relative directory of `file` below `root`, `/`-separated, `""` for the root.
pub fn relative_dir(root: &Path, file: &Path) -> String {
    file.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(DeployError::InvalidPath {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Mirrors a local directory into the module's resource namespace on the container.
/// Additive: nothing already on the container is removed.
pub async fn sync_resources<C: ControlChannel>(
    client: &ContainerClient<C>,
    key: &str,
    local_path: &Path,
    chunk_size: usize,
) -> Result<usize> {
    ensure_directory(local_path)?;
    tracing::info!("upload resource files ...");

    let mut files = 0;
    for entry in WalkDir::new(local_path).follow_links(true) {
        let entry = entry.map_err(|e| DeployError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let dir = relative_dir(local_path, entry.path());
        let file_name = entry.file_name().to_string_lossy().into_owned();
        tracing::debug!("resource {}/{}", dir, file_name);
        for chunk in FileChunks::open(entry.path(), chunk_size.max(1))? {
            let (offset, bytes) = chunk?;
            client
                .put_resource_file(key, &dir, &file_name, offset, bytes)
                .await?;
        }
        files += 1;
    }

    Ok(files)
}

pub async fn sync_resource_dir<C: ControlChannel>(
    client: &ContainerClient<C>,
    key: &str,
    local_path: &Path,
) -> Result<usize> {
    sync_resources(client, key, local_path, CHUNK_SIZE).await
}

pub fn copy_dir(src: &Path, dest: &Path) -> Result<usize> {
    ensure_directory(src)?;
    std::fs::create_dir_all(dest)?;

    let mut files = 0;
    for entry in WalkDir::new(src).follow_links(true) {
        let entry = entry.map_err(|e| DeployError::Io(e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if entry.file_type().is_file() {
            std::fs::copy(entry.path(), &target)?;
            files += 1;
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingChannel;
    use crate::core::client::methods;
    use crate::domain::model::DeploymentTarget;
    use serde_json::json;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"hello").unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), b"world!").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_sync_mirrors_tree() {
        let dir = tree();
        let channel = RecordingChannel::new();
        let client = ContainerClient::new(channel.clone(), DeploymentTarget::default());

        let files = sync_resource_dir(&client, "svcA", dir.path()).await.unwrap();

        assert_eq!(files, 2);
        let mut calls: Vec<_> = channel
            .calls_to(methods::PUT_RESOURCE_FILE)
            .into_iter()
            .map(|c| (c.args[1].clone(), c.args[2].clone(), c.args[3].clone()))
            .collect();
        calls.sort_by_key(|c| c.0.to_string());
        assert_eq!(
            calls,
            vec![
                (json!(""), json!("a.txt"), json!(0)),
                (json!("sub"), json!("b.txt"), json!(0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_sync_chunks_large_files() {
        let dir = tree();
        let channel = RecordingChannel::new();
        let client = ContainerClient::new(channel.clone(), DeploymentTarget::default());

        sync_resources(&client, "svcA", dir.path(), 4).await.unwrap();

        let b_offsets: Vec<_> = channel
            .calls_to(methods::PUT_RESOURCE_FILE)
            .into_iter()
            .filter(|c| c.args[2] == json!("b.txt"))
            .map(|c| c.args[3].clone())
            .collect();
        assert_eq!(b_offsets, vec![json!(0), json!(4)]);
    }

    #[tokio::test]
    async fn test_sync_rejects_missing_dir() {
        let channel = RecordingChannel::new();
        let client = ContainerClient::new(channel.clone(), DeploymentTarget::default());

        let err = sync_resource_dir(&client, "svcA", Path::new("/definitely/not/here"))
            .await
            .unwrap_err();

        assert!(matches!(err, DeployError::InvalidPath { .. }));
        assert!(channel.calls().is_empty());
    }

    #[test]
    fn test_relative_dir() {
        let root = Path::new("/res");
        assert_eq!(relative_dir(root, Path::new("/res/a.txt")), "");
        assert_eq!(relative_dir(root, Path::new("/res/x/y/b.txt")), "x/y");
    }

    #[test]
    fn test_copy_dir() {
        let src = tree();
        let dest = TempDir::new().unwrap();

        let files = copy_dir(src.path(), &dest.path().join("svcA")).unwrap();

        assert_eq!(files, 2);
        assert_eq!(std::fs::read(dest.path().join("svcA/sub/b.txt")).unwrap(), b"world!");
    }
}
