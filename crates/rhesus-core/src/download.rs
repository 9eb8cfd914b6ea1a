//! Mutation-download side channel.
//!
//! The named structure is fetched and written into the download directory
//! under the requested filename. Failures never reach the conversation:
//! they are logged and the download is simply absent.

use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

use crate::structure::StructureSource;

/// Reduce a model-supplied filename to a bare file name
pub fn sanitize_filename(filename: &str) -> Option<String> {
    Path::new(filename.trim())
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .filter(|name| !name.is_empty() && name != "." && name != "..")
}

/// Fetch `structure_id` and save it as `filename` inside `dir`
pub async fn save_structure<S: StructureSource>(
    source: &S,
    structure_id: &str,
    filename: &str,
    dir: &Path,
) -> Result<PathBuf> {
    let name = sanitize_filename(filename)
        .ok_or_else(|| anyhow!("Invalid download filename: {}", filename))?;

    let text = source.fetch(structure_id).await?;

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Could not create {}", dir.display()))?;
    let path = dir.join(name);
    tokio::fs::write(&path, text)
        .await
        .with_context(|| format!("Could not write {}", path.display()))?;

    Ok(path)
}

/// Run a download, logging the outcome instead of returning an error
pub async fn download<S: StructureSource>(
    source: &S,
    structure_id: &str,
    filename: &str,
    dir: &Path,
) -> Option<PathBuf> {
    match save_structure(source, structure_id, filename, dir).await {
        Ok(path) => {
            tracing::info!("downloaded {} to {}", structure_id, path.display());
            Some(path)
        }
        Err(error) => {
            tracing::warn!("error downloading structure file {}: {:#}", filename, error);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::FetchError;
    use tempfile::tempdir;

    struct Archive;

    impl StructureSource for Archive {
        async fn fetch(&self, structure_id: &str) -> Result<String, FetchError> {
            match structure_id {
                "1TUP" => Ok("HEADER    1TUP\nEND\n".to_string()),
                other => Err(FetchError::Status {
                    id: other.to_string(),
                    status: 404,
                }),
            }
        }
    }

    #[test]
    fn filenames_lose_directories() {
        assert_eq!(sanitize_filename("1TUP_A_248_GLN.pdb").as_deref(), Some("1TUP_A_248_GLN.pdb"));
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("  "), None);
    }

    #[tokio::test]
    async fn writes_file_under_requested_name() {
        let dir = tempdir().unwrap();
        let path = download(&Archive, "1TUP", "1TUP_A_248_GLN.pdb", dir.path())
            .await
            .expect("downloaded");

        assert_eq!(path, dir.path().join("1TUP_A_248_GLN.pdb"));
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("HEADER"));
    }

    #[tokio::test]
    async fn failed_fetch_writes_nothing() {
        let dir = tempdir().unwrap();
        let result = download(&Archive, "NOUNDERSCORE.pdb", "NOUNDERSCORE.pdb", dir.path()).await;

        assert!(result.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
