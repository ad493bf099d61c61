// Built-in option providers for dynamic-enum fields

use std::path::Path;
use std::sync::Arc;

use commitsmith_service::{
    EnumOption, OptionsContext, OptionsProvider, ProviderError, ProviderRegistry,
};

pub const GIT_BRANCHES: &str = "git.branches";

/// Local branch names read from the repository's refs
pub struct GitBranchesProvider;

impl GitBranchesProvider {
    async fn loose_refs(heads: &Path, prefix: &str, out: &mut Vec<String>) -> std::io::Result<()> {
        let mut pending = vec![(heads.to_path_buf(), prefix.to_string())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = format!("{}{}", prefix, entry.file_name().to_string_lossy());
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), format!("{}/", name)));
                } else {
                    out.push(name);
                }
            }
        }

        Ok(())
    }

    async fn packed_refs(git_dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
        let content = match tokio::fs::read_to_string(git_dir.join("packed-refs")).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err),
        };

        out.extend(content.lines().filter_map(|line| {
            let (_, reference) = line.split_once(' ')?;
            reference.strip_prefix("refs/heads/").map(str::to_string)
        }));
        Ok(())
    }
}

#[async_trait::async_trait]
impl OptionsProvider for GitBranchesProvider {
    async fn provide_options(&self, context: &OptionsContext) -> Result<Vec<EnumOption>, ProviderError> {
        let repository = context
            .repository_path
            .as_ref()
            .ok_or_else(|| ProviderError::new("not inside a git repository"))?;
        let git_dir = repository.join(".git");
        if !git_dir.is_dir() {
            return Err(ProviderError::new(format!(
                "{} is not a git directory",
                git_dir.display()
            )));
        }

        let mut branches = Vec::new();
        Self::loose_refs(&git_dir.join("refs").join("heads"), "", &mut branches)
            .await
            .map_err(|e| ProviderError::new(format!("failed to read branches: {}", e)))?;
        Self::packed_refs(&git_dir, &mut branches)
            .await
            .map_err(|e| ProviderError::new(format!("failed to read packed-refs: {}", e)))?;

        branches.sort();
        branches.dedup();
        Ok(branches.into_iter().map(EnumOption::new).collect())
    }
}

/// Registry holding every built-in provider
pub fn builtin_registry() -> ProviderRegistry {
    let registry = ProviderRegistry::new();
    registry.register(GIT_BRANCHES, Arc::new(GitBranchesProvider));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn lists_loose_and_packed_branches() {
        let temp = tempfile::tempdir().unwrap();
        let heads = temp.path().join(".git").join("refs").join("heads");
        fs::create_dir_all(heads.join("feature")).unwrap();
        fs::write(heads.join("main"), "0000\n").unwrap();
        fs::write(heads.join("feature").join("parser"), "0000\n").unwrap();
        fs::write(
            temp.path().join(".git").join("packed-refs"),
            "# pack-refs with: peeled\n1111 refs/heads/release\n2222 refs/tags/v1\n1111 refs/heads/main\n",
        )
        .unwrap();

        let context = OptionsContext {
            repository_path: Some(temp.path().to_path_buf()),
            ..OptionsContext::default()
        };
        let options = GitBranchesProvider.provide_options(&context).await.unwrap();
        let labels: Vec<&str> = options.iter().map(|o| o.label.as_str()).collect();

        assert_eq!(labels, vec!["feature/parser", "main", "release"]);
    }

    #[tokio::test]
    async fn outside_repository_is_an_error() {
        let err = GitBranchesProvider
            .provide_options(&OptionsContext::default())
            .await
            .unwrap_err();
        assert_eq!(err.message, "not inside a git repository");
    }

    #[test]
    fn registry_has_git_branches() {
        assert!(builtin_registry().get(GIT_BRANCHES).is_some());
    }
}
