use crate::error::FileError;
use crate::models::application::Application;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载一份申请
pub async fn load_application(toml_file_path: &Path) -> Result<Application, FileError> {
    let path_str = toml_file_path.to_string_lossy().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|source| FileError::ReadFailed {
            path: path_str.clone(),
            source,
        })?;

    let application: Application =
        toml::from_str(&content).map_err(|source| FileError::TomlParseFailed {
            path: path_str.clone(),
            source,
        })?;

    Ok(application.with_file_path(path_str))
}

/// 加载文件夹中所有 `.toml` 申请文件（按文件名排序）
///
/// 单个文件解析失败只记录警告并跳过
pub async fn load_all_application_files(folder_path: &str) -> Result<Vec<Application>, FileError> {
    let folder = PathBuf::from(folder_path);

    if !folder.is_dir() {
        return Err(FileError::DirectoryNotFound {
            path: folder_path.to_string(),
        });
    }

    let read_failed = |source| FileError::ReadFailed {
        path: folder_path.to_string(),
        source,
    };
    let mut entries = fs::read_dir(&folder).await.map_err(read_failed)?;

    let mut toml_files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_failed)? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    // read_dir 的顺序不固定，排序后输出才可复现
    toml_files.sort();

    let mut applications = Vec::with_capacity(toml_files.len());
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_application(&path).await {
            Ok(application) => {
                tracing::info!(
                    "成功加载 [{}] {} 的{}申请",
                    application.application_date,
                    application.alias,
                    application.application_type
                );
                applications.push(application);
            }
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {}", path.display(), e);
            }
        }
    }

    Ok(applications)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::ApplicationType;

    fn temp_folder(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "attendance_review_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_load_all_skips_broken_files() {
        let dir = temp_folder("loader");
        std::fs::write(
            dir.join("b.toml"),
            "alias = \"李四\"\napplication_type = \"补打卡\"\napplication_date = \"2025-10-22\"\nstart_time = \"09:00\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("a.toml"),
            "alias = \"张三\"\napplication_type = \"病假\"\napplication_date = \"2025-10-21\"\n",
        )
        .unwrap();
        std::fs::write(dir.join("broken.toml"), "alias = ").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let apps = load_all_application_files(dir.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].alias, "张三");
        assert_eq!(apps[1].application_type, ApplicationType::PunchCorrection);
        assert!(apps[0].file_path.as_deref().unwrap().ends_with("a.toml"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let err = load_all_application_files("/definitely/not/here")
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::DirectoryNotFound { .. }));
    }
}
