pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

const APP_DIR: &str = "tcflow";
const PROJECT_DIR: &str = ".tcflow";
const CREDENTIALS_FILE: &str = "credentials.json";

/// リソース定義ファイルの候補 (優先順)
const RESOURCE_FILES: [&str; 2] = ["resources.local.json", "resources.json"];

/// tcflow の設定ディレクトリ (~/.config/tcflow)
///
/// ディレクトリの作成はしない。
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join(APP_DIR))
}

/// 認証情報ファイルのパス (~/.config/tcflow/credentials.json)
pub fn credentials_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CREDENTIALS_FILE))
}

fn first_existing(dir: &Path) -> Option<PathBuf> {
    RESOURCE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// リソース定義ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 TCFLOW_CONFIG_PATH (直接パス指定)
/// 2. カレントディレクトリ: resources.local.json, resources.json
/// 3. ./.tcflow/ ディレクトリ内: 同様の順序
/// 4. ~/.config/tcflow/resources.json (グローバル設定)
pub fn find_resources_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var("TCFLOW_CONFIG_PATH") {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    if let Some(path) = first_existing(&current_dir) {
        return Ok(path);
    }

    let project_dir = current_dir.join(PROJECT_DIR);
    if project_dir.is_dir()
        && let Some(path) = first_existing(&project_dir)
    {
        return Ok(path);
    }

    if let Ok(dir) = config_dir() {
        let global = dir.join("resources.json");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::ResourcesFileNotFound)
}
