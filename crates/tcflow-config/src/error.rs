use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "リソース定義ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: resources.local.json, resources.json\n\
        - ./.tcflow/ ディレクトリ\n\
        - ~/.config/tcflow/resources.json\n\
        または TCFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    ResourcesFileNotFound,

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
