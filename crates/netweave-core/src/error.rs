use thiserror::Error;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("必須キーが見つかりません: {0}")]
    MissingKey(String),

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("data ノードが見つかりません\nヒント: topology.kdl にはトップレベルの data ノードが必要です")]
    DataNodeNotFound,
}

pub type Result<T> = std::result::Result<T, TopologyError>;
