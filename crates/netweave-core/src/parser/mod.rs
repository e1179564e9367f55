//! KDLパーサー
//!
//! Netweaveのトポロジー設定ファイル（topology.kdl）をパースします。
//! トップレベルの `data` ノードだけを解釈し、それ以外のノードはスキップします。

mod data;

pub use data::parse_data;

use crate::error::{Result, TopologyError};
use crate::model::{TopologyConfig, TopologyData};
use kdl::KdlDocument;
use std::fs;
use std::path::Path;

/// KDLファイルをパースしてTopologyConfigを生成
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<TopologyConfig> {
    let content = fs::read_to_string(path.as_ref())?;
    tracing::debug!("Parsing topology file: {}", path.as_ref().display());
    parse_kdl_string(&content)
}

/// KDL文字列をパース
///
/// 必須キーの欠落はここで検出される。リソース宣言の組み立てには進まない。
pub fn parse_kdl_string(content: &str) -> Result<TopologyConfig> {
    let doc: KdlDocument = content.parse()?;

    let mut data: Option<TopologyData> = None;

    for node in doc.nodes() {
        match node.name().value() {
            "data" => {
                data = Some(parse_data(node)?);
            }
            _ => {
                // 不明なノードはスキップ（将来の拡張を許可）
            }
        }
    }

    let data = data.ok_or(TopologyError::DataNodeNotFound)?;
    TopologyConfig::from_data(&data)
}
