//! Netweave コア
//!
//! ネットワークトポロジー設定のモデル定義とKDLパーサーを提供します。
//! `topology.kdl` の `data` ノードを読み込み、検証済みの
//! [`TopologyConfig`] を生成するまでがこのクレートの責務です。
//! リソース宣言グラフの構築は netweave-cloud / netweave-cloud-aws が担います。

pub mod error;
pub mod model;
pub mod parser;

pub use error::{Result, TopologyError};
pub use model::{TopologyConfig, TopologyData};
pub use parser::{parse_kdl_file, parse_kdl_string};
