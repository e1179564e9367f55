//! dataノードのパース

use crate::error::Result;
use crate::model::TopologyData;
use kdl::KdlNode;

/// data ノードをパース
///
/// 子ノードの名前をキー、最初の文字列エントリをその値として読み込む。
/// 文字列以外の値を持つ子ノードはスキップされる。
pub fn parse_data(node: &KdlNode) -> Result<TopologyData> {
    let mut data = TopologyData::new();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value();
            if let Some(value) = child.entries().first().and_then(|e| e.value().as_string()) {
                data.insert(key, value);
            }
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_data() {
        let kdl = r#"
            data {
                vpc_name "ghost-vpc"
                vpc_cidr "10.0.0.0/16"
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let data = parse_data(node).unwrap();
        assert_eq!(data.get("vpc_name"), Some("ghost-vpc"));
        assert_eq!(data.get("vpc_cidr"), Some("10.0.0.0/16"));
    }

    #[test]
    fn test_parse_data_empty() {
        let kdl = "data";
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let data = parse_data(node).unwrap();
        assert!(data.values.is_empty());
    }

    #[test]
    fn test_parse_data_skips_non_string_values() {
        let kdl = r#"
            data {
                vpc_name "ghost-vpc"
                retries 3
            }
        "#;
        let doc: kdl::KdlDocument = kdl.parse().unwrap();
        let node = doc.nodes().first().unwrap();

        let data = parse_data(node).unwrap();
        assert_eq!(data.get("vpc_name"), Some("ghost-vpc"));
        // 整数値はトポロジー設定の対象外
        assert_eq!(data.get("retries"), None);
    }
}
