//! ネットワークトポロジー設定モデル
//!
//! Netweaveで宣言するAWSネットワークトポロジー
//! （VPC、サブネット、ゲートウェイ、ルーティング、インスタンス）の設定定義

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{Result, TopologyError};

/// SSH受信を許可するデフォルトのCIDRブロック
pub const DEFAULT_SSH_CIDR: &str = "84.119.0.0/16";

/// AMI検索のデフォルト名前パターン（Ubuntu 20.04 LTS）
pub const DEFAULT_AMI_NAME_PATTERN: &str =
    "ubuntu/images/hvm-ssd/ubuntu-focal-20.04-amd64-server-*";

/// AMI所有者のデフォルトアカウントID（Canonical）
pub const DEFAULT_AMI_OWNER: &str = "099720109477";

/// `data` ノードから読み込んだ生の設定マッピング
///
/// キーと値はすべて文字列。検証は [`TopologyConfig::from_data`] で行う。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyData {
    /// フラットなキー/値マッピング
    pub values: HashMap<String, String>,
}

impl TopologyData {
    pub fn new() -> Self {
        Self::default()
    }

    /// 任意キーを取得
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// 必須キーを取得（欠落していればエラー）
    pub fn require(&self, key: &str) -> Result<String> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| TopologyError::MissingKey(key.to_string()))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

/// 検証済みのトポロジー設定
///
/// 必須キーがすべて存在することが保証された状態。リソース宣言は
/// この型を入力として組み立てられる。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// VPC名
    pub vpc_name: String,
    /// VPCのCIDRブロック
    pub vpc_cidr: String,
    /// インターネットゲートウェイ名
    pub igw_name: String,
    /// プライベートサブネット名
    pub prv_subnet_name: String,
    /// プライベートサブネットのCIDRブロック
    pub prv_cidr: String,
    /// パブリックサブネット名
    pub pub_subnet_name: String,
    /// パブリックサブネットのCIDRブロック
    pub pub_cidr: String,
    /// Elastic IP名
    pub eip_name: String,
    /// NATゲートウェイ名
    pub nat_gw_name: String,
    /// パブリックルートテーブル名
    pub pub_route_name: String,
    /// プライベートルートテーブル名
    pub prv_route_name: String,
    /// パブリックルートテーブル関連付け名
    pub pub_route_asso_name: String,
    /// プライベートルートテーブル関連付け名
    pub prv_route_asso_name: String,
    /// セキュリティグループ名
    pub sec_ec2_gp_name: String,
    /// アプリケーションインスタンス名
    pub ec2_app_name: String,
    /// インスタンスタイプ（t3.micro など）
    pub ec2_app_type: String,
    /// キーペア名
    pub keypair_name: String,

    /// SSH受信を許可するCIDR（デフォルト: 84.119.0.0/16）
    pub ssh_cidr: String,
    /// AMI検索の名前パターン
    pub ami_name_pattern: String,
    /// AMI所有者アカウントID
    pub ami_owner: String,
    /// AWSリージョン（未指定の場合はCLI側の設定に従う）
    pub region: Option<String>,
}

impl TopologyConfig {
    /// 必須キーの一覧（検証とテストで共有）
    pub const REQUIRED_KEYS: &'static [&'static str] = &[
        "vpc_name",
        "vpc_cidr",
        "igw_name",
        "prv_subnet_name",
        "prv_cidr",
        "pub_subnet_name",
        "pub_cidr",
        "eip_name",
        "nat_gw_name",
        "pub_route_name",
        "prv_route_name",
        "pub_route_asso_name",
        "prv_route_asso_name",
        "sec_ec2_gp_name",
        "ec2_app_name",
        "ec2_app_type",
        "keypair_name",
    ];

    /// 生データから検証済み設定を構築
    ///
    /// 必須キーの欠落はここで即座にエラーになる。この時点では
    /// リソース宣言は一切行われていない。
    pub fn from_data(data: &TopologyData) -> Result<Self> {
        let ssh_cidr = data
            .get("ssh_cidr")
            .unwrap_or(DEFAULT_SSH_CIDR)
            .to_string();

        // tcp/22 の全開放は設定として受け付けない
        if ssh_cidr == "0.0.0.0/0" {
            return Err(TopologyError::InvalidConfig(
                "ssh_cidr に 0.0.0.0/0 は指定できません".to_string(),
            ));
        }

        Ok(Self {
            vpc_name: data.require("vpc_name")?,
            vpc_cidr: data.require("vpc_cidr")?,
            igw_name: data.require("igw_name")?,
            prv_subnet_name: data.require("prv_subnet_name")?,
            prv_cidr: data.require("prv_cidr")?,
            pub_subnet_name: data.require("pub_subnet_name")?,
            pub_cidr: data.require("pub_cidr")?,
            eip_name: data.require("eip_name")?,
            nat_gw_name: data.require("nat_gw_name")?,
            pub_route_name: data.require("pub_route_name")?,
            prv_route_name: data.require("prv_route_name")?,
            pub_route_asso_name: data.require("pub_route_asso_name")?,
            prv_route_asso_name: data.require("prv_route_asso_name")?,
            sec_ec2_gp_name: data.require("sec_ec2_gp_name")?,
            ec2_app_name: data.require("ec2_app_name")?,
            ec2_app_type: data.require("ec2_app_type")?,
            keypair_name: data.require("keypair_name")?,
            ssh_cidr,
            ami_name_pattern: data
                .get("ami_name_pattern")
                .unwrap_or(DEFAULT_AMI_NAME_PATTERN)
                .to_string(),
            ami_owner: data.get("ami_owner").unwrap_or(DEFAULT_AMI_OWNER).to_string(),
            region: data.get("region").map(|s| s.to_string()),
        })
    }
}
