//! AWS provider implementation

use crate::awscli::{AwsCli, RouteTarget};
use crate::error::{AwsError, Result};
use crate::topology::ANYWHERE;
use async_trait::async_trait;
use netweave_cloud::{
    ApplyResult, AttrRef, AuthStatus, CloudError, CloudProvider, Input, Outputs, ResourceDecl,
    ResourceGraph, ResourceKind,
};

/// AWS provider
///
/// Applies a topology graph front to back through the aws CLI. Attribute
/// references are resolved against the outputs of already-applied
/// resources; the first failing declaration halts the run.
pub struct AwsProvider {
    cli: AwsCli,
}

impl AwsProvider {
    pub fn new() -> Self {
        Self {
            cli: AwsCli::new(None),
        }
    }

    /// Set an explicit region instead of the CLI's configured default
    pub fn with_region(self, region: impl Into<String>) -> Self {
        Self {
            cli: AwsCli::new(Some(region.into())),
        }
    }

    async fn apply_decl(
        &self,
        graph: &ResourceGraph,
        decl: &ResourceDecl,
        outputs: &mut Outputs,
    ) -> Result<String> {
        // Ordering-only dependencies must already be applied
        for dep in &decl.depends_on {
            outputs.resolve(&AttrRef::id(dep.as_str()))?;
        }

        match decl.kind {
            ResourceKind::Vpc => {
                let cidr = resolve_str(decl, "cidr_block", outputs)?;
                let vpc = self.cli.create_vpc(&cidr, &decl.name).await?;
                tracing::info!("Created VPC {} ({})", decl.name, vpc.vpc_id);
                outputs.record(&decl.name, "id", &vpc.vpc_id);
                Ok(format!("VPC {} を作成しました (ID: {})", decl.name, vpc.vpc_id))
            }
            ResourceKind::InternetGateway => {
                let vpc_id = resolve_str(decl, "vpc_id", outputs)?;
                let igw = self.cli.create_internet_gateway(&decl.name).await?;
                self.cli
                    .attach_internet_gateway(&igw.internet_gateway_id, &vpc_id)
                    .await?;
                tracing::info!(
                    "Created internet gateway {} ({})",
                    decl.name,
                    igw.internet_gateway_id
                );
                outputs.record(&decl.name, "id", &igw.internet_gateway_id);
                Ok(format!(
                    "インターネットゲートウェイ {} を作成しました (ID: {})",
                    decl.name, igw.internet_gateway_id
                ))
            }
            ResourceKind::Subnet => {
                let vpc_id = resolve_str(decl, "vpc_id", outputs)?;
                let cidr = resolve_str(decl, "cidr_block", outputs)?;
                let subnet = self.cli.create_subnet(&vpc_id, &cidr, &decl.name).await?;

                let map_public = decl
                    .get_arg("map_public_ip_on_launch")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                if map_public {
                    self.cli
                        .enable_public_ip_on_launch(&subnet.subnet_id)
                        .await?;
                }

                tracing::info!("Created subnet {} ({})", decl.name, subnet.subnet_id);
                outputs.record(&decl.name, "id", &subnet.subnet_id);
                Ok(format!(
                    "サブネット {} を作成しました (ID: {})",
                    decl.name, subnet.subnet_id
                ))
            }
            ResourceKind::Eip => {
                let address = self.cli.allocate_address(&decl.name).await?;
                tracing::info!("Allocated Elastic IP {} ({})", decl.name, address.allocation_id);
                outputs.record(&decl.name, "id", &address.allocation_id);
                outputs.record(&decl.name, "allocation_id", &address.allocation_id);
                if let Some(ip) = &address.public_ip {
                    outputs.record(&decl.name, "public_ip", ip);
                }
                Ok(format!(
                    "Elastic IP {} を割り当てました (ID: {})",
                    decl.name, address.allocation_id
                ))
            }
            ResourceKind::NatGateway => {
                let subnet_id = resolve_str(decl, "subnet_id", outputs)?;
                let allocation_id = resolve_str(decl, "allocation_id", outputs)?;
                let nat = self
                    .cli
                    .create_nat_gateway(&subnet_id, &allocation_id, &decl.name)
                    .await?;
                tracing::info!("Created NAT gateway {} ({})", decl.name, nat.nat_gateway_id);
                outputs.record(&decl.name, "id", &nat.nat_gateway_id);
                Ok(format!(
                    "NATゲートウェイ {} を作成しました (ID: {})",
                    decl.name, nat.nat_gateway_id
                ))
            }
            ResourceKind::RouteTable => {
                let vpc_id = resolve_str(decl, "vpc_id", outputs)?;
                let table = self.cli.create_route_table(&vpc_id, &decl.name).await?;
                outputs.record(&decl.name, "id", &table.route_table_id);

                if let Some(routes) = decl.get_arg("routes").and_then(|v| v.as_list()) {
                    for entry in routes {
                        let (cidr, target) = route_entry(graph, decl, entry, outputs)?;
                        self.cli
                            .create_route(&table.route_table_id, &cidr, &target)
                            .await?;
                    }
                }

                tracing::info!("Created route table {} ({})", decl.name, table.route_table_id);
                Ok(format!(
                    "ルートテーブル {} を作成しました (ID: {})",
                    decl.name, table.route_table_id
                ))
            }
            ResourceKind::RouteTableAssociation => {
                let route_table_id = resolve_str(decl, "route_table_id", outputs)?;
                let subnet_id = resolve_str(decl, "subnet_id", outputs)?;
                let association = self
                    .cli
                    .associate_route_table(&route_table_id, &subnet_id)
                    .await?;
                outputs.record(&decl.name, "id", &association.association_id);
                Ok(format!(
                    "ルートテーブル関連付け {} を作成しました (ID: {})",
                    decl.name, association.association_id
                ))
            }
            ResourceKind::SecurityGroup => {
                let vpc_id = resolve_str(decl, "vpc_id", outputs)?;
                let description = resolve_str(decl, "description", outputs)?;
                let group = self
                    .cli
                    .create_security_group(&decl.name, &description, &vpc_id)
                    .await?;
                outputs.record(&decl.name, "id", &group.group_id);

                if let Some(ingress) = decl.get_arg("ingress").and_then(|v| v.as_list()) {
                    for rule in ingress {
                        self.authorize_ingress_rule(decl, &group.group_id, rule)
                            .await?;
                    }
                }
                if let Some(egress) = decl.get_arg("egress").and_then(|v| v.as_list()) {
                    for rule in egress {
                        self.authorize_egress_rule(decl, &group.group_id, rule)
                            .await?;
                    }
                }

                tracing::info!("Created security group {} ({})", decl.name, group.group_id);
                Ok(format!(
                    "セキュリティグループ {} を作成しました (ID: {})",
                    decl.name, group.group_id
                ))
            }
            ResourceKind::Instance => {
                let image = decl
                    .get_arg("image")
                    .and_then(|v| v.as_map())
                    .ok_or_else(|| AwsError::MissingArgument(decl.name.clone(), "image".into()))?;
                let name_pattern = image
                    .get("name_pattern")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| {
                        AwsError::MissingArgument(decl.name.clone(), "image.name_pattern".into())
                    })?;
                let owner = image.get("owner").and_then(|v| v.as_str()).ok_or_else(|| {
                    AwsError::MissingArgument(decl.name.clone(), "image.owner".into())
                })?;

                let ami = self.cli.find_image(name_pattern, owner).await?;
                tracing::debug!("Resolved image {} for {}", ami.image_id, decl.name);

                let instance_type = resolve_str(decl, "instance_type", outputs)?;
                let subnet_id = resolve_str(decl, "subnet_id", outputs)?;
                let key_name = resolve_str(decl, "key_name", outputs)?;

                let mut security_group_ids = Vec::new();
                if let Some(groups) = decl.get_arg("security_group_ids").and_then(|v| v.as_list()) {
                    for group in groups {
                        security_group_ids.push(resolve_input(decl, group, outputs)?);
                    }
                }

                let instance = self
                    .cli
                    .run_instance(
                        &ami.image_id,
                        &instance_type,
                        &subnet_id,
                        &security_group_ids,
                        &key_name,
                        &decl.name,
                    )
                    .await?;
                tracing::info!("Launched instance {} ({})", decl.name, instance.instance_id);
                outputs.record(&decl.name, "id", &instance.instance_id);
                outputs.record(&decl.name, "ami_id", &ami.image_id);
                if let Some(ip) = &instance.private_ip_address {
                    outputs.record(&decl.name, "private_ip", ip);
                }
                Ok(format!(
                    "インスタンス {} を起動しました (ID: {})",
                    decl.name, instance.instance_id
                ))
            }
        }
    }

    async fn authorize_ingress_rule(
        &self,
        decl: &ResourceDecl,
        group_id: &str,
        rule: &Input,
    ) -> Result<()> {
        let (protocol, from_port, to_port, cidrs) = rule_ports(decl, "ingress rule", rule)?;
        for cidr in cidrs {
            self.cli
                .authorize_ingress(group_id, &protocol, from_port, to_port, &cidr)
                .await?;
        }
        Ok(())
    }

    async fn authorize_egress_rule(
        &self,
        decl: &ResourceDecl,
        group_id: &str,
        rule: &Input,
    ) -> Result<()> {
        let (protocol, from_port, to_port, cidrs) = rule_ports(decl, "egress rule", rule)?;
        for cidr in cidrs {
            // A new group already carries the allow-all egress rule;
            // re-authorizing it is rejected as a duplicate.
            if is_default_egress(&protocol, &cidr) {
                continue;
            }
            self.cli
                .authorize_egress(group_id, &protocol, from_port, to_port, &cidr)
                .await?;
        }
        Ok(())
    }
}

impl Default for AwsProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a declaration argument that must yield a string
fn resolve_str(decl: &ResourceDecl, key: &str, outputs: &Outputs) -> Result<String> {
    let input = decl
        .get_arg(key)
        .ok_or_else(|| AwsError::MissingArgument(decl.name.clone(), key.to_string()))?;
    resolve_input(decl, input, outputs)
}

/// Resolve a single input to its string value
fn resolve_input(decl: &ResourceDecl, input: &Input, outputs: &Outputs) -> Result<String> {
    match input {
        Input::Str(s) => Ok(s.clone()),
        Input::Ref(attr_ref) => Ok(outputs.resolve(attr_ref)?),
        other => Err(CloudError::InvalidDeclaration(format!(
            "{}: expected string or reference, got {other:?}",
            decl.name
        ))
        .into()),
    }
}

/// Pull protocol, port range and CIDR list out of one rule map
fn rule_ports(
    decl: &ResourceDecl,
    label: &str,
    rule: &Input,
) -> Result<(String, i64, i64, Vec<String>)> {
    let rule = rule
        .as_map()
        .ok_or_else(|| AwsError::MissingArgument(decl.name.clone(), label.to_string()))?;

    let protocol = rule
        .get("protocol")
        .and_then(|v| v.as_str())
        .unwrap_or("tcp")
        .to_string();
    let from_port = rule
        .get("from_port")
        .and_then(|v| v.as_int())
        .unwrap_or(0);
    let to_port = rule.get("to_port").and_then(|v| v.as_int()).unwrap_or(0);

    let cidrs = rule
        .get("cidr_blocks")
        .and_then(|v| v.as_list())
        .map(|list| {
            list.iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok((protocol, from_port, to_port, cidrs))
}

/// Whether a rule matches the egress rule every new group starts with
fn is_default_egress(protocol: &str, cidr: &str) -> bool {
    protocol == "-1" && cidr == ANYWHERE
}

/// Resolve one route entry into its destination CIDR and target
///
/// The target flag (`--gateway-id` vs `--nat-gateway-id`) follows the kind
/// of the referenced declaration.
fn route_entry(
    graph: &ResourceGraph,
    decl: &ResourceDecl,
    entry: &Input,
    outputs: &Outputs,
) -> Result<(String, RouteTarget)> {
    let entry = entry
        .as_map()
        .ok_or_else(|| AwsError::MissingArgument(decl.name.clone(), "route entry".into()))?;

    let cidr = entry
        .get("cidr_block")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AwsError::MissingArgument(decl.name.clone(), "route.cidr_block".into()))?
        .to_string();

    let gateway_ref = entry
        .get("gateway")
        .and_then(|v| v.as_attr_ref())
        .ok_or_else(|| AwsError::MissingArgument(decl.name.clone(), "route.gateway".into()))?;

    let gateway_id = outputs.resolve(gateway_ref)?;
    let target = match graph.get(&gateway_ref.resource).map(|d| d.kind) {
        Some(ResourceKind::NatGateway) => RouteTarget::NatGateway(gateway_id),
        _ => RouteTarget::Gateway(gateway_id),
    };

    Ok((cidr, target))
}

#[async_trait]
impl CloudProvider for AwsProvider {
    fn name(&self) -> &str {
        "aws"
    }

    fn display_name(&self) -> &str {
        "Amazon Web Services"
    }

    async fn check_auth(&self) -> netweave_cloud::Result<AuthStatus> {
        match self.cli.check_auth().await {
            Ok(identity) => Ok(AuthStatus::ok(format!(
                "{} ({})",
                identity.arn, identity.account
            ))),
            Err(AwsError::AwsCliNotFound) => {
                Ok(AuthStatus::failed("aws CLI がインストールされていません"))
            }
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    async fn apply(&self, graph: &ResourceGraph) -> netweave_cloud::Result<ApplyResult> {
        let mut outputs = Outputs::new();
        let mut result = ApplyResult::new();
        let start = std::time::Instant::now();

        for decl in graph.iter() {
            tracing::info!("Applying {} {}", decl.kind, decl.name);
            match self.apply_decl(graph, decl, &mut outputs).await {
                Ok(message) => result.add_success(decl.name.clone(), message),
                Err(e) => {
                    result.add_failure(decl.name.clone(), e.to_string());
                    // No local recovery: the first failure halts the run
                    break;
                }
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_str_literal_and_reference() {
        let decl = ResourceDecl::new("subnet", ResourceKind::Subnet)
            .arg("cidr_block", "10.0.1.0/24")
            .arg("vpc_id", AttrRef::id("vpc"));

        let mut outputs = Outputs::new();
        outputs.record("vpc", "id", "vpc-0123");

        assert_eq!(
            resolve_str(&decl, "cidr_block", &outputs).unwrap(),
            "10.0.1.0/24"
        );
        assert_eq!(resolve_str(&decl, "vpc_id", &outputs).unwrap(), "vpc-0123");
    }

    #[test]
    fn test_resolve_str_missing_argument() {
        let decl = ResourceDecl::new("subnet", ResourceKind::Subnet);
        let outputs = Outputs::new();

        let result = resolve_str(&decl, "vpc_id", &outputs);
        assert!(matches!(result, Err(AwsError::MissingArgument(_, _))));
    }

    #[test]
    fn test_resolve_str_unapplied_reference() {
        let decl =
            ResourceDecl::new("subnet", ResourceKind::Subnet).arg("vpc_id", AttrRef::id("vpc"));
        let outputs = Outputs::new();

        let result = resolve_str(&decl, "vpc_id", &outputs);
        assert!(matches!(
            result,
            Err(AwsError::CloudError(CloudError::UnresolvedReference { .. }))
        ));
    }

    #[test]
    fn test_rule_ports_parses_rule_map() {
        let decl = ResourceDecl::new("sg", ResourceKind::SecurityGroup);
        let rule = Input::map([
            ("protocol", Input::from("tcp")),
            ("from_port", Input::from(443i64)),
            ("to_port", Input::from(443i64)),
            ("cidr_blocks", Input::List(vec![Input::from("0.0.0.0/0")])),
        ]);

        let (protocol, from_port, to_port, cidrs) =
            rule_ports(&decl, "ingress rule", &rule).unwrap();
        assert_eq!(protocol, "tcp");
        assert_eq!((from_port, to_port), (443, 443));
        assert_eq!(cidrs, vec!["0.0.0.0/0".to_string()]);
    }

    #[test]
    fn test_rule_ports_rejects_non_map_rule() {
        let decl = ResourceDecl::new("sg", ResourceKind::SecurityGroup);
        let result = rule_ports(&decl, "egress rule", &Input::from("tcp"));
        assert!(matches!(result, Err(AwsError::MissingArgument(_, _))));
    }

    #[test]
    fn test_only_the_preinstalled_egress_rule_is_skipped() {
        // The allow-all rule already exists on a fresh group; any other
        // declared egress must reach the CLI.
        assert!(is_default_egress("-1", ANYWHERE));
        assert!(!is_default_egress("tcp", ANYWHERE));
        assert!(!is_default_egress("-1", "10.0.0.0/8"));
    }

    #[test]
    fn test_route_entry_target_follows_declaration_kind() {
        let mut graph = ResourceGraph::new();
        graph
            .push(ResourceDecl::new("vpc", ResourceKind::Vpc))
            .unwrap();
        graph
            .push(
                ResourceDecl::new("igw", ResourceKind::InternetGateway)
                    .arg("vpc_id", AttrRef::id("vpc")),
            )
            .unwrap();
        graph
            .push(
                ResourceDecl::new("subnet", ResourceKind::Subnet).arg("vpc_id", AttrRef::id("vpc")),
            )
            .unwrap();
        graph
            .push(
                ResourceDecl::new("nat", ResourceKind::NatGateway)
                    .arg("subnet_id", AttrRef::id("subnet"))
                    .depends_on("igw"),
            )
            .unwrap();

        let mut outputs = Outputs::new();
        outputs.record("igw", "id", "igw-01");
        outputs.record("nat", "id", "nat-02");

        let decl = ResourceDecl::new("rt", ResourceKind::RouteTable);

        let igw_route = Input::map([
            ("cidr_block", Input::from("0.0.0.0/0")),
            ("gateway", Input::Ref(AttrRef::id("igw"))),
        ]);
        let (cidr, target) = route_entry(&graph, &decl, &igw_route, &outputs).unwrap();
        assert_eq!(cidr, "0.0.0.0/0");
        assert!(matches!(target, RouteTarget::Gateway(id) if id == "igw-01"));

        let nat_route = Input::map([
            ("cidr_block", Input::from("0.0.0.0/0")),
            ("gateway", Input::Ref(AttrRef::id("nat"))),
        ]);
        let (_, target) = route_entry(&graph, &decl, &nat_route, &outputs).unwrap();
        assert!(matches!(target, RouteTarget::NatGateway(id) if id == "nat-02"));
    }
}
