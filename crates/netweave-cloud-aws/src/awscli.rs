//! aws CLI wrapper
//!
//! Wraps the aws CLI (ec2/sts subcommands) for topology operations.
//! Every call requests JSON output and parses it into typed structs.

use crate::error::{AwsError, Result};
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::process::Command;

/// Target of a default route
#[derive(Debug, Clone)]
pub enum RouteTarget {
    /// Internet gateway id (`--gateway-id`)
    Gateway(String),
    /// NAT gateway id (`--nat-gateway-id`)
    NatGateway(String),
}

/// aws CLI wrapper
pub struct AwsCli {
    region: Option<String>,
}

impl AwsCli {
    pub fn new(region: Option<String>) -> Self {
        Self { region }
    }

    /// Check if the aws CLI is installed and credentials resolve
    pub async fn check_auth(&self) -> Result<CallerIdentity> {
        // Check if aws exists
        let which = Command::new("which").arg("aws").output().await?;

        if !which.status.success() {
            return Err(AwsError::AwsCliNotFound);
        }

        let output = self.run_command(&["sts", "get-caller-identity"]).await?;

        let identity: CallerIdentity = serde_json::from_str(&output)?;
        Ok(identity)
    }

    /// Run an aws command and return stdout
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("aws");
        if let Some(region) = &self.region {
            cmd.arg("--region").arg(region);
        }
        cmd.args(args);
        cmd.arg("--output").arg("json");
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("Running: aws {}", args.join(" "));

        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AwsError::CommandFailed(stderr.to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Build a `--tag-specifications` value carrying the Name tag
    fn tag_spec(resource_type: &str, name: &str) -> String {
        format!("ResourceType={resource_type},Tags=[{{Key=Name,Value={name}}}]")
    }

    /// Create a VPC
    pub async fn create_vpc(&self, cidr_block: &str, name: &str) -> Result<VpcInfo> {
        let tags = Self::tag_spec("vpc", name);
        let output = self
            .run_command(&[
                "ec2",
                "create-vpc",
                "--cidr-block",
                cidr_block,
                "--tag-specifications",
                &tags,
            ])
            .await?;

        let resp: CreateVpcResponse = serde_json::from_str(&output)?;
        Ok(resp.vpc)
    }

    /// Create an internet gateway
    pub async fn create_internet_gateway(&self, name: &str) -> Result<InternetGatewayInfo> {
        let tags = Self::tag_spec("internet-gateway", name);
        let output = self
            .run_command(&[
                "ec2",
                "create-internet-gateway",
                "--tag-specifications",
                &tags,
            ])
            .await?;

        let resp: CreateInternetGatewayResponse = serde_json::from_str(&output)?;
        Ok(resp.internet_gateway)
    }

    /// Attach an internet gateway to a VPC
    pub async fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<()> {
        self.run_command(&[
            "ec2",
            "attach-internet-gateway",
            "--internet-gateway-id",
            igw_id,
            "--vpc-id",
            vpc_id,
        ])
        .await?;
        Ok(())
    }

    /// Create a subnet
    pub async fn create_subnet(
        &self,
        vpc_id: &str,
        cidr_block: &str,
        name: &str,
    ) -> Result<SubnetInfo> {
        let tags = Self::tag_spec("subnet", name);
        let output = self
            .run_command(&[
                "ec2",
                "create-subnet",
                "--vpc-id",
                vpc_id,
                "--cidr-block",
                cidr_block,
                "--tag-specifications",
                &tags,
            ])
            .await?;

        let resp: CreateSubnetResponse = serde_json::from_str(&output)?;
        Ok(resp.subnet)
    }

    /// Enable automatic public IP assignment on a subnet
    pub async fn enable_public_ip_on_launch(&self, subnet_id: &str) -> Result<()> {
        self.run_command(&[
            "ec2",
            "modify-subnet-attribute",
            "--subnet-id",
            subnet_id,
            "--map-public-ip-on-launch",
        ])
        .await?;
        Ok(())
    }

    /// Allocate a VPC-scoped Elastic IP
    pub async fn allocate_address(&self, name: &str) -> Result<AddressInfo> {
        let tags = Self::tag_spec("elastic-ip", name);
        let output = self
            .run_command(&[
                "ec2",
                "allocate-address",
                "--domain",
                "vpc",
                "--tag-specifications",
                &tags,
            ])
            .await?;

        let address: AddressInfo = serde_json::from_str(&output)?;
        Ok(address)
    }

    /// Create a NAT gateway
    pub async fn create_nat_gateway(
        &self,
        subnet_id: &str,
        allocation_id: &str,
        name: &str,
    ) -> Result<NatGatewayInfo> {
        let tags = Self::tag_spec("natgateway", name);
        let output = self
            .run_command(&[
                "ec2",
                "create-nat-gateway",
                "--subnet-id",
                subnet_id,
                "--allocation-id",
                allocation_id,
                "--tag-specifications",
                &tags,
            ])
            .await?;

        let resp: CreateNatGatewayResponse = serde_json::from_str(&output)?;
        Ok(resp.nat_gateway)
    }

    /// Create a route table
    pub async fn create_route_table(&self, vpc_id: &str, name: &str) -> Result<RouteTableInfo> {
        let tags = Self::tag_spec("route-table", name);
        let output = self
            .run_command(&[
                "ec2",
                "create-route-table",
                "--vpc-id",
                vpc_id,
                "--tag-specifications",
                &tags,
            ])
            .await?;

        let resp: CreateRouteTableResponse = serde_json::from_str(&output)?;
        Ok(resp.route_table)
    }

    /// Create a route in a route table
    pub async fn create_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        target: &RouteTarget,
    ) -> Result<()> {
        let mut args = vec![
            "ec2",
            "create-route",
            "--route-table-id",
            route_table_id,
            "--destination-cidr-block",
            destination_cidr,
        ];

        match target {
            RouteTarget::Gateway(id) => {
                args.push("--gateway-id");
                args.push(id.as_str());
            }
            RouteTarget::NatGateway(id) => {
                args.push("--nat-gateway-id");
                args.push(id.as_str());
            }
        }

        self.run_command(&args).await?;
        Ok(())
    }

    /// Associate a route table with a subnet
    pub async fn associate_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<AssociationInfo> {
        let output = self
            .run_command(&[
                "ec2",
                "associate-route-table",
                "--route-table-id",
                route_table_id,
                "--subnet-id",
                subnet_id,
            ])
            .await?;

        let association: AssociationInfo = serde_json::from_str(&output)?;
        Ok(association)
    }

    /// Create a security group
    pub async fn create_security_group(
        &self,
        name: &str,
        description: &str,
        vpc_id: &str,
    ) -> Result<SecurityGroupInfo> {
        let output = self
            .run_command(&[
                "ec2",
                "create-security-group",
                "--group-name",
                name,
                "--description",
                description,
                "--vpc-id",
                vpc_id,
            ])
            .await?;

        let group: SecurityGroupInfo = serde_json::from_str(&output)?;
        Ok(group)
    }

    /// Build an `--ip-permissions` value for one rule over one CIDR range
    fn ip_permission(protocol: &str, from_port: i64, to_port: i64, cidr: &str) -> String {
        format!(
            "IpProtocol={protocol},FromPort={from_port},ToPort={to_port},IpRanges=[{{CidrIp={cidr}}}]"
        )
    }

    /// Authorize one ingress rule
    pub async fn authorize_ingress(
        &self,
        group_id: &str,
        protocol: &str,
        from_port: i64,
        to_port: i64,
        cidr: &str,
    ) -> Result<()> {
        let permission = Self::ip_permission(protocol, from_port, to_port, cidr);

        self.run_command(&[
            "ec2",
            "authorize-security-group-ingress",
            "--group-id",
            group_id,
            "--ip-permissions",
            &permission,
        ])
        .await?;
        Ok(())
    }

    /// Authorize one egress rule
    pub async fn authorize_egress(
        &self,
        group_id: &str,
        protocol: &str,
        from_port: i64,
        to_port: i64,
        cidr: &str,
    ) -> Result<()> {
        let permission = Self::ip_permission(protocol, from_port, to_port, cidr);

        self.run_command(&[
            "ec2",
            "authorize-security-group-egress",
            "--group-id",
            group_id,
            "--ip-permissions",
            &permission,
        ])
        .await?;
        Ok(())
    }

    /// Find the most recent image matching the name pattern, restricted
    /// to hvm virtualization and a single owner account
    pub async fn find_image(&self, name_pattern: &str, owner: &str) -> Result<ImageInfo> {
        let name_filter = format!("Name=name,Values={name_pattern}");
        let output = self
            .run_command(&[
                "ec2",
                "describe-images",
                "--owners",
                owner,
                "--filters",
                &name_filter,
                "Name=virtualization-type,Values=hvm",
            ])
            .await?;

        let resp: DescribeImagesResponse = serde_json::from_str(&output)?;

        resp.images
            .into_iter()
            .max_by(|a, b| a.creation_date.cmp(&b.creation_date))
            .ok_or_else(|| AwsError::ImageNotFound(name_pattern.to_string()))
    }

    /// Launch one instance
    pub async fn run_instance(
        &self,
        image_id: &str,
        instance_type: &str,
        subnet_id: &str,
        security_group_ids: &[String],
        key_name: &str,
        name: &str,
    ) -> Result<InstanceInfo> {
        let tags = Self::tag_spec("instance", name);

        let mut args = vec![
            "ec2",
            "run-instances",
            "--image-id",
            image_id,
            "--instance-type",
            instance_type,
            "--subnet-id",
            subnet_id,
            "--key-name",
            key_name,
            "--tag-specifications",
            tags.as_str(),
            "--security-group-ids",
        ];
        for id in security_group_ids {
            args.push(id.as_str());
        }

        let output = self.run_command(&args).await?;

        let resp: RunInstancesResponse = serde_json::from_str(&output)?;
        resp.instances
            .into_iter()
            .next()
            .ok_or_else(|| AwsError::CommandFailed("run-instances returned no instance".to_string()))
    }
}

/// Caller identity from sts get-caller-identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallerIdentity {
    #[serde(rename = "UserId")]
    pub user_id: String,

    #[serde(rename = "Account")]
    pub account: String,

    #[serde(rename = "Arn")]
    pub arn: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateVpcResponse {
    #[serde(rename = "Vpc")]
    vpc: VpcInfo,
}

/// VPC information from the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpcInfo {
    #[serde(rename = "VpcId")]
    pub vpc_id: String,

    #[serde(rename = "CidrBlock")]
    pub cidr_block: Option<String>,

    #[serde(rename = "State")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateInternetGatewayResponse {
    #[serde(rename = "InternetGateway")]
    internet_gateway: InternetGatewayInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InternetGatewayInfo {
    #[serde(rename = "InternetGatewayId")]
    pub internet_gateway_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateSubnetResponse {
    #[serde(rename = "Subnet")]
    subnet: SubnetInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetInfo {
    #[serde(rename = "SubnetId")]
    pub subnet_id: String,

    #[serde(rename = "CidrBlock")]
    pub cidr_block: Option<String>,

    #[serde(rename = "MapPublicIpOnLaunch")]
    pub map_public_ip_on_launch: Option<bool>,
}

/// Elastic IP allocation (allocate-address returns it unwrapped)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddressInfo {
    #[serde(rename = "AllocationId")]
    pub allocation_id: String,

    #[serde(rename = "PublicIp")]
    pub public_ip: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateNatGatewayResponse {
    #[serde(rename = "NatGateway")]
    nat_gateway: NatGatewayInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NatGatewayInfo {
    #[serde(rename = "NatGatewayId")]
    pub nat_gateway_id: String,

    #[serde(rename = "SubnetId")]
    pub subnet_id: Option<String>,

    #[serde(rename = "State")]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateRouteTableResponse {
    #[serde(rename = "RouteTable")]
    route_table: RouteTableInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteTableInfo {
    #[serde(rename = "RouteTableId")]
    pub route_table_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociationInfo {
    #[serde(rename = "AssociationId")]
    pub association_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityGroupInfo {
    #[serde(rename = "GroupId")]
    pub group_id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DescribeImagesResponse {
    #[serde(rename = "Images", default)]
    images: Vec<ImageInfo>,
}

/// Image information from describe-images
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    #[serde(rename = "ImageId")]
    pub image_id: String,

    #[serde(rename = "Name")]
    pub name: Option<String>,

    #[serde(rename = "CreationDate", default)]
    pub creation_date: String,
}

#[derive(Debug, Clone, Deserialize)]
struct RunInstancesResponse {
    #[serde(rename = "Instances", default)]
    instances: Vec<InstanceInfo>,
}

/// Instance information from run-instances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceInfo {
    #[serde(rename = "InstanceId")]
    pub instance_id: String,

    #[serde(rename = "PrivateIpAddress")]
    pub private_ip_address: Option<String>,

    #[serde(rename = "SubnetId")]
    pub subnet_id: Option<String>,
}
