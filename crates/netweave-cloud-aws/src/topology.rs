//! AWS network topology builder
//!
//! Translates a validated topology configuration into an ordered resource
//! declaration graph: VPC, internet gateway, private/public subnets,
//! Elastic IP, NAT gateway, route tables, associations, security group
//! and one instance.
//!
//! The translation is a single linear pass. Ordering between resources is
//! carried by attribute references (a subnet references `vpc.id`, so the
//! VPC is declared first), with one exception: the NAT gateway needs the
//! internet gateway to exist but references none of its attributes, so
//! that edge is stated explicitly via `depends_on`.

use netweave_cloud::{AttrRef, Input, ResourceDecl, ResourceGraph, ResourceKind};
use netweave_core::TopologyConfig;

use crate::error::Result;

/// Destination CIDR of the default routes and the open ingress rules
pub const ANYWHERE: &str = "0.0.0.0/0";

/// Build the declaration graph for the network topology
pub fn build_topology(config: &TopologyConfig) -> Result<ResourceGraph> {
    let mut graph = ResourceGraph::new();

    // VPC
    graph.push(
        ResourceDecl::new(&config.vpc_name, ResourceKind::Vpc)
            .arg("cidr_block", config.vpc_cidr.as_str()),
    )?;

    // Internet gateway. Name tags come from the declaration names, so no
    // resource carries a tag argument.
    graph.push(
        ResourceDecl::new(&config.igw_name, ResourceKind::InternetGateway)
            .arg("vpc_id", AttrRef::id(&config.vpc_name)),
    )?;

    // Private subnet
    graph.push(
        ResourceDecl::new(&config.prv_subnet_name, ResourceKind::Subnet)
            .arg("vpc_id", AttrRef::id(&config.vpc_name))
            .arg("cidr_block", config.prv_cidr.as_str())
            .arg("map_public_ip_on_launch", false),
    )?;

    // Public subnet
    graph.push(
        ResourceDecl::new(&config.pub_subnet_name, ResourceKind::Subnet)
            .arg("vpc_id", AttrRef::id(&config.vpc_name))
            .arg("cidr_block", config.pub_cidr.as_str())
            .arg("map_public_ip_on_launch", true),
    )?;

    // Elastic IP for the NAT gateway, always VPC-scoped
    graph.push(ResourceDecl::new(&config.eip_name, ResourceKind::Eip))?;

    // NAT gateway. The internet gateway must exist first, but no argument
    // references it; the ordering edge is explicit.
    graph.push(
        ResourceDecl::new(&config.nat_gw_name, ResourceKind::NatGateway)
            .arg(
                "allocation_id",
                AttrRef::new(&config.eip_name, "allocation_id"),
            )
            .arg("subnet_id", AttrRef::id(&config.pub_subnet_name))
            .depends_on(&config.igw_name),
    )?;

    // Public route table: default route to the internet gateway
    graph.push(
        ResourceDecl::new(&config.pub_route_name, ResourceKind::RouteTable)
            .arg("vpc_id", AttrRef::id(&config.vpc_name))
            .arg(
                "routes",
                Input::List(vec![route(ANYWHERE, AttrRef::id(&config.igw_name))]),
            ),
    )?;

    // Private route table: default route to the NAT gateway
    graph.push(
        ResourceDecl::new(&config.prv_route_name, ResourceKind::RouteTable)
            .arg("vpc_id", AttrRef::id(&config.vpc_name))
            .arg(
                "routes",
                Input::List(vec![route(ANYWHERE, AttrRef::id(&config.nat_gw_name))]),
            ),
    )?;

    // Route table associations: public subnet to the public table,
    // private subnet to the private table
    graph.push(
        ResourceDecl::new(&config.pub_route_asso_name, ResourceKind::RouteTableAssociation)
            .arg("route_table_id", AttrRef::id(&config.pub_route_name))
            .arg("subnet_id", AttrRef::id(&config.pub_subnet_name)),
    )?;
    graph.push(
        ResourceDecl::new(&config.prv_route_asso_name, ResourceKind::RouteTableAssociation)
            .arg("route_table_id", AttrRef::id(&config.prv_route_name))
            .arg("subnet_id", AttrRef::id(&config.prv_subnet_name)),
    )?;

    // Security group: HTTP/HTTPS from anywhere, SSH from the configured
    // CIDR only, all egress allowed
    graph.push(
        ResourceDecl::new(&config.sec_ec2_gp_name, ResourceKind::SecurityGroup)
            .arg("vpc_id", AttrRef::id(&config.vpc_name))
            .arg("description", "Allow HTTP/HTTPS traffic to EC2 instance")
            .arg(
                "ingress",
                Input::List(vec![
                    ingress_rule("tcp", 80, 80, ANYWHERE),
                    ingress_rule("tcp", 443, 443, ANYWHERE),
                    ingress_rule("tcp", 22, 22, &config.ssh_cidr),
                ]),
            )
            .arg("egress", Input::List(vec![egress_all()])),
    )?;

    // Application instance in the private subnet
    graph.push(
        ResourceDecl::new(&config.ec2_app_name, ResourceKind::Instance)
            .arg("instance_type", config.ec2_app_type.as_str())
            .arg("subnet_id", AttrRef::id(&config.prv_subnet_name))
            .arg(
                "security_group_ids",
                Input::List(vec![Input::Ref(AttrRef::id(&config.sec_ec2_gp_name))]),
            )
            .arg("key_name", config.keypair_name.as_str())
            .arg("image", image_query(config)),
    )?;

    tracing::debug!("Topology graph assembled with {} declarations", graph.len());
    Ok(graph)
}

/// One route entry: destination CIDR plus a gateway reference
fn route(cidr: &str, target: AttrRef) -> Input {
    Input::map([
        ("cidr_block", Input::from(cidr)),
        ("gateway", Input::Ref(target)),
    ])
}

/// One ingress rule over a CIDR range
fn ingress_rule(protocol: &str, from_port: i64, to_port: i64, cidr: &str) -> Input {
    Input::map([
        ("protocol", Input::from(protocol)),
        ("from_port", Input::from(from_port)),
        ("to_port", Input::from(to_port)),
        ("cidr_blocks", Input::List(vec![Input::from(cidr)])),
    ])
}

/// The allow-all egress rule
fn egress_all() -> Input {
    Input::map([
        ("protocol", Input::from("-1")),
        ("from_port", Input::from(0i64)),
        ("to_port", Input::from(0i64)),
        ("cidr_blocks", Input::List(vec![Input::from(ANYWHERE)])),
    ])
}

/// Image query parameters resolved by the provider at apply time
fn image_query(config: &TopologyConfig) -> Input {
    Input::map([
        ("name_pattern", Input::from(config.ami_name_pattern.as_str())),
        ("virtualization_type", Input::from("hvm")),
        ("owner", Input::from(config.ami_owner.as_str())),
        ("most_recent", Input::from(true)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use netweave_core::TopologyData;

    fn sample_config() -> TopologyConfig {
        let mut data = TopologyData::new();
        for (key, value) in [
            ("vpc_name", "ghost-vpc"),
            ("vpc_cidr", "10.0.0.0/16"),
            ("igw_name", "ghost-igw"),
            ("prv_subnet_name", "ghost-prv-subnet"),
            ("prv_cidr", "10.0.1.0/24"),
            ("pub_subnet_name", "ghost-pub-subnet"),
            ("pub_cidr", "10.0.2.0/24"),
            ("eip_name", "ghost-eip"),
            ("nat_gw_name", "ghost-nat"),
            ("pub_route_name", "ghost-pub-rt"),
            ("prv_route_name", "ghost-prv-rt"),
            ("pub_route_asso_name", "ghost-pub-rt-asso"),
            ("prv_route_asso_name", "ghost-prv-rt-asso"),
            ("sec_ec2_gp_name", "ghost-app-sg"),
            ("ec2_app_name", "ghost-app"),
            ("ec2_app_type", "t3.micro"),
            ("keypair_name", "ghost-key"),
        ] {
            data.insert(key, value);
        }
        TopologyConfig::from_data(&data).unwrap()
    }

    fn route_gateway<'a>(graph: &'a ResourceGraph, route_table: &str) -> &'a str {
        let routes = graph
            .get(route_table)
            .unwrap()
            .get_arg("routes")
            .unwrap()
            .as_list()
            .unwrap();
        assert_eq!(routes.len(), 1);
        let gateway = routes[0].as_map().unwrap().get("gateway").unwrap();
        &gateway.as_attr_ref().unwrap().resource
    }

    #[test]
    fn test_topology_resource_counts() {
        let graph = build_topology(&sample_config()).unwrap();

        assert_eq!(graph.count_kind(ResourceKind::Vpc), 1);
        assert_eq!(graph.count_kind(ResourceKind::InternetGateway), 1);
        assert_eq!(graph.count_kind(ResourceKind::Subnet), 2);
        assert_eq!(graph.count_kind(ResourceKind::Eip), 1);
        assert_eq!(graph.count_kind(ResourceKind::NatGateway), 1);
        assert_eq!(graph.count_kind(ResourceKind::RouteTable), 2);
        assert_eq!(graph.count_kind(ResourceKind::RouteTableAssociation), 2);
        assert_eq!(graph.count_kind(ResourceKind::SecurityGroup), 1);
        assert_eq!(graph.count_kind(ResourceKind::Instance), 1);
        assert_eq!(graph.len(), 12);
    }

    #[test]
    fn test_topology_declaration_order() {
        let graph = build_topology(&sample_config()).unwrap();

        let names: Vec<&str> = graph.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ghost-vpc",
                "ghost-igw",
                "ghost-prv-subnet",
                "ghost-pub-subnet",
                "ghost-eip",
                "ghost-nat",
                "ghost-pub-rt",
                "ghost-prv-rt",
                "ghost-pub-rt-asso",
                "ghost-prv-rt-asso",
                "ghost-app-sg",
                "ghost-app",
            ]
        );
    }

    #[test]
    fn test_name_tags_ride_on_declaration_names() {
        let graph = build_topology(&sample_config()).unwrap();

        // Tagging happens from the declaration name during apply, so no
        // declaration carries a separate tag argument. The Elastic IP has
        // no arguments at all.
        for decl in graph.iter() {
            assert!(decl.get_arg("tag_name").is_none());
        }
        let eip = graph.get("ghost-eip").unwrap();
        assert!(eip.args.is_empty());
    }

    #[test]
    fn test_one_public_one_private_subnet() {
        let graph = build_topology(&sample_config()).unwrap();

        let public = graph
            .get("ghost-pub-subnet")
            .unwrap()
            .get_arg("map_public_ip_on_launch")
            .unwrap()
            .as_bool();
        let private = graph
            .get("ghost-prv-subnet")
            .unwrap()
            .get_arg("map_public_ip_on_launch")
            .unwrap()
            .as_bool();

        assert_eq!(public, Some(true));
        assert_eq!(private, Some(false));
    }

    #[test]
    fn test_nat_gateway_sits_in_public_subnet() {
        let graph = build_topology(&sample_config()).unwrap();
        let nat = graph.get("ghost-nat").unwrap();

        let subnet = nat.get_arg("subnet_id").unwrap().as_attr_ref().unwrap();
        assert_eq!(subnet.resource, "ghost-pub-subnet");

        let allocation = nat.get_arg("allocation_id").unwrap().as_attr_ref().unwrap();
        assert_eq!(allocation.resource, "ghost-eip");
        assert_eq!(allocation.attribute, "allocation_id");
    }

    #[test]
    fn test_nat_gateway_depends_on_internet_gateway() {
        let graph = build_topology(&sample_config()).unwrap();
        let nat = graph.get("ghost-nat").unwrap();

        assert_eq!(nat.depends_on, vec!["ghost-igw".to_string()]);
    }

    #[test]
    fn test_route_table_targets_never_swapped() {
        let graph = build_topology(&sample_config()).unwrap();

        // Public default route goes to the internet gateway, private to
        // the NAT gateway, never the other way around
        assert_eq!(route_gateway(&graph, "ghost-pub-rt"), "ghost-igw");
        assert_eq!(route_gateway(&graph, "ghost-prv-rt"), "ghost-nat");
    }

    #[test]
    fn test_associations_bind_matching_pairs() {
        let graph = build_topology(&sample_config()).unwrap();

        let pub_asso = graph.get("ghost-pub-rt-asso").unwrap();
        assert_eq!(
            pub_asso
                .get_arg("route_table_id")
                .unwrap()
                .as_attr_ref()
                .unwrap()
                .resource,
            "ghost-pub-rt"
        );
        assert_eq!(
            pub_asso
                .get_arg("subnet_id")
                .unwrap()
                .as_attr_ref()
                .unwrap()
                .resource,
            "ghost-pub-subnet"
        );

        let prv_asso = graph.get("ghost-prv-rt-asso").unwrap();
        assert_eq!(
            prv_asso
                .get_arg("route_table_id")
                .unwrap()
                .as_attr_ref()
                .unwrap()
                .resource,
            "ghost-prv-rt"
        );
        assert_eq!(
            prv_asso
                .get_arg("subnet_id")
                .unwrap()
                .as_attr_ref()
                .unwrap()
                .resource,
            "ghost-prv-subnet"
        );
    }

    #[test]
    fn test_security_group_rule_counts() {
        let graph = build_topology(&sample_config()).unwrap();
        let sg = graph.get("ghost-app-sg").unwrap();

        let ingress = sg.get_arg("ingress").unwrap().as_list().unwrap();
        let egress = sg.get_arg("egress").unwrap().as_list().unwrap();
        assert_eq!(ingress.len(), 3);
        assert_eq!(egress.len(), 1);
    }

    #[test]
    fn test_ssh_never_open_to_the_world() {
        let graph = build_topology(&sample_config()).unwrap();
        let sg = graph.get("ghost-app-sg").unwrap();

        let ingress = sg.get_arg("ingress").unwrap().as_list().unwrap();
        let ssh_rule = ingress
            .iter()
            .map(|r| r.as_map().unwrap())
            .find(|r| r.get("from_port").unwrap().as_int() == Some(22))
            .expect("ssh rule present");

        let cidrs = ssh_rule.get("cidr_blocks").unwrap().as_list().unwrap();
        assert_eq!(cidrs.len(), 1);
        assert_ne!(cidrs[0].as_str(), Some(ANYWHERE));
        assert_eq!(cidrs[0].as_str(), Some("84.119.0.0/16"));
    }

    #[test]
    fn test_http_and_https_open_to_the_world() {
        let graph = build_topology(&sample_config()).unwrap();
        let sg = graph.get("ghost-app-sg").unwrap();

        let ingress = sg.get_arg("ingress").unwrap().as_list().unwrap();
        for port in [80, 443] {
            let rule = ingress
                .iter()
                .map(|r| r.as_map().unwrap())
                .find(|r| r.get("from_port").unwrap().as_int() == Some(port))
                .expect("rule present");
            let cidrs = rule.get("cidr_blocks").unwrap().as_list().unwrap();
            assert_eq!(cidrs[0].as_str(), Some(ANYWHERE));
        }
    }

    #[test]
    fn test_instance_placed_in_private_subnet() {
        let graph = build_topology(&sample_config()).unwrap();
        let instance = graph.get("ghost-app").unwrap();

        let subnet = instance
            .get_arg("subnet_id")
            .unwrap()
            .as_attr_ref()
            .unwrap();
        assert_eq!(subnet.resource, "ghost-prv-subnet");

        let sgs = instance
            .get_arg("security_group_ids")
            .unwrap()
            .as_list()
            .unwrap();
        assert_eq!(sgs.len(), 1);
        assert_eq!(sgs[0].as_attr_ref().unwrap().resource, "ghost-app-sg");

        assert_eq!(
            instance.get_arg("key_name").unwrap().as_str(),
            Some("ghost-key")
        );
        assert_eq!(
            instance.get_arg("instance_type").unwrap().as_str(),
            Some("t3.micro")
        );
    }

    #[test]
    fn test_instance_image_query() {
        let graph = build_topology(&sample_config()).unwrap();
        let image = graph
            .get("ghost-app")
            .unwrap()
            .get_arg("image")
            .unwrap()
            .as_map()
            .unwrap();

        assert_eq!(
            image.get("owner").unwrap().as_str(),
            Some("099720109477")
        );
        assert_eq!(
            image.get("virtualization_type").unwrap().as_str(),
            Some("hvm")
        );
        assert_eq!(image.get("most_recent").unwrap().as_bool(), Some(true));
        assert!(
            image
                .get("name_pattern")
                .unwrap()
                .as_str()
                .unwrap()
                .contains("ubuntu-focal-20.04")
        );
    }
}
