//! Resource declaration types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of cloud resource a declaration produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Vpc,
    InternetGateway,
    Subnet,
    Eip,
    NatGateway,
    RouteTable,
    RouteTableAssociation,
    SecurityGroup,
    Instance,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Vpc => write!(f, "vpc"),
            ResourceKind::InternetGateway => write!(f, "internet-gateway"),
            ResourceKind::Subnet => write!(f, "subnet"),
            ResourceKind::Eip => write!(f, "eip"),
            ResourceKind::NatGateway => write!(f, "nat-gateway"),
            ResourceKind::RouteTable => write!(f, "route-table"),
            ResourceKind::RouteTableAssociation => write!(f, "route-table-association"),
            ResourceKind::SecurityGroup => write!(f, "security-group"),
            ResourceKind::Instance => write!(f, "instance"),
        }
    }
}

/// Reference to an attribute of a previously declared resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrRef {
    /// Declaration name of the referenced resource
    pub resource: String,

    /// Attribute name (e.g. "id", "allocation_id")
    pub attribute: String,
}

impl AttrRef {
    pub fn new(resource: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            attribute: attribute.into(),
        }
    }

    /// Shorthand for the ubiquitous `<resource>.id` reference
    pub fn id(resource: impl Into<String>) -> Self {
        Self::new(resource, "id")
    }
}

impl std::fmt::Display for AttrRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.resource, self.attribute)
    }
}

/// Input value for a declaration argument
///
/// Inputs form a small tree: literals, references to earlier resources,
/// and lists/maps of further inputs. References are what carry the
/// ordering between declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Input {
    Str(String),
    Int(i64),
    Bool(bool),
    Ref(AttrRef),
    List(Vec<Input>),
    Map(BTreeMap<String, Input>),
}

impl Input {
    /// Build a map input from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Input>,
        I: IntoIterator<Item = (K, V)>,
    {
        Input::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Collect every attribute reference in this input tree
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<&'a AttrRef>) {
        match self {
            Input::Ref(r) => out.push(r),
            Input::List(items) => {
                for item in items {
                    item.collect_refs(out);
                }
            }
            Input::Map(map) => {
                for value in map.values() {
                    value.collect_refs(out);
                }
            }
            _ => {}
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Input::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Input::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Input::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_attr_ref(&self) -> Option<&AttrRef> {
        match self {
            Input::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Input]> {
        match self {
            Input::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Input>> {
        match self {
            Input::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for Input {
    fn from(value: &str) -> Self {
        Input::Str(value.to_string())
    }
}

impl From<String> for Input {
    fn from(value: String) -> Self {
        Input::Str(value)
    }
}

impl From<i64> for Input {
    fn from(value: i64) -> Self {
        Input::Int(value)
    }
}

impl From<bool> for Input {
    fn from(value: bool) -> Self {
        Input::Bool(value)
    }
}

impl From<AttrRef> for Input {
    fn from(value: AttrRef) -> Self {
        Input::Ref(value)
    }
}

/// A single resource declaration
///
/// `depends_on` carries ordering-only dependencies: the named resource
/// must exist before this one, but no argument references it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDecl {
    /// Declaration name (unique within a graph)
    pub name: String,

    /// Kind of resource
    pub kind: ResourceKind,

    /// Arguments; values may reference earlier declarations
    pub args: BTreeMap<String, Input>,

    /// Ordering-only dependencies
    pub depends_on: Vec<String>,
}

impl ResourceDecl {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            args: BTreeMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// Add an argument (builder style)
    pub fn arg(mut self, key: impl Into<String>, value: impl Into<Input>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Add an ordering-only dependency (builder style)
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    pub fn get_arg(&self, key: &str) -> Option<&Input> {
        self.args.get(key)
    }

    /// Names of all resources this declaration refers to,
    /// through argument references and ordering-only dependencies
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        for value in self.args.values() {
            value.collect_refs(&mut refs);
        }
        let mut names: Vec<&str> = refs.iter().map(|r| r.resource.as_str()).collect();
        names.extend(self.depends_on.iter().map(|s| s.as_str()));
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_refs_nested() {
        let input = Input::List(vec![
            Input::map([
                ("cidr_block", Input::from("0.0.0.0/0")),
                ("gateway", Input::Ref(AttrRef::id("ghost-igw"))),
            ]),
            Input::Ref(AttrRef::new("ghost-eip", "allocation_id")),
        ]);

        let mut refs = Vec::new();
        input.collect_refs(&mut refs);

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].resource, "ghost-igw");
        assert_eq!(refs[1].attribute, "allocation_id");
    }

    #[test]
    fn test_decl_references() {
        let decl = ResourceDecl::new("ghost-nat", ResourceKind::NatGateway)
            .arg("allocation_id", AttrRef::new("ghost-eip", "allocation_id"))
            .arg("subnet_id", AttrRef::id("ghost-pub-subnet"))
            .depends_on("ghost-igw");

        let refs = decl.references();
        assert!(refs.contains(&"ghost-eip"));
        assert!(refs.contains(&"ghost-pub-subnet"));
        assert!(refs.contains(&"ghost-igw"));
    }

    #[test]
    fn test_input_accessors() {
        assert_eq!(Input::from("a").as_str(), Some("a"));
        assert_eq!(Input::from(80i64).as_int(), Some(80));
        assert_eq!(Input::from(true).as_bool(), Some(true));
        assert!(Input::from("a").as_int().is_none());
    }
}
