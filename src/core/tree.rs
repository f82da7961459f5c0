//! Purpose: Generic labelled tree built from a parsed JSON document.
//! Exports: `Node`, `Children`.
//! Role: Path-addressable, read-only view used by field extraction.
//! Invariants: A node is a leaf value, an object, or an array; never a mix.
//! Invariants: Scalars are kept in their textual form (`null`, `true`, `101`, `-79.4`).
//! Invariants: Object children keep document order; array children have empty labels.
//! Invariants: Repeated object labels are all kept; lookups resolve to the first.
use std::fmt::{self, Display};
use std::str::FromStr;

use serde::de::{Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::Value;

use crate::core::error::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Leaf(String),
    Object(Vec<(String, Node)>),
    Array(Vec<Node>),
}

impl Node {
    pub fn leaf(value: impl Into<String>) -> Self {
        Node::Leaf(value.into())
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Node::Leaf(value) => Some(value),
            Node::Object(_) | Node::Array(_) => None,
        }
    }

    /// Number of direct children; zero for leaves.
    pub fn len(&self) -> usize {
        match self {
            Node::Leaf(_) => 0,
            Node::Object(entries) => entries.len(),
            Node::Array(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate `(label, child)` pairs. Array elements yield an empty label.
    pub fn children(&self) -> Children<'_> {
        let inner = match self {
            Node::Leaf(_) => ChildrenInner::Empty,
            Node::Object(entries) => ChildrenInner::Object(entries.iter()),
            Node::Array(items) => ChildrenInner::Array(items.iter()),
        };
        Children { inner }
    }

    pub fn first(&self) -> Option<&Node> {
        self.children().next().map(|(_, node)| node)
    }

    pub fn last(&self) -> Option<&Node> {
        self.children().last().map(|(_, node)| node)
    }

    /// First child with the given label. Only objects have labelled children.
    pub fn child(&self, label: &str) -> Option<&Node> {
        match self {
            Node::Object(entries) => entries
                .iter()
                .find(|(key, _)| key == label)
                .map(|(_, node)| node),
            Node::Leaf(_) | Node::Array(_) => None,
        }
    }

    /// Walk a dot-separated label path, e.g. `properties.route_name`.
    pub fn find(&self, path: &str) -> Option<&Node> {
        path.split('.')
            .try_fold(self, |node, label| node.child(label))
    }

    pub fn get_child(&self, path: &str) -> Result<&Node, Error> {
        self.find(path)
            .ok_or_else(|| Error::schema(format!("no such node ({path})")))
    }

    /// Convert the leaf at `path` to `T`.
    pub fn get<T>(&self, path: &str) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get_child(path)?
            .get_value()
            .map_err(|err| {
                let message = err.message().map(|message| format!("{message} ({path})"));
                match message {
                    Some(message) => Error::schema(message),
                    None => err,
                }
            })
    }

    /// Convert this node's own value to `T`.
    ///
    /// The text is tried as stored first, so `String` reads are exact;
    /// surrounding whitespace is only skipped when that first attempt fails.
    /// Objects and arrays carry no value and are rejected rather than read
    /// as an empty string.
    pub fn get_value<T>(&self) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(raw) = self.value() else {
            return Err(Error::schema("node holds children, not a value"));
        };
        let parsed = raw.parse::<T>().or_else(|err| {
            let trimmed = raw.trim();
            if trimmed.len() == raw.len() {
                Err(err)
            } else {
                trimmed.parse::<T>()
            }
        });
        parsed.map_err(|err| {
            Error::schema(format!(
                "conversion of data \"{raw}\" to {} failed: {err}",
                short_type_name::<T>()
            ))
        })
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Node::leaf("null"),
            Value::Bool(flag) => Node::leaf(flag.to_string()),
            Value::Number(number) => Node::leaf(number.to_string()),
            Value::String(text) => Node::Leaf(text),
            Value::Array(items) => Node::Array(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => Node::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Node::from(value)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(NodeVisitor)
    }
}

struct NodeVisitor;

impl<'de> Visitor<'de> for NodeVisitor {
    type Value = Node;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a json value")
    }

    fn visit_unit<E>(self) -> Result<Node, E> {
        Ok(Node::leaf("null"))
    }

    fn visit_none<E>(self) -> Result<Node, E> {
        Ok(Node::leaf("null"))
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Node, D::Error>
    where
        D: Deserializer<'de>,
    {
        Node::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Node, E> {
        Ok(Node::leaf(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Node, E> {
        Ok(Node::leaf(v.to_string()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Node, E> {
        Ok(Node::leaf(v.to_string()))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Node, E> {
        // Rendered like `serde_json::Number` to match `Node::from(Value)`.
        match serde_json::Number::from_f64(v) {
            Some(number) => Ok(Node::leaf(number.to_string())),
            None => Ok(Node::leaf("null")),
        }
    }

    fn visit_str<E>(self, v: &str) -> Result<Node, E> {
        Ok(Node::leaf(v))
    }

    fn visit_string<E>(self, v: String) -> Result<Node, E> {
        Ok(Node::Leaf(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Node, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Node>()? {
            items.push(item);
        }
        Ok(Node::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Node, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Node>()? {
            entries.push((key, value));
        }
        Ok(Node::Object(entries))
    }
}

pub struct Children<'a> {
    inner: ChildrenInner<'a>,
}

enum ChildrenInner<'a> {
    Empty,
    Object(std::slice::Iter<'a, (String, Node)>),
    Array(std::slice::Iter<'a, Node>),
}

impl<'a> Iterator for Children<'a> {
    type Item = (&'a str, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            ChildrenInner::Empty => None,
            ChildrenInner::Object(iter) => iter.next().map(|(key, node)| (key.as_str(), node)),
            ChildrenInner::Array(iter) => iter.next().map(|node| ("", node)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            ChildrenInner::Empty => (0, Some(0)),
            ChildrenInner::Object(iter) => iter.size_hint(),
            ChildrenInner::Array(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for Children<'_> {}

#[cfg(test)]
mod tests {
    use super::Node;
    use crate::core::error::ErrorKind;
    use serde_json::json;

    fn sample() -> Node {
        Node::from(json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "properties": {"route_name": "504", "vehicle_id": 101},
                    "geometry": {"coordinates": [-79.4, 43.7]}
                }
            ],
            "flags": {"live": true, "note": null}
        }))
    }

    #[test]
    fn scalars_become_textual_leaves() {
        let tree = sample();
        assert_eq!(tree.find("flags.live").and_then(Node::value), Some("true"));
        assert_eq!(tree.find("flags.note").and_then(Node::value), Some("null"));
        assert_eq!(tree.find("type").and_then(Node::value), Some("FeatureCollection"));
    }

    #[test]
    fn object_children_keep_document_order() {
        let tree = Node::from(json!({"zeta": 1, "alpha": 2, "mid": 3}));
        let labels: Vec<_> = tree.children().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn array_children_have_empty_labels() {
        let tree = Node::from(json!([1, 2, 3]));
        assert_eq!(tree.len(), 3);
        assert!(tree.children().all(|(label, _)| label.is_empty()));
        assert_eq!(tree.first().and_then(Node::value), Some("1"));
        assert_eq!(tree.last().and_then(Node::value), Some("3"));
    }

    #[test]
    fn typed_lookup_by_path() {
        let tree = sample();
        let feature = tree.get_child("features").expect("features").first().expect("first");
        assert_eq!(feature.get::<String>("properties.route_name").expect("name"), "504");
        assert_eq!(feature.get::<i64>("properties.vehicle_id").expect("id"), 101);
        let coords = feature.get_child("geometry.coordinates").expect("coords");
        assert_eq!(coords.first().expect("lon").get_value::<f64>().expect("f64"), -79.4);
    }

    #[test]
    fn missing_path_is_schema_error() {
        let err = sample().get_child("features.missing").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.message().unwrap_or_default().contains("features.missing"));
    }

    #[test]
    fn failed_conversion_is_schema_error() {
        let err = sample().get::<i64>("type").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert!(err.message().unwrap_or_default().ends_with("(type)"));

        let err = sample().get::<String>("flags").expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Schema);
    }

    #[test]
    fn string_reads_keep_surrounding_whitespace() {
        let tree = Node::from(json!({"name": " 504 Express ", "id": " 101 ", "lon": "\t-79.4\n"}));
        assert_eq!(tree.get::<String>("name").expect("name"), " 504 Express ");
        assert_eq!(tree.get::<i64>("id").expect("id"), 101);
        assert_eq!(tree.get::<f64>("lon").expect("lon"), -79.4);
    }

    #[test]
    fn nodes_with_children_have_no_value() {
        let tree = Node::from(json!({"route_name": {"x": 1}, "list": []}));
        for path in ["route_name", "list"] {
            let err = tree.get::<String>(path).expect_err("err");
            assert_eq!(err.kind(), ErrorKind::Schema);
            assert!(err.message().unwrap_or_default().contains("holds children"));
        }
    }

    #[test]
    fn deserialized_tree_matches_value_conversion() {
        let text = r#"{"a":[1,-2,3.5,1e20],"b":{"c":null,"d":true},"e":"x\ny"}"#;
        let direct: Node = serde_json::from_str(text).expect("node");
        let via_value = Node::from(serde_json::from_str::<serde_json::Value>(text).expect("value"));
        assert_eq!(direct, via_value);
    }

    #[test]
    fn deserialized_tree_keeps_repeated_labels() {
        let tree: Node = serde_json::from_str(r#"{"k":"first","other":0,"k":"second"}"#)
            .expect("node");
        let labels: Vec<_> = tree.children().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["k", "other", "k"]);
        assert_eq!(tree.get::<String>("k").expect("k"), "first");
    }

    #[test]
    fn leaves_have_no_children() {
        let leaf = Node::leaf("x");
        assert!(leaf.is_empty());
        assert_eq!(leaf.children().count(), 0);
        assert!(leaf.child("x").is_none());
    }
}
