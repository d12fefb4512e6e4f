use serde_json::Value;

/// ValueId is the identity of one node within a concrete value tree. It is
/// stable for as long as the tree itself is alive, and is the key under which
/// validation records at most one diagnostic per node.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct ValueId(pub usize);

/// Kind is the JSON type and underlying representation of an AsValue.
pub enum Kind<'a, N: AsValue> {
    Array(&'a [N]),
    Bool(bool),
    Float(f64),
    NegInt(i64),
    Null,
    Object(&'a N::Fields),
    PosInt(u64),
    String(&'a str),
}

/// AsValue is the trait through which validation walks a concrete document,
/// whatever its in-memory representation. Hosts with their own syntax trees
/// implement it over those; a serde_json::Value implementation is built in.
pub trait AsValue: Sized {
    type Fields: Fields<Self>;

    fn kind(&self) -> Kind<'_, Self>;

    fn value_id(&self) -> ValueId;

    /// The canonical text of this value, used for textual equality (as in
    /// `uniqueItems`).
    fn raw_text(&self) -> String;

    /// Whether string values are definitively typed. Formats with unquoted
    /// scalars return false, letting numeric-looking text also satisfy
    /// numeric type declarations.
    fn strings_are_typed(&self) -> bool {
        true
    }
}

/// Fields is the object form of an AsValue.
pub trait Fields<N: AsValue> {
    type Field<'a>: Field<'a, N>
    where
        Self: 'a,
        N: 'a;
    type Iter<'a>: Iterator<Item = Self::Field<'a>>
    where
        Self: 'a,
        N: 'a;

    fn get(&self, property: &str) -> Option<&N>;
    fn len(&self) -> usize;
    fn iter(&self) -> Self::Iter<'_>;
}

/// Field is a single property/value pairing of an object.
pub trait Field<'a, N: AsValue> {
    fn property(&self) -> &'a str;
    fn value(&self) -> &'a N;
}

impl AsValue for Value {
    type Fields = serde_json::Map<String, Value>;

    fn kind(&self) -> Kind<'_, Value> {
        match self {
            Value::Array(a) => Kind::Array(a),
            Value::Bool(b) => Kind::Bool(*b),
            Value::Null => Kind::Null,
            Value::Number(n) => {
                if let Some(n) = n.as_u64() {
                    Kind::PosInt(n)
                } else if let Some(n) = n.as_i64() {
                    Kind::NegInt(n)
                } else {
                    Kind::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::Object(o) => Kind::Object(o),
            Value::String(s) => Kind::String(s),
        }
    }

    fn value_id(&self) -> ValueId {
        ValueId(self as *const Value as usize)
    }

    fn raw_text(&self) -> String {
        self.to_string()
    }
}

impl Fields<Value> for serde_json::Map<String, Value> {
    type Field<'a> = (&'a String, &'a Value)
    where
        Self: 'a,
        Value: 'a;
    type Iter<'a> = serde_json::map::Iter<'a>
    where
        Self: 'a,
        Value: 'a;

    fn get(&self, property: &str) -> Option<&Value> {
        serde_json::Map::get(self, property)
    }
    fn len(&self) -> usize {
        serde_json::Map::len(self)
    }
    fn iter(&self) -> serde_json::map::Iter<'_> {
        serde_json::Map::iter(self)
    }
}

impl<'a> Field<'a, Value> for (&'a String, &'a Value) {
    fn property(&self) -> &'a str {
        self.0
    }
    fn value(&self) -> &'a Value {
        self.1
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_ids_are_distinct_per_node() {
        let doc = json!({"a": [1, 2], "b": {"c": true}});
        let mut seen = std::collections::BTreeSet::new();

        fn walk(v: &Value, seen: &mut std::collections::BTreeSet<ValueId>) {
            assert!(seen.insert(v.value_id()));
            match v.kind() {
                Kind::Array(items) => items.iter().for_each(|i| walk(i, seen)),
                Kind::Object(fields) => {
                    fields.iter().for_each(|f| walk(f.value(), seen))
                }
                _ => (),
            }
        }
        walk(&doc, &mut seen);
        assert_eq!(6, seen.len());

        // Identity is stable across repeated lookups.
        assert_eq!(doc["a"].value_id(), doc["a"].value_id());
    }

    #[test]
    fn raw_text_is_canonical_json() {
        assert_eq!("1", json!(1).raw_text());
        assert_eq!("1.5", json!(1.5).raw_text());
        assert_eq!(r#""s""#, json!("s").raw_text());
        assert_eq!("[1,2]", json!([1, 2]).raw_text());
    }
}
