//! Zero-panic conversion between JSON documents and the shared data tree
use crate::errors::ReconcileError;
use crate::schema::{ContainmentResolver, JsonSchema};
use crate::types::{DataObject, DataRef, Field};
use std::collections::HashMap;

/// Build a data tree from a JSON object. Arrays of objects under a containment
/// property become child collections; everything else is kept as a plain value.
pub fn data_from_json(
    value: &serde_json::Value,
    schema: &JsonSchema,
    resolver: &dyn ContainmentResolver,
) -> Result<DataRef, ReconcileError> {
    let map = value.as_object().ok_or_else(|| ReconcileError::TypeConversion {
        expected: "object".into(),
        actual: json_kind(value).into(),
    })?;

    let containment: HashMap<_, _> = resolver
        .containment_properties(schema)
        .into_iter()
        .map(|p| (p.property.clone(), p))
        .collect();

    let mut object = DataObject::new();
    for (key, v) in map {
        let field = match (containment.get(key), v) {
            (Some(prop), serde_json::Value::Array(items))
                if items.iter().all(|i| i.is_object()) =>
            {
                let children = items
                    .iter()
                    .map(|item| data_from_json(item, &prop.child_schema, resolver))
                    .collect::<Result<Vec<_>, _>>()?;
                Field::Children(children)
            }
            _ => Field::Value(v.clone()),
        };
        object.set(key, field);
    }
    Ok(object.into_ref())
}

/// Convert a data tree back to JSON
pub fn data_to_json(data: &DataRef) -> serde_json::Value {
    let object = data.borrow();
    let map = object
        .fields()
        .map(|(key, field)| {
            let value = match field {
                Field::Value(v) => v.clone(),
                Field::Children(children) => {
                    serde_json::Value::Array(children.iter().map(data_to_json).collect())
                }
            };
            (key.to_string(), value)
        })
        .collect();
    serde_json::Value::Object(map)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaContainmentResolver;
    use serde_json::json;

    fn schema() -> JsonSchema {
        JsonSchema::from_value(json!({
            "type": "object",
            "properties": {
                "children": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "id": "bar",
                        "properties": {
                            "name": { "type": "string" },
                            "children": { "type": "array", "items": { "type": "object", "id": "baz" } }
                        }
                    }
                },
                "tags": { "type": "array", "items": { "type": "string" } }
            }
        }))
        .unwrap()
    }

    #[test]
    fn builds_nested_collections() {
        let doc = json!({
            "children": [{ "name": "1", "children": [{ "x": 1 }] }, { "name": "2" }],
            "tags": ["a", "b"]
        });
        let data = data_from_json(&doc, &schema(), &SchemaContainmentResolver).unwrap();
        let root = data.borrow();
        let children = root.children("children").unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].borrow().children("children").map(Vec::len), Some(1));
        assert_eq!(root.value("tags"), Some(&json!(["a", "b"])));
        drop(root);
        assert_eq!(data_to_json(&data), doc);
    }

    #[test]
    fn non_object_root_is_rejected() {
        let err =
            data_from_json(&json!([1, 2]), &schema(), &SchemaContainmentResolver).unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::TypeConversion { ref actual, .. } if actual == "array"
        ));
    }

    #[test]
    fn mixed_array_stays_a_value() {
        let doc = json!({ "children": [{ "name": "1" }, 3] });
        let data = data_from_json(&doc, &schema(), &SchemaContainmentResolver).unwrap();
        assert!(data.borrow().children("children").is_none());
        assert_eq!(data_to_json(&data), doc);
    }
}
