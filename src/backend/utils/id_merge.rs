/**
 * Id List Merging
 */

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::Value;

/// Ids to add to and remove from a list
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdUpdate {
    #[serde(default)]
    pub add: Vec<Value>,
    #[serde(default)]
    pub remove: Vec<Value>,
}

/// Ids are compared as strings so numbers and strings mix
fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merge `update` into `main`: append `add`, drop `remove`, de-duplicate
/// keeping the first occurrence
pub fn id_arr_merge(main: &[Value], update: &IdUpdate) -> Vec<String> {
    let removed: HashSet<String> = update.remove.iter().map(id_string).collect();
    let mut seen = HashSet::new();
    main.iter()
        .chain(update.add.iter())
        .map(id_string)
        .filter(|id| !removed.contains(id))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge() {
        let main = vec![json!("a"), json!("b"), json!(3)];
        let update = IdUpdate {
            add: vec![json!("c"), json!("a"), json!("d")],
            remove: vec![json!("b"), json!("d")],
        };
        assert_eq!(id_arr_merge(&main, &update), vec!["a", "3", "c"]);
    }

    #[test]
    fn test_merge_empty_update() {
        let main = vec![json!("x"), json!("x")];
        assert_eq!(id_arr_merge(&main, &IdUpdate::default()), vec!["x"]);
    }
}
