// Value model of the expression evaluator.
//
// The engine distinguishes between a path lookup that failed (`Missing`) and
// a present JSON value, which may itself be the undefined sentinel. JZ
// distinguishes undefined (no value) from null (explicit null): undefined is
// encoded in-band as a single-entry marker object so it can travel through
// the rewritten template text and be pruned by the finalizer.

use serde_json::{Map, Value};

/// Key of the in-band undefined marker object.
pub(crate) const UNDEFINED_KEY: &str = "__jz_undefined__";

/// Create the undefined sentinel value.
///
/// Callers place this in `data` to mark a field as explicitly absent:
///
/// ```
/// let mut data = serde_json::json!({ "user": { "name": "A" } });
/// data["user"]["middle"] = jz::undefined();
/// ```
pub fn undefined() -> Value {
    let mut obj = Map::new();
    obj.insert(UNDEFINED_KEY.to_string(), Value::Bool(true));
    Value::Object(obj)
}

/// Check whether a value is the undefined sentinel.
///
/// This is the single sentinel predicate; every traversal in the engine goes
/// through it.
pub fn is_undefined(value: &Value) -> bool {
    match value {
        Value::Object(obj) => obj.len() == 1 && obj.get(UNDEFINED_KEY) == Some(&Value::Bool(true)),
        _ => false,
    }
}

/// Result of evaluating an expression: either a failed path lookup or a
/// present JSON value.
#[derive(Debug, Clone)]
pub(crate) enum EvalValue {
    Missing,
    Present(Value),
}

impl EvalValue {
    pub(crate) fn is_missing(&self) -> bool {
        matches!(self, EvalValue::Missing)
    }

    /// Missing, or the present value is the undefined sentinel.
    pub(crate) fn is_undefined(&self) -> bool {
        match self {
            EvalValue::Missing => true,
            EvalValue::Present(v) => is_undefined(v),
        }
    }

    /// Only undefined is nullish; explicit null is not.
    pub(crate) fn is_nullish(&self) -> bool {
        self.is_undefined()
    }

    pub(crate) fn is_truthy(&self) -> bool {
        let v = match self {
            EvalValue::Missing => return false,
            EvalValue::Present(v) => v,
        };
        if is_undefined(v) {
            return false;
        }
        match v {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().map_or(true, |d| d != 0.0),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Coerce to a number: numbers pass through, booleans map to 1/0, and
    /// strings must parse in full (the empty string counts as 0).
    pub(crate) fn to_number(&self) -> Option<f64> {
        let v = match self {
            EvalValue::Missing => return None,
            EvalValue::Present(v) => v,
        };
        if is_undefined(v) {
            return None;
        }
        match v {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => {
                if s.is_empty() {
                    Some(0.0)
                } else {
                    s.parse::<f64>().ok()
                }
            }
            _ => None,
        }
    }

    /// The JSON value carried by this result; missing reads as null.
    pub(crate) fn into_json(self) -> Value {
        match self {
            EvalValue::Missing => Value::Null,
            EvalValue::Present(v) => v,
        }
    }

    pub(crate) fn as_json(&self) -> &Value {
        static NULL: Value = Value::Null;
        match self {
            EvalValue::Missing => &NULL,
            EvalValue::Present(v) => v,
        }
    }
}

/// Loose equality:
/// 1. missing and undefined are all mutually equal,
/// 2. same JSON type compares structurally (numbers via f64),
/// 3. otherwise numeric coercion when both sides coerce,
/// 4. otherwise the string-dump forms are compared.
pub(crate) fn eq_values(a: &EvalValue, b: &EvalValue) -> bool {
    if a.is_undefined() && b.is_undefined() {
        return true;
    }

    if !a.is_undefined() && !b.is_undefined() {
        let (va, vb) = (a.as_json(), b.as_json());
        if same_kind(va, vb) {
            if let (Value::Number(x), Value::Number(y)) = (va, vb) {
                return x.as_f64() == y.as_f64();
            }
            return va == vb;
        }
    }

    if let (Some(an), Some(bn)) = (a.to_number(), b.to_number()) {
        return an == bn;
    }

    dump_for_eq(a) == dump_for_eq(b)
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn dump_for_eq(v: &EvalValue) -> String {
    match v {
        EvalValue::Missing => "missing".to_string(),
        EvalValue::Present(j) if is_undefined(j) => "undefined".to_string(),
        EvalValue::Present(j) => j.to_string(),
    }
}

/// Relational operator for [`compare_values`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum CmpOp {
    Lt,
    Gt,
    Le,
    Ge,
}

/// Relational compare: numeric when both sides coerce, lexicographic when
/// both are strings, `None` when not comparable.
pub(crate) fn compare_values(a: &EvalValue, b: &EvalValue, op: CmpOp) -> Option<bool> {
    if let (Some(an), Some(bn)) = (a.to_number(), b.to_number()) {
        return Some(match op {
            CmpOp::Lt => an < bn,
            CmpOp::Gt => an > bn,
            CmpOp::Le => an <= bn,
            CmpOp::Ge => an >= bn,
        });
    }
    if a.is_undefined() || b.is_undefined() {
        return None;
    }
    if let (Value::String(sa), Value::String(sb)) = (a.as_json(), b.as_json()) {
        return Some(match op {
            CmpOp::Lt => sa < sb,
            CmpOp::Gt => sa > sb,
            CmpOp::Le => sa <= sb,
            CmpOp::Ge => sa >= sb,
        });
    }
    None
}

/// RFC 7396 JSON Merge Patch. A non-object patch replaces the target; null
/// patch members remove the key.
pub(crate) fn merge_patch(target: &mut Value, patch: &Value) {
    match patch {
        Value::Object(entries) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            let obj = target
                .as_object_mut()
                .expect("target was just coerced to an object");
            for (key, val) in entries {
                if val.is_null() {
                    obj.shift_remove(key);
                } else {
                    merge_patch(obj.entry(key.clone()).or_insert(Value::Null), val);
                }
            }
        }
        _ => *target = patch.clone(),
    }
}

/// True for null and for empty arrays/objects; scalars are never empty.
pub(crate) fn is_empty_value(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Remove undefined sentinels from a finished tree: object properties whose
/// value is the sentinel are deleted, array elements that are the sentinel
/// are filtered out.
pub(crate) fn prune_undefined(value: &mut Value) {
    match value {
        Value::Object(obj) => {
            obj.retain(|_, v| !is_undefined(v));
            for (_, v) in obj.iter_mut() {
                prune_undefined(v);
            }
        }
        Value::Array(arr) => {
            arr.retain(|v| !is_undefined(v));
            for v in arr.iter_mut() {
                prune_undefined(v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sentinel_shape() {
        let u = undefined();
        assert!(is_undefined(&u));
        assert!(!is_undefined(&json!({"__jz_undefined__": false})));
        assert!(!is_undefined(&json!({"__jz_undefined__": true, "x": 1})));
        assert!(!is_undefined(&json!(null)));
    }

    #[test]
    fn test_truthiness() {
        assert!(!EvalValue::Missing.is_truthy());
        assert!(!EvalValue::Present(undefined()).is_truthy());
        assert!(!EvalValue::Present(json!(null)).is_truthy());
        assert!(!EvalValue::Present(json!(false)).is_truthy());
        assert!(!EvalValue::Present(json!(0)).is_truthy());
        assert!(!EvalValue::Present(json!("")).is_truthy());
        // empty containers are truthy
        assert!(EvalValue::Present(json!([])).is_truthy());
        assert!(EvalValue::Present(json!({})).is_truthy());
        assert!(EvalValue::Present(json!("x")).is_truthy());
        assert!(EvalValue::Present(json!(0.5)).is_truthy());
    }

    #[test]
    fn test_nullish_is_narrower_than_falsy() {
        for v in [json!(null), json!(false), json!(0), json!("")] {
            assert!(!EvalValue::Present(v).is_nullish());
        }
        assert!(EvalValue::Missing.is_nullish());
        assert!(EvalValue::Present(undefined()).is_nullish());
    }

    #[test]
    fn test_to_number() {
        assert_eq!(EvalValue::Present(json!(3)).to_number(), Some(3.0));
        assert_eq!(EvalValue::Present(json!(true)).to_number(), Some(1.0));
        assert_eq!(EvalValue::Present(json!("10")).to_number(), Some(10.0));
        assert_eq!(EvalValue::Present(json!("")).to_number(), Some(0.0));
        assert_eq!(EvalValue::Present(json!("10a")).to_number(), None);
        assert_eq!(EvalValue::Present(json!([1])).to_number(), None);
        assert_eq!(EvalValue::Missing.to_number(), None);
    }

    #[test]
    fn test_equality_rules() {
        // missing == undefined
        assert!(eq_values(
            &EvalValue::Missing,
            &EvalValue::Present(undefined())
        ));
        // numeric coercion across types
        assert!(eq_values(
            &EvalValue::Present(json!(10)),
            &EvalValue::Present(json!("10"))
        ));
        // int vs float compare numerically
        assert!(eq_values(
            &EvalValue::Present(json!(10)),
            &EvalValue::Present(json!(10.0))
        ));
        // structural equality for same-type values
        assert!(eq_values(
            &EvalValue::Present(json!({"a": 1})),
            &EvalValue::Present(json!({"a": 1}))
        ));
        // null is not undefined
        assert!(!eq_values(
            &EvalValue::Present(json!(null)),
            &EvalValue::Present(undefined())
        ));
    }

    #[test]
    fn test_relational_compare() {
        let a = EvalValue::Present(json!(1));
        let b = EvalValue::Present(json!(2));
        assert_eq!(compare_values(&a, &b, CmpOp::Lt), Some(true));
        assert_eq!(compare_values(&a, &b, CmpOp::Ge), Some(false));

        let s1 = EvalValue::Present(json!("a"));
        let s2 = EvalValue::Present(json!("b"));
        assert_eq!(compare_values(&s1, &s2, CmpOp::Lt), Some(true));

        // object vs number is not comparable
        let o = EvalValue::Present(json!({}));
        assert_eq!(compare_values(&o, &b, CmpOp::Lt), None);
    }

    #[test]
    fn test_merge_patch() {
        let mut target = json!({"a": 1, "b": {"c": 2}});
        merge_patch(&mut target, &json!({"b": {"c": 3, "d": 4}, "e": 5}));
        assert_eq!(target, json!({"a": 1, "b": {"c": 3, "d": 4}, "e": 5}));

        // null removes keys
        let mut target = json!({"a": 1, "b": 2});
        merge_patch(&mut target, &json!({"a": null}));
        assert_eq!(target, json!({"b": 2}));

        // non-object patch replaces
        let mut target = json!({"a": 1});
        merge_patch(&mut target, &json!(7));
        assert_eq!(target, json!(7));
    }

    #[test]
    fn test_prune_undefined() {
        let mut v = json!({
            "keep": 1,
            "drop": undefined(),
            "nested": { "also": undefined(), "null": null },
            "arr": ["a", undefined(), "b", null]
        });
        prune_undefined(&mut v);
        assert_eq!(
            v,
            json!({
                "keep": 1,
                "nested": { "null": null },
                "arr": ["a", "b", null]
            })
        );
    }
}
