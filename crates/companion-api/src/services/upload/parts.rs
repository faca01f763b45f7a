use crate::constants::{MAX_PART_NUMBER, MIN_PART_NUMBER};
use companion_core::AppError;
use companion_storage::CompletedPartRef;
use serde_json::{Map, Value};

const INVALID_PARTS: &str = "s3: `parts` must be an array of {ETag, PartNumber} objects.";

/// Parse a part number from a JSON number or a numeric string.
pub(crate) fn part_number_from(value: &Value) -> Option<i32> {
    let n = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0)
                .map(|f| f as i64)
        })?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    (MIN_PART_NUMBER..=MAX_PART_NUMBER)
        .contains(&n)
        .then_some(n as i32)
}

fn field<'a>(object: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| object.get(*name))
}

fn completed_part(value: &Value) -> Option<CompletedPartRef> {
    let object = value.as_object()?;
    let part_number = part_number_from(field(object, &["PartNumber", "partNumber"])?)?;
    let e_tag = field(object, &["ETag", "eTag", "etag"])?.as_str()?;
    Some(CompletedPartRef {
        part_number,
        e_tag: e_tag.to_string(),
    })
}

/// Validate the `parts` array of a complete request.
///
/// Every element must be an object with a part number in `1..=10000` and a
/// string ETag. Lower-camel and lowercase field aliases are accepted.
pub fn parse_completed_parts(parts: Option<&Value>) -> Result<Vec<CompletedPartRef>, AppError> {
    let invalid = || AppError::Validation(INVALID_PARTS.to_string());

    let items = parts.and_then(Value::as_array).ok_or_else(invalid)?;
    if items.is_empty() {
        return Err(invalid());
    }

    items
        .iter()
        .map(|item| completed_part(item).ok_or_else(invalid))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_wire_names_and_aliases() {
        let parts = json!([
            {"PartNumber": 1, "ETag": "\"a\""},
            {"partNumber": "2", "eTag": "\"b\""},
            {"PartNumber": 3.0, "etag": "\"c\""}
        ]);
        let parsed = parse_completed_parts(Some(&parts)).unwrap();
        assert_eq!(
            parsed.iter().map(|p| p.part_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(parsed[1].e_tag, "\"b\"");
    }

    #[test]
    fn test_rejects_empty_and_non_arrays() {
        assert!(parse_completed_parts(Some(&json!([]))).is_err());
        assert!(parse_completed_parts(Some(&json!({"PartNumber": 1}))).is_err());
        assert!(parse_completed_parts(None).is_err());
    }

    #[test]
    fn test_rejects_bad_elements() {
        for bad in [
            json!([{"PartNumber": 1}]),
            json!([{"ETag": "x"}]),
            json!([{"PartNumber": 0, "ETag": "x"}]),
            json!([{"PartNumber": 1.5, "ETag": "x"}]),
            json!([{"PartNumber": "abc", "ETag": "x"}]),
            json!([{"PartNumber": 1, "ETag": 7}]),
            json!(["not an object"]),
        ] {
            assert!(parse_completed_parts(Some(&bad)).is_err(), "accepted {}", bad);
        }
    }

    #[test]
    fn test_part_number_bounds() {
        assert_eq!(part_number_from(&json!(1)), Some(1));
        assert_eq!(part_number_from(&json!("10000")), Some(10_000));
        assert_eq!(part_number_from(&json!(10_001)), None);
        assert_eq!(part_number_from(&json!(-3)), None);
    }
}
