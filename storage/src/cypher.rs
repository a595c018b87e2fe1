use serde::Serialize;
use std::collections::BTreeMap;

/// One result row, keyed by the column aliases of the `RETURN` clause.
pub type Record = BTreeMap<String, serde_json::Value>;

/// A driver-bound query parameter. User text only ever reaches the graph this way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<ParamValue>),
    Map(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(value) => Some(*value),
            ParamValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    /// The list's string members, skipping anything that is not a string.
    pub fn as_string_list(&self) -> Vec<&str> {
        self.as_list()
            .map(|values| values.iter().filter_map(ParamValue::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::String(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::String(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::String(value.clone())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        ParamValue::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values.into_iter().map(ParamValue::String).collect())
    }
}

impl From<&[String]> for ParamValue {
    fn from(values: &[String]) -> Self {
        ParamValue::List(values.iter().cloned().map(ParamValue::String).collect())
    }
}

impl From<&[f32]> for ParamValue {
    fn from(values: &[f32]) -> Self {
        ParamValue::List(
            values
                .iter()
                .map(|value| ParamValue::Float(f64::from(*value)))
                .collect(),
        )
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(values: Vec<ParamValue>) -> Self {
        ParamValue::List(values)
    }
}

impl From<BTreeMap<String, ParamValue>> for ParamValue {
    fn from(values: BTreeMap<String, ParamValue>) -> Self {
        ParamValue::Map(values)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(ParamValue::Null)
    }
}

/// Query text plus its named parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CypherQuery {
    text: String,
    params: BTreeMap<String, ParamValue>,
}

impl CypherQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.params.insert(key.into(), value.into());
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &BTreeMap<String, ParamValue> {
        &self.params
    }

    pub fn get_param(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn into_parts(self) -> (String, BTreeMap<String, ParamValue>) {
        (self.text, self.params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_binds_params_by_name() {
        let query = CypherQuery::new("MATCH (t:Team) WHERE t.name = $name RETURN t")
            .param("name", "Arsenal")
            .param("limit", 10_i64)
            .param("gw", None::<String>)
            .param("names", vec!["Salah".to_string(), "Kane".to_string()]);

        assert_eq!(query.get_param("name").and_then(ParamValue::as_str), Some("Arsenal"));
        assert_eq!(query.get_param("limit").and_then(ParamValue::as_i64), Some(10));
        assert!(query.get_param("gw").unwrap().is_null());
        assert_eq!(query.get_param("names").unwrap().as_string_list(), vec!["Salah", "Kane"]);
        assert!(!query.text().contains("Arsenal"));
    }

    #[test]
    fn float_vectors_widen_to_f64() {
        let value = ParamValue::from(&[0.5_f32, -1.0][..]);
        let floats: Vec<f64> = value
            .as_list()
            .unwrap()
            .iter()
            .filter_map(ParamValue::as_f64)
            .collect();
        assert_eq!(floats, vec![0.5, -1.0]);
    }
}
