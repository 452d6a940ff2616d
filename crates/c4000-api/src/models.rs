// Wire shapes of the `cgi_get` endpoint.
//
// Every object read returns `{Objects: [{ObjName, Param: [{ParamName,
// ParamValue}]}]}`. Field names are PascalCase on the wire.

use serde::{Deserialize, Serialize};

/// Envelope returned by `cgi_get`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ObjectsResponse {
    #[serde(default)]
    pub objects: Vec<CgiObject>,
}

impl ObjectsResponse {
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }
}

/// One node of the modem's configuration tree.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CgiObject {
    /// Dotted object path, e.g. `Device.Firewall.X_LANTIQ_COM_URLFilter.Rule.3.`
    #[serde(default)]
    pub obj_name: String,
    #[serde(default)]
    pub param: Vec<CgiParam>,
}

impl CgiObject {
    /// Value of the first parameter called `name`, if present.
    pub fn param(&self, name: &str) -> Option<String> {
        self.param
            .iter()
            .find(|p| p.param_name == name)
            .map(CgiParam::value)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CgiParam {
    #[serde(default)]
    pub param_name: String,
    /// Usually a string, but some firmware builds emit bare numbers/bools.
    #[serde(default)]
    pub param_value: serde_json::Value,
}

impl CgiParam {
    /// The value rendered as a string; `null` becomes empty.
    pub fn value(&self) -> String {
        match &self.param_value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}
