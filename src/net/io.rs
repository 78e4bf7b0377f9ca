//! 网结构输入：已解析的定义数据以及 JSON / RON 读取。
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::structure::Tokens;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unsupported definition format `{0}`")]
    Format(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tokens: Tokens,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcDef {
    pub id: String,
    pub source: String,
    pub target: String,
}

/// Structural data of a net as handed over by a loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDefinition {
    #[serde(default)]
    pub places: Vec<PlaceDef>,
    #[serde(default)]
    pub transitions: Vec<TransitionDef>,
    #[serde(default)]
    pub arcs: Vec<ArcDef>,
}

impl NetDefinition {
    pub fn place(mut self, id: &str, tokens: Tokens) -> Self {
        self.places.push(PlaceDef {
            id: id.to_string(),
            name: id.to_string(),
            tokens,
        });
        self
    }

    pub fn transition(mut self, id: &str) -> Self {
        self.transitions.push(TransitionDef {
            id: id.to_string(),
            name: id.to_string(),
        });
        self
    }

    pub fn arc(mut self, id: &str, source: &str, target: &str) -> Self {
        self.arcs.push(ArcDef {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
        });
        self
    }
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s)?)
}

/// Reads a definition, choosing the format from the file extension.
pub fn read_definition<P: AsRef<Path>>(path: P) -> Result<NetDefinition, IoError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => from_json_str(&content),
        Some("ron") => from_ron_str(&content),
        other => Err(IoError::Format(other.unwrap_or_default().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_definition_with_defaults() {
        let definition: NetDefinition = from_json_str(
            r#"{
                "places": [{ "id": "p1", "tokens": 2 }],
                "transitions": [{ "id": "t1", "name": "consume" }],
                "arcs": [{ "id": "a1", "source": "p1", "target": "t1" }]
            }"#,
        )
        .unwrap();

        assert_eq!(definition.places[0].name, "");
        assert_eq!(definition.places[0].tokens, 2);
        assert_eq!(definition.transitions[0].name, "consume");
        assert_eq!(definition.arcs[0].target, "t1");
    }

    #[test]
    fn ron_definition_matches_builder() {
        let definition: NetDefinition = from_ron_str(
            r#"(
                places: [(id: "p", name: "p", tokens: 1)],
                transitions: [(id: "t", name: "t")],
                arcs: [(id: "a", source: "t", target: "p")],
            )"#,
        )
        .unwrap();

        let built = NetDefinition::default()
            .place("p", 1)
            .transition("t")
            .arc("a", "t", "p");
        assert_eq!(definition, built);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join("pnbound-definition.xml");
        fs::write(&path, "<pnml/>").unwrap();
        assert!(matches!(read_definition(&path), Err(IoError::Format(_))));
        let _ = fs::remove_file(path);
    }
}
