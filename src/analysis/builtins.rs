use std::sync::OnceLock;

use anyhow::Context;
use serde::Deserialize;

/// One entry of the built-in opcode catalogue. These are engine-provided
/// callables; their declarations never appear in SSL source.
#[derive(Debug, Deserialize)]
pub struct Builtin {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub params: Vec<String>,
    pub doc: String,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    builtin: Vec<Builtin>,
}

static CATALOGUE: OnceLock<Vec<Builtin>> = OnceLock::new();

fn load_manifest() -> anyhow::Result<Vec<Builtin>> {
    let manifest: Manifest = toml::from_str(include_str!("builtins.toml"))
        .context("parse embedded builtin opcode manifest")?;
    Ok(manifest.builtin)
}

pub fn catalogue() -> &'static [Builtin] {
    CATALOGUE
        .get_or_init(|| load_manifest().expect("embedded builtin manifest is valid"))
        .as_slice()
}

pub fn lookup(name: &str) -> Option<&'static Builtin> {
    catalogue().iter().find(|b| b.name == name)
}
