use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct EnumDef {
    #[serde(skip)]
    pub name: String,

    pub values: Vec<String>,
}

impl EnumDef {
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}
