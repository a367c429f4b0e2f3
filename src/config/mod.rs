use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Base URL of the remote "URL -> markdown" extraction endpoint
    #[serde(default = "default_extractor_base_url")]
    pub extractor_base_url: String,

    /// Optional bearer token for the extraction endpoint
    #[serde(default)]
    pub extractor_api_key: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_extractor_base_url() -> String {
    "https://r.jina.ai".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}
