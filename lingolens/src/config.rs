use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub embeddings: EmbeddingsConfig,
    pub ocr: OcrConfig,
    pub translation: TranslationConfig,
    pub overlay: OverlayConfig,
    pub storage: StorageConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    pub model: String,
    pub dimensions: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub languages: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub from_lang: String,
    pub to_lang: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

/// Overlay rendering knobs. Font size is derived per image as
/// `max(min_font_size, image_width / font_size_divisor)`.
#[derive(Debug, Clone, Deserialize)]
pub struct OverlayConfig {
    pub font_paths: Vec<String>,
    pub min_font_size: f32,
    pub font_size_divisor: f32,
    pub padding: u32,
    pub line_spacing: u32,
    pub top_margin: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory image blobs are written under.
    pub root: String,
    /// Base URL prepended to object names when building public locators.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

fn default_font_paths() -> Vec<String> {
    [
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/truetype/takao-gothic/TakaoPGothic.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
        "C:\\Windows\\Fonts\\meiryo.ttc",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("LINGOLENS_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("LINGOLENS_PORT", 3000),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:lingolens.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            embeddings: EmbeddingsConfig {
                model: env::var("EMBEDDING_MODEL")
                    .unwrap_or_else(|_| "BAAI/bge-small-en-v1.5".to_string()),
                dimensions: parse_env_or("EMBEDDING_DIMENSIONS", 384),
            },
            ocr: OcrConfig {
                model: env::var("OCR_MODEL").unwrap_or_else(|_| "local/tesseract".to_string()),
                api_key: env::var("OCR_API_KEY").ok(),
                base_url: env::var("OCR_BASE_URL").ok(),
                languages: env::var("OCR_LANGUAGES").unwrap_or_else(|_| "eng".to_string()),
                timeout_secs: parse_env_or("OCR_TIMEOUT", 60),
                max_retries: parse_env_or("OCR_MAX_RETRIES", 3),
            },
            translation: TranslationConfig {
                api_key: env::var("TRANSLATOR_API_KEY").ok(),
                base_url: env::var("TRANSLATOR_BASE_URL").ok(),
                from_lang: env::var("TRANSLATE_FROM").unwrap_or_else(|_| "en".to_string()),
                to_lang: env::var("TRANSLATE_TO").unwrap_or_else(|_| "ja".to_string()),
                timeout_secs: parse_env_or("TRANSLATOR_TIMEOUT", 30),
                max_retries: parse_env_or("TRANSLATOR_MAX_RETRIES", 3),
            },
            overlay: OverlayConfig {
                font_paths: env::var("OVERLAY_FONT_PATHS")
                    .map(|raw| {
                        raw.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_else(|_| default_font_paths()),
                min_font_size: parse_env_or("OVERLAY_MIN_FONT_SIZE", 15.0),
                font_size_divisor: parse_env_or("OVERLAY_FONT_DIVISOR", 25.0),
                padding: parse_env_or("OVERLAY_PADDING", 10),
                line_spacing: parse_env_or("OVERLAY_LINE_SPACING", 5),
                top_margin: parse_env_or("OVERLAY_TOP_MARGIN", 10),
            },
            storage: StorageConfig {
                root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "data/images".to_string()),
                public_base_url: env::var("STORAGE_PUBLIC_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/images/".to_string()),
            },
            retrieval: RetrievalConfig {
                default_limit: parse_env_or("SEARCH_DEFAULT_LIMIT", 5),
                max_limit: parse_env_or("SEARCH_MAX_LIMIT", 50),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
