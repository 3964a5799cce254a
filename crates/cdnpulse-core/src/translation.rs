//! Provider label translation
//!
//! The provider reports ISP, province and country names in Chinese. The
//! table maps them to stable English display names; labels without an entry
//! are passed through unchanged.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

const BUILTIN: &[(&str, &str)] = &[
    // Carriers
    ("电信", "China Telecom"),
    ("中国电信", "China Telecom"),
    ("联通", "China Unicom"),
    ("中国联通", "China Unicom"),
    ("移动", "China Mobile"),
    ("中国移动", "China Mobile"),
    ("铁通", "China Tietong"),
    ("教育网", "CERNET"),
    ("长城宽带", "Great Wall Broadband"),
    ("鹏博士", "Dr. Peng"),
    ("广电", "China Broadnet"),
    ("方正宽带", "Founder Broadband"),
    ("其他", "Other"),
    ("其它", "Other"),
    ("未知", "Unknown"),
    // Provinces, municipalities and autonomous regions
    ("北京", "Beijing"),
    ("天津", "Tianjin"),
    ("上海", "Shanghai"),
    ("重庆", "Chongqing"),
    ("河北", "Hebei"),
    ("山西", "Shanxi"),
    ("辽宁", "Liaoning"),
    ("吉林", "Jilin"),
    ("黑龙江", "Heilongjiang"),
    ("江苏", "Jiangsu"),
    ("浙江", "Zhejiang"),
    ("安徽", "Anhui"),
    ("福建", "Fujian"),
    ("江西", "Jiangxi"),
    ("山东", "Shandong"),
    ("河南", "Henan"),
    ("湖北", "Hubei"),
    ("湖南", "Hunan"),
    ("广东", "Guangdong"),
    ("海南", "Hainan"),
    ("四川", "Sichuan"),
    ("贵州", "Guizhou"),
    ("云南", "Yunnan"),
    ("陕西", "Shaanxi"),
    ("甘肃", "Gansu"),
    ("青海", "Qinghai"),
    ("台湾", "Taiwan"),
    ("内蒙古", "Inner Mongolia"),
    ("广西", "Guangxi"),
    ("西藏", "Tibet"),
    ("宁夏", "Ningxia"),
    ("新疆", "Xinjiang"),
    ("香港", "Hong Kong"),
    ("澳门", "Macau"),
    // Overseas states and regions
    ("美国", "United States"),
    ("加拿大", "Canada"),
    ("日本", "Japan"),
    ("韩国", "South Korea"),
    ("新加坡", "Singapore"),
    ("马来西亚", "Malaysia"),
    ("泰国", "Thailand"),
    ("越南", "Vietnam"),
    ("印度", "India"),
    ("澳大利亚", "Australia"),
    ("英国", "United Kingdom"),
    ("德国", "Germany"),
    ("法国", "France"),
    ("荷兰", "Netherlands"),
    ("俄罗斯", "Russia"),
    ("巴西", "Brazil"),
    ("海外", "Overseas"),
];

/// Immutable raw-to-display label mapping
#[derive(Debug, Clone, Default)]
pub struct TranslationTable {
    entries: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct OverrideFile {
    #[serde(default)]
    translations: HashMap<String, String>,
}

impl TranslationTable {
    /// Table with no entries; every label passes through
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with the built-in Chinese to English mapping
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN.iter().map(|(raw, display)| (*raw, *display)))
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Merge entries on top of this table, replacing existing mappings
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.entries
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Merge the `[translations]` table of a TOML file
    pub fn load_overrides(self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: OverrideFile = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        info!(
            path = %path.display(),
            entries = file.translations.len(),
            "Loaded translation overrides"
        );

        Ok(self.with_overrides(file.translations))
    }

    /// Display name for `raw`, or `raw` itself when unmapped
    pub fn translate<'a>(&'a self, raw: &'a str) -> &'a str {
        self.entries.get(raw).map(String::as_str).unwrap_or(raw)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
