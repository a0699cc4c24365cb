use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

/// Selectable dialing-code entry on the login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

/// One record of a REST-countries style payload (`fields=name,idd,flags`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCountry {
    pub name: RawCountryName,
    #[serde(default)]
    pub idd: Option<RawDialing>,
    #[serde(default)]
    pub flags: Option<RawFlags>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCountryName {
    pub common: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDialing {
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub suffixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFlags {
    #[serde(default)]
    pub svg: Option<String>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CountryError {
    #[snafu(display("failed to read country list from {path:?}"))]
    ReadCountries {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("country list at {path:?} is malformed"))]
    ParseCountries {
        stage: &'static str,
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("no country source is configured"))]
    NotConfigured { stage: &'static str },
}

/// External provider of the country list.
pub trait CountrySource {
    fn fetch(&self) -> Result<Vec<Country>, CountryError>;
}

/// Reads a REST-countries payload saved on disk.
#[derive(Debug, Clone)]
pub struct JsonFileCountrySource {
    path: PathBuf,
}

impl JsonFileCountrySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CountrySource for JsonFileCountrySource {
    fn fetch(&self) -> Result<Vec<Country>, CountryError> {
        let text = std::fs::read_to_string(&self.path).context(ReadCountriesSnafu {
            stage: "countries-read-file",
            path: self.path.clone(),
        })?;
        let raw: Vec<RawCountry> = serde_json::from_str(&text).context(ParseCountriesSnafu {
            stage: "countries-parse-file",
            path: self.path.clone(),
        })?;
        Ok(normalize_countries(raw))
    }
}

/// Stand-in used when no source is configured; always fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredCountrySource;

impl CountrySource for UnconfiguredCountrySource {
    fn fetch(&self) -> Result<Vec<Country>, CountryError> {
        NotConfiguredSnafu {
            stage: "countries-unconfigured",
        }
        .fail()
    }
}

/// Maps raw records to countries, dropping those without a dialing code, sorted by name.
pub fn normalize_countries(raw: Vec<RawCountry>) -> Vec<Country> {
    let mut countries = raw
        .into_iter()
        .filter_map(|record| {
            let idd = record.idd.unwrap_or_default();
            let root = idd.root.filter(|root| !root.is_empty())?;
            let suffix = idd
                .suffixes
                .and_then(|suffixes| suffixes.into_iter().next())
                .unwrap_or_default();

            Some(Country {
                name: record.name.common,
                code: format!("{root}{suffix}"),
                flag: record.flags.and_then(|flags| flags.svg),
            })
        })
        .collect::<Vec<_>>();

    countries.sort_by(|left, right| {
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(|| left.name.cmp(&right.name))
    });
    countries
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"[
        {"name": {"common": "United Kingdom"}, "idd": {"root": "+4", "suffixes": ["4"]}, "flags": {"svg": "gb.svg"}},
        {"name": {"common": "Antarctica"}, "idd": {}, "flags": {"svg": "aq.svg"}},
        {"name": {"common": "india"}, "idd": {"root": "+9", "suffixes": ["1"]}},
        {"name": {"common": "Kosovo"}, "idd": {"root": "+3"}}
    ]"#;

    #[test]
    fn normalizes_codes_and_sorts_by_name() {
        let raw: Vec<RawCountry> = serde_json::from_str(PAYLOAD).unwrap();
        let countries = normalize_countries(raw);

        assert_eq!(
            countries,
            vec![
                Country {
                    name: "india".to_string(),
                    code: "+91".to_string(),
                    flag: None,
                },
                Country {
                    name: "Kosovo".to_string(),
                    code: "+3".to_string(),
                    flag: None,
                },
                Country {
                    name: "United Kingdom".to_string(),
                    code: "+44".to_string(),
                    flag: Some("gb.svg".to_string()),
                },
            ]
        );
    }

    #[test]
    fn file_source_reads_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("countries.json");

        let missing = JsonFileCountrySource::new(&path).fetch().unwrap_err();
        assert!(matches!(missing, CountryError::ReadCountries { .. }));

        std::fs::write(&path, "{").unwrap();
        let malformed = JsonFileCountrySource::new(&path).fetch().unwrap_err();
        assert!(matches!(malformed, CountryError::ParseCountries { .. }));

        std::fs::write(&path, PAYLOAD).unwrap();
        assert_eq!(JsonFileCountrySource::new(&path).fetch().unwrap().len(), 3);
    }
}
