use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid regex"));

const INDEX_PREFIX: &str = "slope_polygons";
const TABLE_PREFIX: &str = "geojson_slope_data";
const MAX_INDEX_NAME: usize = 200;
const MAX_TABLE_NAME: usize = 60;

/// Lower-case `name` with every non-alphanumeric character turned into `_`,
/// trimmed of `_`. Empty results become `fallback`.
pub fn sanitize_name(name: Option<&str>, fallback: &str) -> String {
    let cleaned = name
        .map(|s| NON_ALNUM.replace_all(&s.to_lowercase(), "_").trim_matches('_').to_string())
        .unwrap_or_default();
    if cleaned.is_empty() { fallback.to_string() } else { cleaned }
}

/// District/sector/year labels that name the published index and table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub district: Option<String>,
    pub sector: Option<String>,
    pub year: Option<i32>,
}

impl Labels {
    pub fn new(district: Option<String>, sector: Option<String>, year: Option<i32>) -> Self {
        Self { district, sector, year }
    }

    fn suffix(&self) -> String {
        let district = sanitize_name(self.district.as_deref(), "district");
        let sector = sanitize_name(self.sector.as_deref(), "sector");
        let year = self.year.map_or_else(|| "all".to_string(), |y| y.to_string());
        format!("{district}_{sector}_{year}")
    }

    /// `slope_polygons_<district>_<sector>_<year>`, at most 200 characters.
    pub fn index_name(&self) -> String {
        let mut name = format!("{INDEX_PREFIX}_{}", self.suffix()).to_lowercase();
        name.truncate(MAX_INDEX_NAME);
        name
    }

    /// `geojson_slope_data_<district>_<sector>_<year>`, `t_`-prefixed if it
    /// would start with a digit, at most 60 characters.
    pub fn table_name(&self) -> String {
        let mut name = format!("{TABLE_PREFIX}_{}", self.suffix());
        if name.starts_with(|c: char| c.is_ascii_digit()) {
            name.insert_str(0, "t_");
        }
        name.truncate(MAX_TABLE_NAME);
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizing() {
        assert_eq!(sanitize_name(Some("Gasabo District"), "district"), "gasabo_district");
        assert_eq!(sanitize_name(Some("--Kimironko/Remera--"), "sector"), "kimironko_remera");
        assert_eq!(sanitize_name(Some("Nyarugenge-Ville"), "x"), "nyarugenge_ville");
        assert_eq!(sanitize_name(Some("***"), "sector"), "sector");
        assert_eq!(sanitize_name(None, "district"), "district");
    }

    #[test]
    fn index_and_table_names() {
        let labels = Labels::new(Some("Gasabo".into()), Some("Remera".into()), Some(2024));
        assert_eq!(labels.index_name(), "slope_polygons_gasabo_remera_2024");
        assert_eq!(labels.table_name(), "geojson_slope_data_gasabo_remera_2024");
        assert_eq!(Labels::default().index_name(), "slope_polygons_district_sector_all");
    }

    #[test]
    fn names_are_bounded() {
        let long = "a".repeat(300);
        let labels = Labels::new(Some(long.clone()), Some(long), Some(2024));
        assert_eq!(labels.index_name().len(), 200);
        assert_eq!(labels.table_name().len(), 60);
        assert!(labels.table_name().starts_with("geojson_slope_data_aaa"));
    }
}
