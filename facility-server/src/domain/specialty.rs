//! Specialty codes and the standard specialty catalog.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;

/// Standard specialty code table: (code, display name).
pub const SPECIALTIES: &[(&str, &str)] = &[
    ("010", "内科"),
    ("020", "小児科"),
    ("030", "精神科"),
    ("040", "神経科"),
    ("050", "呼吸器科"),
    ("060", "消化器科"),
    ("070", "循環器科"),
    ("080", "アレルギー科"),
    ("090", "リウマチ科"),
    ("100", "小児外科"),
    ("110", "外科"),
    ("120", "整形外科"),
    ("130", "形成外科"),
    ("140", "美容外科"),
    ("150", "脳神経外科"),
    ("160", "呼吸器外科"),
    ("170", "心臓血管外科"),
    ("180", "小児外科"),
    ("190", "皮膚泌尿器科"),
    ("200", "性病科"),
    ("210", "ひ尿器科"),
    ("220", "産婦人科"),
    ("230", "産科"),
    ("240", "婦人科"),
    ("250", "眼科"),
    ("260", "耳鼻いんこう科"),
    ("270", "気管食道科"),
    ("280", "放射線科"),
    ("290", "麻酔科"),
    ("300", "治療科"),
    ("310", "臨床検査科"),
    ("320", "救急科"),
    ("330", "リハビリテーション科"),
    ("340", "病理診断科"),
    ("350", "臨床検査科"),
    ("360", "矯正歯科"),
    ("370", "小児歯科"),
    ("380", "口腔外科"),
    ("390", "歯科"),
    ("400", "乳腺外科"),
    ("410", "内視鏡内科"),
    ("420", "人工透析科"),
    ("430", "疼痛緩和内科"),
    ("440", "疼痛緩和外科"),
    ("450", "老年内科"),
    ("460", "老年精神科"),
    ("470", "老年外科"),
    ("480", "老年歯科"),
    ("490", "炎症性腸疾患内科"),
    ("500", "炎症性腸疾患外科"),
    ("510", "臨床腫瘍科"),
    ("520", "感染症内科"),
    ("530", "感染症外科"),
    ("540", "糖尿病内科"),
    ("550", "糖尿病外科"),
    ("560", "内分泌内科"),
    ("570", "内分泌外科"),
    ("580", "脳神経内科"),
    ("590", "腫瘍内科"),
    ("600", "腫瘍外科"),
    ("610", "女性内科"),
    ("620", "女性外科"),
    ("630", "移植外科"),
];

/// Codes shown as quick-pick tags in the search form.
pub const COMMON_SPECIALTIES: &[&str] = &["010", "020", "110", "120", "220", "250", "260", "390"];

/// Look up the display name for a specialty code.
pub fn specialty_name(code: &SpecialtyCode) -> Option<&'static str> {
    SPECIALTIES
        .iter()
        .find(|(c, _)| *c == code.as_str())
        .map(|(_, name)| *name)
}

/// A specialty tag attached to a facility.
///
/// Codes are opaque, trimmed tokens. They never contain whitespace or the
/// comma used to separate them in the source data.
///
/// # Examples
///
/// ```
/// use facility_server::domain::SpecialtyCode;
///
/// let internal = SpecialtyCode::parse(" 010 ").unwrap();
/// assert_eq!(internal.as_str(), "010");
///
/// // Known display names resolve to their code
/// assert_eq!(SpecialtyCode::resolve("眼科").unwrap().as_str(), "250");
///
/// assert!(SpecialtyCode::parse("").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpecialtyCode(String);

impl SpecialtyCode {
    /// Parse a single code token. Surrounding whitespace is trimmed.
    pub fn parse(s: &str) -> Result<Self, DomainError> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.contains(',')
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(DomainError::InvalidSpecialtyCode(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parse a token that may be either a code or a catalog display name.
    pub fn resolve(token: &str) -> Result<Self, DomainError> {
        let trimmed = token.trim();
        match SPECIALTIES.iter().find(|(_, name)| *name == trimmed) {
            Some((code, _)) => Ok(Self((*code).to_string())),
            None => Self::parse(trimmed),
        }
    }

    /// Parse a comma-separated cell into a set of codes.
    ///
    /// Empty tokens are skipped. Tokens that are neither a code nor a known
    /// display name are skipped as well; a facility with unreadable tags is
    /// still a facility.
    pub fn parse_list(cell: &str) -> BTreeSet<Self> {
        cell.split([',', '、'])
            .filter(|t| !t.trim().is_empty())
            .filter_map(|t| Self::resolve(t).ok())
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpecialtyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SpecialtyCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SpecialtyCode> for String {
    fn from(code: SpecialtyCode) -> Self {
        code.0
    }
}

/// How multiple selected specialties combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpecialtyFilterMode {
    /// Facility must offer every selected specialty.
    #[serde(alias = "AND")]
    All,
    /// Facility must offer at least one selected specialty.
    #[default]
    #[serde(alias = "OR")]
    Any,
}

impl FromStr for SpecialtyFilterMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" | "AND" => Ok(Self::All),
            "ANY" | "OR" => Ok(Self::Any),
            _ => Err(DomainError::UnknownFilterMode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> SpecialtyCode {
        SpecialtyCode::parse(s).unwrap()
    }

    #[test]
    fn parse_trims_and_rejects_separators() {
        assert_eq!(code(" 110\t").as_str(), "110");
        assert!(SpecialtyCode::parse("   ").is_err());
        assert!(SpecialtyCode::parse("010,020").is_err());
        assert!(SpecialtyCode::parse("0 10").is_err());
    }

    #[test]
    fn parse_list_splits_and_dedups() {
        let set = SpecialtyCode::parse_list("010, 020,,010 ,");
        assert_eq!(set.len(), 2);
        assert!(set.contains(&code("010")));
        assert!(set.contains(&code("020")));
    }

    #[test]
    fn parse_list_accepts_display_names() {
        let set = SpecialtyCode::parse_list("内科、眼科,390");
        let codes: Vec<&str> = set.iter().map(|c| c.as_str()).collect();
        assert_eq!(codes, vec!["010", "250", "390"]);
    }

    #[test]
    fn parse_list_empty_cell() {
        assert!(SpecialtyCode::parse_list("").is_empty());
    }

    #[test]
    fn catalog_lookup() {
        assert_eq!(specialty_name(&code("010")), Some("内科"));
        assert_eq!(specialty_name(&code("999")), None);
        for common in COMMON_SPECIALTIES {
            assert!(specialty_name(&code(common)).is_some(), "{common} missing");
        }
    }

    #[test]
    fn filter_mode_parsing() {
        assert_eq!("all".parse::<SpecialtyFilterMode>().unwrap(), SpecialtyFilterMode::All);
        assert_eq!("AND".parse::<SpecialtyFilterMode>().unwrap(), SpecialtyFilterMode::All);
        assert_eq!("or".parse::<SpecialtyFilterMode>().unwrap(), SpecialtyFilterMode::Any);
        assert!("xor".parse::<SpecialtyFilterMode>().is_err());
    }

    #[test]
    fn filter_mode_serde_aliases() {
        let m: SpecialtyFilterMode = serde_json::from_str("\"AND\"").unwrap();
        assert_eq!(m, SpecialtyFilterMode::All);
        assert_eq!(serde_json::to_string(&SpecialtyFilterMode::Any).unwrap(), "\"ANY\"");
    }

    #[test]
    fn code_serde_validates() {
        let c: SpecialtyCode = serde_json::from_str("\"120\"").unwrap();
        assert_eq!(c.as_str(), "120");
        assert!(serde_json::from_str::<SpecialtyCode>("\"\"").is_err());
    }
}
