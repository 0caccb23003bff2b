use anyhow::anyhow;
use derive_more::Display;
use std::collections::HashSet;

/// Identifier of one tracked player in the profile service, e.g. `ABCD#123`.
///
/// Always trimmed and uppercased, never empty.
#[derive(Debug, Display, Clone, PartialEq, Eq, Hash)]
pub struct ConnectCode(String);

impl ConnectCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_string(str: &str) -> anyhow::Result<Self> {
        let normalized = str.trim().to_uppercase();
        if normalized.is_empty() {
            Err(anyhow!("Expected non-empty connect code, got {str:?}"))
        } else {
            Ok(Self(normalized))
        }
    }
}

/// Normalizes raw roster cells into connect codes, dropping empty cells and keeping
/// only the first occurrence of each code.
pub fn unique_connect_codes<S: AsRef<str>>(raw: impl IntoIterator<Item = S>) -> Vec<ConnectCode> {
    let mut seen = HashSet::new();

    raw.into_iter()
        .filter_map(|cell| ConnectCode::from_string(cell.as_ref()).ok())
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let code = ConnectCode::from_string("  abcd#123 ").unwrap();
        assert_eq!(code.as_str(), "ABCD#123");
        assert_eq!(code.to_string(), "ABCD#123");
    }

    #[test]
    fn rejects_blank_codes() {
        assert!(ConnectCode::from_string("").is_err());
        assert!(ConnectCode::from_string("   ").is_err());
    }

    #[test]
    fn unique_codes_keep_first_occurrence_order() {
        let codes = unique_connect_codes(["bbbb#222", "", "AAAA#111", "BBBB#222", " aaaa#111"]);
        let codes = codes.iter().map(ConnectCode::as_str).collect::<Vec<_>>();

        assert_eq!(codes, vec!["BBBB#222", "AAAA#111"]);
    }
}
