use std::collections::BTreeMap;

/// Translate `text` through a locale's custom-field map.
///
/// Keys match case-insensitively; unmatched text passes through unchanged.
pub fn translate(text: &str, fields: &BTreeMap<String, String>) -> String {
    if let Some(hit) = fields.get(text) {
        return hit.clone();
    }
    let lower = text.to_lowercase();
    fields
        .iter()
        .find(|(key, _)| key.to_lowercase() == lower)
        .map(|(_, value)| value.clone())
        .unwrap_or_else(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("test sum calculation".to_string(), "測試總和計算".to_string()),
            ("Litre".to_string(), "公升".to_string()),
        ])
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(translate("test sum calculation", &fields()), "測試總和計算");
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(translate("Test Sum Calculation", &fields()), "測試總和計算");
        assert_eq!(translate("litre", &fields()), "公升");
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(translate("untranslated", &fields()), "untranslated");
        assert_eq!(translate("", &BTreeMap::new()), "");
    }
}
