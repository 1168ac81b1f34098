//! Maps the user's configured locale to the index the frontend's
//! `user_language` setting expects.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    English,
    French,
    Spanish,
    German,
    Italian,
}

impl Locale {
    pub fn from_str(s: &str) -> Option<Locale> {
        Some(match s {
            "en" => Locale::English,
            "fr" => Locale::French,
            "es" => Locale::Spanish,
            "de" => Locale::German,
            "it" => Locale::Italian,
            _ => return None,
        })
    }
}

/// Indices follow the frontend's `user_language` enumeration; any
/// locale it doesn't special-case falls back to English (0).
pub fn locale_to_index(locale: Locale) -> u32 {
    match locale {
        Locale::English => 0,
        Locale::French => 2,
        Locale::Spanish => 3,
        Locale::German => 4,
        Locale::Italian => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_maps_to_zero() {
        assert_eq!(locale_to_index(Locale::English), 0);
    }

    #[test]
    fn italian_maps_to_five() {
        assert_eq!(locale_to_index(Locale::Italian), 5);
    }

    #[test]
    fn from_str_rejects_unknown_codes() {
        assert_eq!(Locale::from_str("ja"), None);
    }
}
