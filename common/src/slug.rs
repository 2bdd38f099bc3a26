// Slug generation for law abbreviations

use regex::Regex;

lazy_static::lazy_static! {
    static ref NON_SLUG_CHARS: Regex = Regex::new("[^a-z0-9]").expect("Invalid regex pattern");
    static ref REPEATED_UNDERSCORES: Regex = Regex::new("_+").expect("Invalid regex pattern");
}

const TRANSCRIPTIONS: [(&str, &str); 4] = [("ß", "ss"), ("ä", "ae"), ("ö", "oe"), ("ü", "ue")];

/// Turn a law abbreviation such as `"AÜG"` or `"BGB"` into a URL-safe slug
pub fn slugify(input: &str) -> String {
    let mut slug = input.to_lowercase();
    for (original, replacement) in TRANSCRIPTIONS {
        slug = slug.replace(original, replacement);
    }
    let slug = NON_SLUG_CHARS.replace_all(&slug, "_");
    REPEATED_UNDERSCORES.replace_all(&slug, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_abbreviation() {
        assert_eq!(slugify("BGB"), "bgb");
    }

    #[test]
    fn test_umlauts_are_transcribed() {
        assert_eq!(slugify("AÜG"), "aueg");
        assert_eq!(slugify("StraßenVG"), "strassenvg");
        assert_eq!(slugify("BÄO"), "baeo");
        assert_eq!(slugify("ÖPNV"), "oepnv");
    }

    #[test]
    fn test_separators_become_single_underscore() {
        assert_eq!(slugify("AEG 1994"), "aeg_1994");
        assert_eq!(slugify("SGB 5 - Krankenversicherung"), "sgb_5_krankenversicherung");
        assert_eq!(slugify("BauNVO 1990"), "baunvo_1990");
    }

    #[test]
    fn test_edges_are_kept() {
        assert_eq!(slugify("(EG) 2021/1"), "_eg_2021_1");
    }
}
