//! Locale names used for localized settings lookups.

use std::env;

/// Environment variables consulted for the message language, in priority order.
const LANGUAGE_VARS: [&str; 4] = ["LANGUAGE", "LC_ALL", "LC_MESSAGES", "LANG"];

/// The process's preferred languages, most specific first, ending in `C`.
pub fn language_names() -> Vec<String> {
    language_names_from(|var| env::var(var).ok())
}

/// Like [`language_names`], reading variables through `lookup`.
pub fn language_names_from(lookup: impl Fn(&str) -> Option<String>) -> Vec<String> {
    let value = LANGUAGE_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .find(|v| !v.is_empty())
        .unwrap_or_else(|| "C".to_string());

    let mut names: Vec<String> = Vec::new();
    for locale in value.split(':').filter(|l| !l.is_empty()) {
        for variant in locale_variants(locale) {
            if !names.contains(&variant) {
                names.push(variant);
            }
        }
    }
    if !names.iter().any(|n| n == "C") {
        names.push("C".to_string());
    }
    names
}

/// Every less specific form of `locale`, most specific first.
///
/// `language[_territory][.codeset][@modifier]` expands to all combinations that
/// keep the language, e.g. `de_DE@euro` gives `de_DE@euro`, `de@euro`,
/// `de_DE`, `de`.
pub fn locale_variants(locale: &str) -> Vec<String> {
    let (rest, modifier) = split_off(locale, '@');
    let (rest, codeset) = split_off(rest, '.');
    let (language, territory) = split_off(rest, '_');

    const CODESET: u8 = 1;
    const TERRITORY: u8 = 1 << 1;
    const MODIFIER: u8 = 1 << 2;

    let mut mask = 0;
    if codeset.is_some() {
        mask |= CODESET;
    }
    if territory.is_some() {
        mask |= TERRITORY;
    }
    if modifier.is_some() {
        mask |= MODIFIER;
    }

    (0..=mask)
        .rev()
        .filter(|i| i & !mask == 0)
        .map(|i| {
            let mut name = language.to_string();
            if let (true, Some(t)) = (i & TERRITORY != 0, territory) {
                name.push('_');
                name.push_str(t);
            }
            if let (true, Some(c)) = (i & CODESET != 0, codeset) {
                name.push('.');
                name.push_str(c);
            }
            if let (true, Some(m)) = (i & MODIFIER != 0, modifier) {
                name.push('@');
                name.push_str(m);
            }
            name
        })
        .collect()
}

fn split_off(s: &str, sep: char) -> (&str, Option<&str>) {
    match s.split_once(sep) {
        Some((head, tail)) => (head, Some(tail)),
        None => (s, None),
    }
}
