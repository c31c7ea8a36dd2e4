//! Fixed lookup tables applied while building the base table.

/// Country spellings rewritten to match the boundary reference dataset.
///
/// Martinique and Guadeloupe already match and are listed so the table reads
/// as the complete set of names the reference was checked against.
pub const COUNTRY_REMAP: [(&str, &str); 6] = [
    ("United States", "United States of America"),
    ("Tanzania", "United Republic of Tanzania"),
    ("Martinique", "Martinique"),
    ("Sao Tome & Principe", "Sao Tome and Principe"),
    ("Guadeloupe", "Guadeloupe"),
    ("Wallis & Futuna", "Wallis and Futuna"),
];

/// "Last Known" activity code to activity level (0 = none/unknown, 7 = most recent).
pub const ACTIVITY_LEVELS: [(&str, i32); 13] = [
    ("Unknown", 0),
    ("D1", 1),
    ("D2", 2),
    ("D3", 3),
    ("D4", 4),
    ("D5", 5),
    ("D6", 6),
    ("D7", 7),
    ("U", 0),
    ("Q", 0),
    ("P", 0),
    ("U1", 0),
    ("U7", 0),
];

/// Highest level produced by [`ACTIVITY_LEVELS`].
pub const MAX_ACTIVITY_LEVEL: i32 = 7;

/// Rewrite a country name; names outside the table pass through.
pub fn remap_country(country: &str) -> &str {
    COUNTRY_REMAP
        .iter()
        .find(|(from, _)| *from == country)
        .map(|(_, to)| *to)
        .unwrap_or(country)
}

/// Look up the activity level for a code. `None` when the code is not in the table.
pub fn activity_level(code: &str) -> Option<i32> {
    ACTIVITY_LEVELS
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, level)| *level)
}
