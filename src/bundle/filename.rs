//! Filesystem-safe names for exported files.

/// Separator between display names in a bundle file name
pub const BUNDLE_NAME_DELIMITER: &str = "--";

/// Map a display name to a filesystem-safe token.
///
/// Whitespace and punctuation become `_`; letters, digits, `-` and `_` are
/// kept. Trailing whitespace is dropped first.
pub fn safe_name(display_name: &str) -> String {
    display_name
        .trim_end()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// File name for a printer/print/filament bundle, in machine, filament,
/// print order.
pub fn bundle_file_name(machine: &str, print: &str, filament: &str) -> String {
    format!(
        "{}{delim}{}{delim}{}.ini",
        safe_name(machine),
        safe_name(filament),
        safe_name(print),
        delim = BUNDLE_NAME_DELIMITER
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_name() {
        assert_eq!(
            safe_name("Bambu Lab A1 mini 0.4 nozzle"),
            "Bambu_Lab_A1_mini_0_4_nozzle"
        );
        assert_eq!(safe_name("0.20mm Standard @BBL A1M"), "0_20mm_Standard__BBL_A1M");
        assert_eq!(safe_name("PETG-CF "), "PETG-CF");
        assert_eq!(safe_name("a/b\\c:d"), "a_b_c_d");
    }

    #[test]
    fn test_bundle_file_name_order() {
        let name = bundle_file_name("A1 mini", "0.20mm Standard", "PLA Basic");
        assert_eq!(name, "A1_mini--PLA_Basic--0_20mm_Standard.ini");
    }
}
