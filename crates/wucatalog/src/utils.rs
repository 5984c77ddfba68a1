const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = MIB * 1024.0;

/// Renders a byte count as `"X.XX GB"` from 1 GiB upwards, `"X.XX MB"` below.
pub fn convert_bytes_to_human_readable(size_bytes: u64) -> String {
    let size = size_bytes as f64;
    if size >= GIB {
        format!("{:.2} GB", size / GIB)
    } else {
        format!("{:.2} MB", size / MIB)
    }
}

/// Digits directly following the first `kb` in `text` (case-insensitive).
/// `None` when there is no `kb` or no digit right after it.
pub fn kb_number_in(text: &str) -> Option<String> {
    let lowered = text.to_lowercase();
    let start = lowered.find("kb")? + 2;
    let digits: String = lowered[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    (!digits.is_empty()).then_some(digits)
}

/// Strips a `KB` prefix (any case) so the number can be used in support URLs.
pub fn normalize_kb(kb: &str) -> String {
    kb.trim().to_lowercase().replace("kb", "")
}

/// Guesses the architecture from a file name. Any `64` wins, so `ia64`
/// packages also come out as `x64`.
pub fn architecture_from_name(name: &str) -> Option<&'static str> {
    if name.contains("64") {
        Some("x64")
    } else if name.contains("32") || name.contains("86") {
        Some("x86")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_bytes_to_human_readable() {
        assert_eq!(convert_bytes_to_human_readable(1_073_741_824), "1.00 GB");
        assert_eq!(convert_bytes_to_human_readable(1_048_576), "1.00 MB");
        assert_eq!(convert_bytes_to_human_readable(1_073_741_823), "1024.00 MB");
        assert_eq!(convert_bytes_to_human_readable(0), "0.00 MB");
        assert_eq!(convert_bytes_to_human_readable(5_905_580_032), "5.50 GB");
    }

    #[test]
    fn test_kb_number_in() {
        assert_eq!(
            kb_number_in("2024-01 Update for Windows (KB5034123)").as_deref(),
            Some("5034123")
        );
        assert_eq!(
            kb_number_in("windows10.0-kb4530684-x64.msu").as_deref(),
            Some("4530684")
        );
        assert_eq!(kb_number_in("Security Update (KBx)"), None);
        assert_eq!(kb_number_in("no article here"), None);
    }

    #[test]
    fn test_normalize_kb() {
        assert_eq!(normalize_kb("KB5034123"), "5034123");
        assert_eq!(normalize_kb("kb5034123"), "5034123");
        assert_eq!(normalize_kb("5034123"), "5034123");
    }

    #[test]
    fn test_architecture_from_name() {
        assert_eq!(architecture_from_name("update-x64.exe"), Some("x64"));
        assert_eq!(architecture_from_name("update-x86.exe"), Some("x86"));
        assert_eq!(architecture_from_name("update-win32.exe"), Some("x86"));
        // "64" is checked first, so Itanium packages read as x64.
        assert_eq!(architecture_from_name("update-ia64.exe"), Some("x64"));
        assert_eq!(architecture_from_name("update-arm.exe"), None);
    }
}
