use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// File format of an exported diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Svg,
    Png,
}

impl ExportFormat {
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Svg => "svg",
            Self::Png => "png",
        }
    }
}

/// File name for an exported diagram: whitespace runs in the title become
/// `_`, path separators are replaced too, and an empty title falls back
/// to `diagram`.
pub fn export_file_name(title: &str, format: ExportFormat) -> String {
    let slug = WHITESPACE_RUN
        .replace_all(title, "_")
        .replace(['/', '\\'], "_");
    let stem = if slug.is_empty() { "diagram" } else { &slug };
    format!("{stem}.{}", format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(
            export_file_name("Checkout  flow\tv2", ExportFormat::Svg),
            "Checkout_flow_v2.svg"
        );
    }

    #[test]
    fn test_empty_title_uses_fallback() {
        assert_eq!(export_file_name("", ExportFormat::Png), "diagram.png");
    }

    #[test]
    fn test_separators_do_not_escape_directory() {
        assert_eq!(
            export_file_name("../etc/passwd", ExportFormat::Svg),
            ".._etc_passwd.svg"
        );
    }

    proptest! {
        #[test]
        fn prop_name_is_a_single_path_component(title in ".{0,40}") {
            let name = export_file_name(&title, ExportFormat::Svg);
            prop_assert!(name.ends_with(".svg"));
            prop_assert!(name.len() > ".svg".len());
            prop_assert!(!name.contains(char::is_whitespace));
            prop_assert!(!name.contains('/'));
        }
    }
}
