//! Institution-name extraction from document file names.
//!
//! Collected documents are saved as `<Institution_Name>_<title or period>.<ext>`,
//! e.g. `Anglia_Ruskin_University_annual-report-2022-23.pdf`. The institution
//! part is recovered greedily: tokens are taken from the left until something
//! that looks like a period or a document title shows up.

use std::path::Path;

use crate::ParseError;
use crate::config::NameParseConfig;

/// What a file name says before any registry lookup or period parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Space-joined name tokens, e.g. "Anglia Ruskin University".
    pub name_fragment: String,
    /// Everything after the name tokens; the whole stem when nothing is left.
    pub period_token: String,
    pub stem: String,
}

/// File name without its final extension.
pub fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name)
}

/// Split a file name into a name fragment and a period token.
///
/// Tokens are accumulated until the first one that
/// (a) starts with a digit,
/// (b) contains a document keyword (or starts with a prefix keyword such as `fs`),
/// (c) is longer than `max_token_len` or has more than `max_hyphens` hyphens.
/// At most `max_tokens` tokens are taken.
pub fn parse_file_name(file_name: &str, config: &NameParseConfig) -> Result<Candidate, ParseError> {
    let stem = file_stem(file_name);
    let tokens: Vec<&str> = stem
        .split(config.delimiter)
        .filter(|t| !t.is_empty())
        .collect();

    let mut taken = 0;
    for token in &tokens {
        if stops_name(token, config) {
            break;
        }
        taken += 1;
        if taken >= config.max_tokens {
            break;
        }
    }

    if taken == 0 {
        return Err(ParseError::Unresolvable {
            stem: stem.to_string(),
        });
    }

    let rest = tokens[taken..].join(&config.delimiter.to_string());
    Ok(Candidate {
        name_fragment: tokens[..taken].join(" "),
        period_token: if rest.is_empty() { stem.to_string() } else { rest },
        stem: stem.to_string(),
    })
}

fn stops_name(token: &str, config: &NameParseConfig) -> bool {
    if token.starts_with(|c: char| c.is_ascii_digit()) {
        return true;
    }

    let lower = token.to_lowercase();
    if config.keywords.iter().any(|k| lower.contains(k.as_str())) {
        return true;
    }
    if config.prefix_keywords.iter().any(|k| {
        lower
            .strip_prefix(k.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(|c: char| c.is_ascii_digit() || c == '-'))
    }) {
        return true;
    }

    token.chars().count() > config.max_token_len
        || token.matches('-').count() > config.max_hyphens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str) -> Result<Candidate, ParseError> {
        parse_file_name(name, &NameParseConfig::default())
    }

    fn fragment(name: &str) -> String {
        parse(name).unwrap().name_fragment
    }

    #[test]
    fn stops_at_keyword_token() {
        let c = parse("Anglia_Ruskin_University_annual-report-2022-23.pdf").unwrap();
        assert_eq!(c.name_fragment, "Anglia Ruskin University");
        assert_eq!(c.period_token, "annual-report-2022-23");
        assert_eq!(c.stem, "Anglia_Ruskin_University_annual-report-2022-23");
    }

    #[test]
    fn stops_at_year() {
        let c = parse("University_of_Edinburgh_2021_accounts.pdf").unwrap();
        assert_eq!(c.name_fragment, "University of Edinburgh");
        assert_eq!(c.period_token, "2021_accounts");
    }

    #[test]
    fn keyword_match_is_case_insensitive_and_contained() {
        assert_eq!(fragment("Aston_University_FinancialStatements2019.pdf"), "Aston University");
        assert_eq!(fragment("Keele_University_ANNUAL_2020.pdf"), "Keele University");
    }

    #[test]
    fn fs_prefix_stops() {
        assert_eq!(fragment("University_of_Bath_fs2023.pdf"), "University of Bath");
        assert_eq!(fragment("University_of_Bath_FS-2023.pdf"), "University of Bath");
    }

    #[test]
    fn fs_inside_a_word_does_not_stop() {
        // "fsx" is not the fs label; name continues.
        assert_eq!(fragment("Fsx_College_2020.pdf"), "Fsx College");
    }

    #[test]
    fn long_or_hyphen_heavy_token_stops() {
        assert_eq!(fragment("Brunel_University_London_a-b-c-d_2020.pdf"), "Brunel University London");
        assert_eq!(
            fragment("Cranfield_Thisisaverylongtitlefragmentwithnokeyword_2020.pdf"),
            "Cranfield"
        );
    }

    #[test]
    fn hyphenated_name_with_two_hyphens_kept() {
        assert_eq!(fragment("Stratford-upon-Avon_College_2019.pdf"), "Stratford-upon-Avon College");
    }

    #[test]
    fn at_most_four_tokens() {
        let c = parse("The_University_of_the_West_of_England_2019.pdf").unwrap();
        assert_eq!(c.name_fragment, "The University of the");
        assert_eq!(c.period_token, "West_of_England_2019");
    }

    #[test]
    fn no_name_is_unresolvable() {
        assert_eq!(
            parse("2019-20_annual_report.pdf").unwrap_err(),
            ParseError::Unresolvable {
                stem: "2019-20_annual_report".into()
            }
        );
        assert!(parse("annual_report_2020.pdf").is_err());
    }

    #[test]
    fn name_only_falls_back_to_whole_stem() {
        let c = parse("Bath_Spa.pdf").unwrap();
        assert_eq!(c.name_fragment, "Bath Spa");
        assert_eq!(c.period_token, "Bath_Spa");
    }

    #[test]
    fn repeated_delimiters_ignored() {
        assert_eq!(fragment("University__of_Kent__2020.pdf"), "University of Kent");
    }

    #[test]
    fn custom_delimiter() {
        let cfg = NameParseConfig {
            delimiter: ' ',
            ..NameParseConfig::default()
        };
        let c = parse_file_name("Lancaster University 2019-20 accounts.pdf", &cfg).unwrap();
        assert_eq!(c.name_fragment, "Lancaster University");
        assert_eq!(c.period_token, "2019-20 accounts");
    }
}
