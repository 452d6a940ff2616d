//! `device,url` rules files.

use std::path::Path;

use c4000_core::DesiredRuleSpec;
use tracing::warn;

use crate::error::CliError;

/// Parse rules file contents. Blank and `#` lines are ignored; lines without
/// a comma or with an empty side are skipped with a warning.
pub fn parse_rules(contents: &str, source: &str) -> Vec<DesiredRuleSpec> {
    let mut rules = Vec::new();
    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(',') {
            Some((device, url)) if !device.trim().is_empty() && !url.trim().is_empty() => {
                rules.push(DesiredRuleSpec::new(device.trim(), url.trim()));
            }
            _ => warn!(
                "skipping malformed line #{} in '{source}': {line}",
                index + 1
            ),
        }
    }
    rules
}

/// Read and parse a rules file. A missing file is fatal.
pub fn read_rules_file(path: &Path) -> Result<Vec<DesiredRuleSpec>, CliError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CliError::NotFound {
                resource_type: "Rules file".into(),
                identifier: path.display().to_string(),
                hint: "Expected one `device,url` rule per line.".into(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    Ok(parse_rules(&contents, &path.display().to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_device_url_pairs() {
        let contents = "\
# kids' tablet
tablet, youtube.com
all,ads.example,extra

AA:BB:CC:DD:EE:FF ,example.com
";
        assert_eq!(
            parse_rules(contents, "rules.txt"),
            vec![
                DesiredRuleSpec::new("tablet", "youtube.com"),
                DesiredRuleSpec::new("all", "ads.example,extra"),
                DesiredRuleSpec::new("AA:BB:CC:DD:EE:FF", "example.com"),
            ]
        );
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let contents = "no-comma-here\n,example.com\ntablet,\nlaptop,example.org\n";
        assert_eq!(
            parse_rules(contents, "rules.txt"),
            vec![DesiredRuleSpec::new("laptop", "example.org")]
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_rules_file(&dir.path().join("absent.txt")).unwrap_err();
        assert!(matches!(err, CliError::NotFound { .. }));
    }
}
