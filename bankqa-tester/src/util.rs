use anyhow::{Context, Result, bail};
use bankqa_core::TestStatus;
use bankqa_logs::LogSource;

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse `id=status,id=status` pairs.
pub fn parse_marks(s: &str) -> Result<Vec<(String, TestStatus)>> {
    split_csv(s)
        .into_iter()
        .map(|pair| {
            let Some((id, status)) = pair.split_once('=') else {
                bail!("expected id=status, got '{pair}'");
            };
            let id = id.trim();
            if id.is_empty() {
                bail!("missing test id in '{pair}'");
            }
            let status = status
                .parse::<TestStatus>()
                .with_context(|| format!("invalid status for {id}"))?;
            Ok((id.to_string(), status))
        })
        .collect()
}

/// `all` (anywhere in the list) selects every feed; order is otherwise kept.
pub fn parse_sources(s: &str) -> Result<Vec<LogSource>> {
    let tokens = split_csv(s);
    if tokens.iter().any(|t| t.eq_ignore_ascii_case("all")) {
        return Ok(LogSource::VARIANTS.to_vec());
    }
    let mut sources = Vec::new();
    for token in tokens {
        let source = token.parse::<LogSource>()?;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_csv_trims_and_drops_empty() {
        assert_eq!(split_csv(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn parses_marks() {
        let marks = parse_marks("FT-01=pass, xb-input-safari=partial").unwrap();
        assert_eq!(
            marks,
            vec![
                ("FT-01".to_string(), TestStatus::Pass),
                ("xb-input-safari".to_string(), TestStatus::Partial),
            ]
        );
        assert!(parse_marks("FT-01").is_err());
        assert!(parse_marks("=pass").is_err());
        assert!(parse_marks("FT-01=maybe").is_err());
    }

    #[test]
    fn parses_sources() {
        assert_eq!(parse_sources("all").unwrap().len(), 4);
        assert_eq!(
            parse_sources("sessions,audit,session").unwrap(),
            vec![LogSource::Session, LogSource::Audit]
        );
        assert!(parse_sources("ledger").is_err());
    }
}
