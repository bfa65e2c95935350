//! Conditional request evaluation.
//!
//! Pure decision functions over precondition header values and the
//! current etag. Nothing here touches the store.
//!
//! Header values are compared after stripping one pair of surrounding
//! double quotes and an optional weak `W/` prefix. A value may list several
//! etags separated by commas; `*` matches any existing record.

use crate::types::Etag;

/// Outcome of evaluating preconditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Proceed with the operation.
    Allow,
    /// The caller's cached copy is current (read only, 304).
    NotModified,
    /// The caller's expected state is stale (write only, 412).
    PreconditionFailed,
}

/// Precondition headers supplied with a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preconditions {
    /// Raw `If-Match` value.
    pub if_match: Option<String>,
    /// Raw `If-None-Match` value.
    pub if_none_match: Option<String>,
}

impl Preconditions {
    /// No preconditions: every evaluation allows.
    pub fn none() -> Self {
        Self::default()
    }

    /// Sets `If-Match`.
    pub fn with_if_match(mut self, value: impl Into<String>) -> Self {
        self.if_match = Some(value.into());
        self
    }

    /// Sets `If-None-Match`.
    pub fn with_if_none_match(mut self, value: impl Into<String>) -> Self {
        self.if_none_match = Some(value.into());
        self
    }

    /// Evaluates `If-None-Match` for a read.
    pub fn evaluate_read(&self, current: Option<&Etag>) -> Decision {
        match (&self.if_none_match, current) {
            (Some(header), Some(etag)) if header_matches(header, etag) => Decision::NotModified,
            _ => Decision::Allow,
        }
    }

    /// Evaluates `If-Match` for a replace or patch.
    ///
    /// An absent header is unconditional. A present header against a
    /// missing record fails.
    pub fn evaluate_write(&self, current: Option<&Etag>) -> Decision {
        match (&self.if_match, current) {
            (None, _) => Decision::Allow,
            (Some(header), Some(etag)) if header_matches(header, etag) => Decision::Allow,
            (Some(_), _) => Decision::PreconditionFailed,
        }
    }
}

/// Removes one leading and one trailing double quote, if present.
pub fn strip_quotes(value: &str) -> &str {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value)
}

fn header_matches(header: &str, etag: &Etag) -> bool {
    header.split(',').map(str::trim).any(|candidate| {
        if candidate == "*" {
            return true;
        }
        let candidate = candidate.strip_prefix("W/").unwrap_or(candidate);
        strip_quotes(candidate) == etag.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn etag() -> Etag {
        Etag::from_hex("abc123")
    }

    #[test]
    fn strip_quotes_variants() {
        assert_eq!(strip_quotes("\"abc\""), "abc");
        assert_eq!(strip_quotes("abc"), "abc");
        assert_eq!(strip_quotes("\"abc"), "abc");
        assert_eq!(strip_quotes("abc\""), "abc");
        assert_eq!(strip_quotes("\"\"abc\"\""), "\"abc\"");
    }

    #[test]
    fn read_without_header_allows() {
        assert_eq!(
            Preconditions::none().evaluate_read(Some(&etag())),
            Decision::Allow
        );
    }

    #[test]
    fn read_matching_etag_is_not_modified() {
        for header in ["abc123", "\"abc123\"", "W/\"abc123\"", "\"x\", \"abc123\"", "*"] {
            let pre = Preconditions::none().with_if_none_match(header);
            assert_eq!(pre.evaluate_read(Some(&etag())), Decision::NotModified, "{header}");
        }
    }

    #[test]
    fn read_stale_etag_allows() {
        let pre = Preconditions::none().with_if_none_match("\"stale\"");
        assert_eq!(pre.evaluate_read(Some(&etag())), Decision::Allow);
    }

    #[test]
    fn read_ignores_if_match() {
        let pre = Preconditions::none().with_if_match("\"stale\"");
        assert_eq!(pre.evaluate_read(Some(&etag())), Decision::Allow);
    }

    #[test]
    fn read_absent_record_allows() {
        let pre = Preconditions::none().with_if_none_match("*");
        assert_eq!(pre.evaluate_read(None), Decision::Allow);
    }

    #[test]
    fn write_without_header_is_unconditional() {
        assert_eq!(
            Preconditions::none().evaluate_write(Some(&etag())),
            Decision::Allow
        );
    }

    #[test]
    fn write_matching_etag_allows() {
        for header in ["abc123", "\"abc123\"", "*"] {
            let pre = Preconditions::none().with_if_match(header);
            assert_eq!(pre.evaluate_write(Some(&etag())), Decision::Allow, "{header}");
        }
    }

    #[test]
    fn write_stale_etag_fails() {
        let pre = Preconditions::none().with_if_match("\"stale\"");
        assert_eq!(
            pre.evaluate_write(Some(&etag())),
            Decision::PreconditionFailed
        );
    }

    #[test]
    fn write_against_missing_record_fails() {
        let pre = Preconditions::none().with_if_match("*");
        assert_eq!(pre.evaluate_write(None), Decision::PreconditionFailed);
    }

    #[test]
    fn write_ignores_if_none_match() {
        let pre = Preconditions::none().with_if_none_match("abc123");
        assert_eq!(pre.evaluate_write(Some(&etag())), Decision::Allow);
    }
}
