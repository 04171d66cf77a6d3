//! Sample matching: labels are compared by their leading token (everything before
//! the first space). The decoration suffix is kept verbatim in stored labels.

use std::collections::HashSet;

/// Leading token of a sample label ("s1 (R1)" -> "s1").
#[inline]
pub fn leading_token(label: &str) -> &str {
    match label.find(' ') {
        Some(pos) => &label[..pos],
        None => label,
    }
}

/// Set of requested sample identifiers for one combination request.
#[derive(Debug, Clone, Default)]
pub struct SampleFilter {
    wanted: HashSet<String>,
}

impl SampleFilter {
    /// Requested ids are kept verbatim (trimmed); only stored labels are reduced
    /// to their leading token when matched.
    pub fn new<I, S>(samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let wanted = samples
            .into_iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self { wanted }
    }

    /// Parse a comma separated list ("s1,s2, s3").
    pub fn from_csv(s: &str) -> Self {
        Self::new(s.split(','))
    }

    /// Is this label requested (by its leading token)?
    #[inline]
    pub fn admits(&self, label: &str) -> bool {
        self.wanted.contains(leading_token(label))
    }

    pub fn len(&self) -> usize {
        self.wanted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wanted.is_empty()
    }
}

/// Positions in `incoming` that are requested and not yet present in `existing`
/// (compared by leading token, also within `incoming` itself). Original order kept.
pub fn admitted_positions<S: AsRef<str>>(
    incoming: &[S],
    existing: &[String],
    filter: &SampleFilter,
) -> Vec<usize> {
    let mut seen: HashSet<&str> = existing.iter().map(|s| leading_token(s)).collect();
    let mut out = Vec::new();
    for (idx, label) in incoming.iter().enumerate() {
        let label = label.as_ref();
        if !filter.admits(label) {
            continue;
        }
        if seen.insert(leading_token(label)) {
            out.push(idx);
        }
    }
    out
}
