use indexmap::IndexMap;

use crate::finding::Finding;
use crate::model::{RawRecord, RecordRef};

// Scheme and authority are case-folded; path, query and fragment are kept
// byte for byte. No trailing-slash or percent-encoding normalization.
pub fn normalize_url(raw: &str) -> String {
    let Some((scheme, rest)) = raw.split_once("://") else {
        return raw.to_string();
    };
    let authority_end = rest
        .find(|c: char| matches!(c, '/' | '?' | '#'))
        .unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);
    format!(
        "{}://{}{}",
        scheme.to_ascii_lowercase(),
        authority.to_ascii_lowercase(),
        tail
    )
}

pub fn find_duplicates<'a, I>(records: I) -> Vec<Finding>
where
    I: IntoIterator<Item = &'a RawRecord>,
{
    let mut seen: IndexMap<String, (String, Vec<RecordRef>)> = IndexMap::new();
    for record in records {
        let Some(url) = record.str_field("url") else {
            continue;
        };
        seen.entry(normalize_url(url))
            .or_insert_with(|| (url.to_string(), Vec::new()))
            .1
            .push(record.reference());
    }
    seen.into_values()
        .filter(|(_, occurrences)| occurrences.len() > 1)
        .map(|(url, occurrences)| Finding::duplicate(&url, occurrences))
        .collect()
}
