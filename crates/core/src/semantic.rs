use url::{Host, Url};

use crate::finding::{Finding, Rule};
use crate::model::{BookmarkRecord, RawRecord};

// Only called for records that already passed the schema stage.
pub fn check_record(record: &RawRecord) -> Option<Finding> {
    let typed = record.to_typed()?;
    check_domain(&typed).map(|(rule, message)| {
        let path = match rule {
            Rule::MissingHost => "/url",
            _ => "/domain",
        };
        Finding::record(rule, record.reference(), Some(path.to_string()), message)
    })
}

pub fn check_domain(record: &BookmarkRecord) -> Option<(Rule, String)> {
    let host = match Url::parse(&record.url) {
        Ok(parsed) => parsed.host_str().map(str::to_string),
        Err(err) => {
            return Some((
                Rule::MissingHost,
                format!("url {:?} cannot be parsed for a host: {err}", record.url),
            ))
        }
    };
    let Some(host) = host else {
        return Some((
            Rule::MissingHost,
            format!("url {:?} has no host component", record.url),
        ));
    };
    let host = host.to_lowercase();
    if ascii_domain(&record.domain) == host {
        return None;
    }
    Some((
        Rule::DomainMismatch,
        format!(
            "domain {:?} does not match url host {:?}",
            record.domain, host
        ),
    ))
}

// Folds the declared domain the way `Url` folds hosts: IDNA to ASCII, lowercase.
fn ascii_domain(domain: &str) -> String {
    match Host::parse(domain.trim()) {
        Ok(Host::Domain(ascii)) => ascii,
        Ok(Host::Ipv4(addr)) => addr.to_string(),
        Ok(Host::Ipv6(addr)) => format!("[{addr}]"),
        Err(_) => domain.trim().to_lowercase(),
    }
}
