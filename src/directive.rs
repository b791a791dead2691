use crate::err::StoreError;
use crate::store::SubscriberStore;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Subscribe,
    Unsubscribe,
}

impl Default for Status {
    fn default() -> Self {
        Status::Subscribe
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Subscribe => "subscribe",
            Status::Unsubscribe => "unsubscribe",
        })
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.eq_ignore_ascii_case("subscribe") {
            Ok(Status::Subscribe)
        } else if s.eq_ignore_ascii_case("unsubscribe") {
            Ok(Status::Unsubscribe)
        } else {
            Err(format!("unknown status {:?}", s))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDirective {
    pub name: String,
    pub address: String,
    pub team: String,
    pub status: Status,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberRecord {
    pub name: String,
    pub address: String,
    pub team: String,
    pub status: Status,
    pub role: String,
}

impl SubscriberRecord {
    pub fn has_identity(&self, name: &str, address: &str, team: &str) -> bool {
        self.name == name && self.address == address && self.team == team
    }
}

impl From<&SubscriptionDirective> for SubscriberRecord {
    fn from(d: &SubscriptionDirective) -> Self {
        SubscriberRecord {
            name: d.name.clone(),
            address: d.address.clone(),
            team: d.team.clone(),
            status: d.status,
            role: d.role.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct DirectiveError {
    pub line: usize,
    pub reason: String,
}

const MIN_FIELDS: usize = 3;
const MAX_FIELDS: usize = 5;

/// Parses every non-blank line of `body`, in order. Line numbers count blank lines too.
pub fn parse_directives(
    body: &str,
) -> impl Iterator<Item = Result<SubscriptionDirective, DirectiveError>> + '_ {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| parse_line(idx + 1, line))
}

fn parse_line(line: usize, text: &str) -> Result<SubscriptionDirective, DirectiveError> {
    let fail = |reason: String| DirectiveError { line, reason };
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();

    if fields.len() < MIN_FIELDS || fields.len() > MAX_FIELDS {
        return Err(fail(format!(
            "expected {} to {} comma-separated fields, found {}",
            MIN_FIELDS,
            MAX_FIELDS,
            fields.len()
        )));
    }
    for (field, value) in ["name", "address", "team"].iter().zip(&fields) {
        if value.is_empty() {
            return Err(fail(format!("{} is empty", field)));
        }
    }
    if !fields[1].contains('@') {
        return Err(fail(format!("{:?} is not an address", fields[1])));
    }
    let status = match fields.get(3) {
        Some(s) => s.parse::<Status>().map_err(fail)?,
        None => Status::default(),
    };

    Ok(SubscriptionDirective {
        name: fields[0].to_string(),
        address: fields[1].to_string(),
        team: fields[2].to_string(),
        status,
        role: fields.get(4).map(|r| r.to_string()).unwrap_or_default(),
    })
}

pub fn upsert_directive<S: SubscriberStore + ?Sized>(
    store: &S,
    directive: &SubscriptionDirective,
) -> Result<(), StoreError> {
    store.upsert(&SubscriberRecord::from(directive))
}

pub fn build_report(records: &[SubscriberRecord]) -> String {
    records
        .iter()
        .map(|r| {
            format!(
                "{} <{}> {} {} {}",
                r.name, r.address, r.team, r.status, r.role
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_admin_report(records: &[SubscriberRecord], failures: &[DirectiveError]) -> String {
    let mut report = build_report(records);
    if !failures.is_empty() {
        report.push_str(&format!("\n\nSkipped {} line(s):", failures.len()));
        for failure in failures {
            report.push('\n');
            report.push_str(&failure.to_string());
        }
    }
    report
}
