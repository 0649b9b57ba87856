//! Status board for connection requests.
//!
//! Everything here works on an already loaded slice: grouping into status
//! columns, tab filtering and free-text search. Statuses are matched
//! exactly, so `"new"` is not the same bucket as `"NEW"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed statuses of the connection-request pipeline, in board order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStatus {
    New,
    InProgress,
    OfferSent,
    OfferAccepted,
    Completed,
}

impl ConnectionStatus {
    pub const ALL: [ConnectionStatus; 5] = [
        ConnectionStatus::New,
        ConnectionStatus::InProgress,
        ConnectionStatus::OfferSent,
        ConnectionStatus::OfferAccepted,
        ConnectionStatus::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionStatus::New => "NEW",
            ConnectionStatus::InProgress => "IN_PROGRESS",
            ConnectionStatus::OfferSent => "OFFER_SENT",
            ConnectionStatus::OfferAccepted => "OFFER_ACCEPTED",
            ConnectionStatus::Completed => "COMPLETED",
        }
    }

    /// Exact, case-sensitive match against the stored status string
    pub fn matches(self, status: &str) -> bool {
        self.as_str() == status
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConnectionStatus::ALL
            .into_iter()
            .find(|status| status.matches(s))
            .ok_or_else(|| format!("unknown connection status '{}'", s))
    }
}

/// A record that can be placed on the board
pub trait PipelineItem {
    fn status(&self) -> &str;

    /// Address, city, organization name and EAN, in that order
    fn search_fields(&self) -> [Option<&str>; 4];
}

/// Active tab of the list view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineTab {
    All,
    Status(ConnectionStatus),
}

impl FromStr for PipelineTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") || s.is_empty() {
            return Ok(PipelineTab::All);
        }
        s.parse().map(PipelineTab::Status)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineView {
    #[default]
    List,
    Kanban,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineColumn<T> {
    pub status: ConnectionStatus,
    pub items: Vec<T>,
}

/// Columns for the allowed statuses plus the flat list of every record
#[derive(Debug, Clone, Serialize)]
pub struct PipelineBoard<T> {
    pub columns: Vec<PipelineColumn<T>>,
    pub all: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: ConnectionStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardCounts {
    pub columns: Vec<StatusCount>,
    pub total: usize,
}

impl<T> PipelineBoard<T> {
    pub fn column(&self, status: ConnectionStatus) -> Option<&[T]> {
        self.columns
            .iter()
            .find(|c| c.status == status)
            .map(|c| c.items.as_slice())
    }

    pub fn counts(&self) -> BoardCounts {
        BoardCounts {
            columns: self
                .columns
                .iter()
                .map(|c| StatusCount { status: c.status, count: c.items.len() })
                .collect(),
            total: self.all.len(),
        }
    }
}

/// Bucket records into one column per allowed status, keeping the caller's
/// column order. Records with any other status only land in `all`.
pub fn group_by_status<T: PipelineItem + Clone>(
    records: &[T],
    allowed: &[ConnectionStatus],
) -> PipelineBoard<T> {
    let mut columns: Vec<PipelineColumn<T>> = Vec::with_capacity(allowed.len());
    for &status in allowed {
        if columns.iter().any(|c| c.status == status) {
            continue;
        }
        columns.push(PipelineColumn { status, items: Vec::new() });
    }

    for record in records {
        if let Some(column) = columns.iter_mut().find(|c| c.status.matches(record.status())) {
            column.items.push(record.clone());
        }
    }

    PipelineBoard { columns, all: records.to_vec() }
}

/// Case-insensitive substring search over the searchable fields.
/// A blank query keeps every record.
pub fn search<T: PipelineItem + Clone>(records: &[T], query: &str) -> Vec<T> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|record| {
            record
                .search_fields()
                .iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect()
}

pub fn filter_tab<T: PipelineItem + Clone>(records: &[T], tab: PipelineTab) -> Vec<T> {
    match tab {
        PipelineTab::All => records.to_vec(),
        PipelineTab::Status(status) => records
            .iter()
            .filter(|record| status.matches(record.status()))
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        status: &'static str,
        address: &'static str,
        city: &'static str,
        organization: Option<&'static str>,
        ean: Option<&'static str>,
    }

    impl PipelineItem for Row {
        fn status(&self) -> &str {
            self.status
        }

        fn search_fields(&self) -> [Option<&str>; 4] {
            [Some(self.address), Some(self.city), self.organization, self.ean]
        }
    }

    fn row(status: &'static str, address: &'static str) -> Row {
        Row { status, address, city: "Utrecht", organization: None, ean: None }
    }

    #[test]
    fn new_record_lands_in_new_bucket_only() {
        let records = vec![row("NEW", "Kerkstraat 1"), row("COMPLETED", "Dorpsstraat 5")];
        let board = group_by_status(&records, &ConnectionStatus::ALL);

        assert_eq!(board.column(ConnectionStatus::New).unwrap(), &records[..1]);
        assert!(board.column(ConnectionStatus::InProgress).unwrap().is_empty());
        assert_eq!(board.column(ConnectionStatus::Completed).unwrap().len(), 1);
        assert_eq!(board.all.len(), 2);
    }

    #[test]
    fn unknown_status_only_appears_in_all() {
        let records = vec![row("ON_HOLD", "Kerkstraat 1"), row("new", "Dorpsstraat 5")];
        let board = group_by_status(&records, &ConnectionStatus::ALL);

        assert!(board.columns.iter().all(|c| c.items.is_empty()));
        assert_eq!(board.all, records);
        assert_eq!(board.counts().total, 2);
    }

    #[test]
    fn disallowed_statuses_are_dropped_from_columns() {
        let records = vec![row("NEW", "a"), row("OFFER_SENT", "b")];
        let board = group_by_status(&records, &[ConnectionStatus::OfferSent, ConnectionStatus::New]);

        assert_eq!(board.columns[0].status, ConnectionStatus::OfferSent);
        assert_eq!(board.columns.len(), 2);
        assert!(board.column(ConnectionStatus::Completed).is_none());
        assert_eq!(
            board.counts().columns,
            vec![
                StatusCount { status: ConnectionStatus::OfferSent, count: 1 },
                StatusCount { status: ConnectionStatus::New, count: 1 },
            ]
        );
    }

    #[test]
    fn search_is_case_insensitive_over_address() {
        let records = vec![row("NEW", "Kerkstraat 1"), row("COMPLETED", "Dorpsstraat 5")];
        let found = filter_tab(&search(&records, "kerk"), PipelineTab::All);
        assert_eq!(found, vec![records[0].clone()]);
    }

    #[test]
    fn search_covers_city_organization_and_ean() {
        let mut a = row("NEW", "Kerkstraat 1");
        a.city = "Amsterdam";
        let mut b = row("NEW", "Dorpsstraat 5");
        b.organization = Some("Woonstichting Oost");
        b.ean = Some("871685900000000011");
        let records = vec![a, b];

        assert_eq!(search(&records, "AMSTER").len(), 1);
        assert_eq!(search(&records, "oost").len(), 1);
        assert_eq!(search(&records, "8716859").len(), 1);
        assert!(search(&records, "rotterdam").is_empty());
        assert_eq!(search(&records, "   ").len(), 2);
    }

    #[test]
    fn tab_filters_by_exact_status() {
        let records = vec![row("NEW", "a"), row("IN_PROGRESS", "b"), row("in_progress", "c")];
        let tab: PipelineTab = "IN_PROGRESS".parse().unwrap();
        assert_eq!(filter_tab(&records, tab), vec![records[1].clone()]);
        assert_eq!("all".parse::<PipelineTab>().unwrap(), PipelineTab::All);
        assert!("DONE".parse::<PipelineTab>().is_err());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in ConnectionStatus::ALL {
            assert_eq!(status.as_str().parse::<ConnectionStatus>().unwrap(), status);
        }
        assert!("Completed".parse::<ConnectionStatus>().is_err());
    }
}
