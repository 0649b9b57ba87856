/// Shared enums used by the models, services and handlers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Utility carried by an energy connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    Electricity,
    Gas,
    Water,
    Heat,
}

impl ConnectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionType::Electricity => "electricity",
            ConnectionType::Gas => "gas",
            ConnectionType::Water => "water",
            ConnectionType::Heat => "heat",
        }
    }

    /// Capacity options offered for this connection type
    pub fn capacity_options(self) -> &'static [&'static str] {
        match self {
            ConnectionType::Electricity => &[
                "1x25A", "1x35A", "1x40A", "3x25A", "3x35A", "3x50A", "3x63A", "3x80A",
            ],
            ConnectionType::Gas => &["G4", "G6", "G10", "G16", "G25"],
            ConnectionType::Water => &["Q3 2.5", "Q3 4", "Q3 6.3", "Q3 10"],
            ConnectionType::Heat => &["0-40kW", "40-100kW", "100kW+"],
        }
    }

    pub fn accepts_capacity(self, capacity: &str) -> bool {
        self.capacity_options().contains(&capacity)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "electricity" => Ok(ConnectionType::Electricity),
            "gas" => Ok(ConnectionType::Gas),
            "water" => Ok(ConnectionType::Water),
            "heat" => Ok(ConnectionType::Heat),
            other => Err(format!("unknown connection type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            "overdue" => Ok(InvoiceStatus::Overdue),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(format!("unknown invoice status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Done => "done",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_options_depend_on_type() {
        assert!(ConnectionType::Electricity.accepts_capacity("3x25A"));
        assert!(!ConnectionType::Gas.accepts_capacity("3x25A"));
        assert!(ConnectionType::Gas.accepts_capacity("G6"));
    }

    #[test]
    fn connection_type_parses_case_insensitively() {
        assert_eq!("Gas".parse::<ConnectionType>().unwrap(), ConnectionType::Gas);
        assert!("steam".parse::<ConnectionType>().is_err());
    }
}
