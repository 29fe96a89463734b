//! Vehicle-routing instance files
//!
//! Loads benchmark instances from the fixed-column text formats used by the
//! Solomon (CVRPTW) and Li & Lim (PDPTW) suites and renders them as the JSON
//! payload the optimization API consumes. The rest of the crate treats that
//! payload as opaque.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Errors raised while loading an instance file.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// The file could not be read.
    #[error("failed to read instance file: {0}")]
    Io(#[from] std::io::Error),

    /// A line did not match the expected column layout.
    #[error("malformed instance file at line {line}: {message}")]
    Malformed {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        message: String,
    },
}

/// Which fixed-column layout to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    /// Solomon format: fleet line at line 5, customer rows from line 10,
    /// seven columns per row.
    Cvrptw,
    /// Li & Lim pickup-and-delivery format: fleet line first, nine columns
    /// per row with pickup and delivery indices.
    Pdptw,
}

/// One vertex of a routing instance.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Node {
    /// Vertex identifier; 0 is the depot.
    pub vertex: u32,
    /// X coordinate.
    pub xcord: f64,
    /// Y coordinate.
    pub ycord: f64,
    /// Demand at this vertex.
    pub demand: i64,
    /// Time-window start.
    pub earliest_time: i64,
    /// Time-window end.
    pub latest_time: i64,
    /// Service duration at this vertex.
    pub service_time: i64,
    /// Index of the paired pickup vertex (PDPTW only, 0 for pickups).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pickup_index: Option<u32>,
    /// Index of the paired delivery vertex (PDPTW only, 0 for deliveries).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_index: Option<u32>,
}

/// A parsed routing instance.
#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    /// Fleet size.
    pub vehicle_num: u32,
    /// Per-vehicle capacity.
    pub vehicle_capacity: u32,
    /// All vertices, depot included.
    pub nodes: Vec<Node>,
}

impl Instance {
    /// Load an instance from a file in the given format.
    pub fn from_path(path: impl AsRef<Path>, kind: ProblemKind) -> Result<Self, DatasetError> {
        let content = fs::read_to_string(path)?;
        Self::from_str(&content, kind)
    }

    /// Parse an instance from text.
    pub fn from_str(content: &str, kind: ProblemKind) -> Result<Self, DatasetError> {
        let mut fleet: Option<(u32, u32)> = None;
        let mut nodes = Vec::new();

        for (index, line) in content.lines().enumerate() {
            let lineno = index + 1;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }

            let is_fleet_line = match kind {
                ProblemKind::Pdptw => lineno == 1,
                ProblemKind::Cvrptw => lineno == 5,
            };

            if is_fleet_line {
                fleet = Some(parse_fleet(&fields, lineno)?);
                continue;
            }

            let is_node_line = match kind {
                ProblemKind::Pdptw => lineno > 1,
                ProblemKind::Cvrptw => lineno >= 10,
            };
            if is_node_line {
                nodes.push(parse_node(&fields, lineno, kind)?);
            }
        }

        let (vehicle_num, vehicle_capacity) = fleet.ok_or(DatasetError::Malformed {
            line: 0,
            message: "missing fleet line (vehicle count and capacity)".to_string(),
        })?;

        Ok(Self {
            vehicle_num,
            vehicle_capacity,
            nodes,
        })
    }

    /// Render the instance as the JSON payload submitted to the API.
    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).expect("instance serialization is infallible")
    }
}

fn parse_fleet(fields: &[&str], line: usize) -> Result<(u32, u32), DatasetError> {
    if fields.len() < 2 {
        return Err(DatasetError::Malformed {
            line,
            message: format!("expected vehicle count and capacity, found {} fields", fields.len()),
        });
    }
    let vehicle_num = parse_field(fields[0], line, "vehicle count")?;
    let vehicle_capacity = parse_field(fields[1], line, "vehicle capacity")?;
    Ok((vehicle_num, vehicle_capacity))
}

fn parse_node(fields: &[&str], line: usize, kind: ProblemKind) -> Result<Node, DatasetError> {
    let expected = match kind {
        ProblemKind::Cvrptw => 7,
        ProblemKind::Pdptw => 9,
    };
    if fields.len() < expected {
        return Err(DatasetError::Malformed {
            line,
            message: format!("expected {expected} columns, found {}", fields.len()),
        });
    }

    let mut node = Node {
        vertex: parse_field(fields[0], line, "vertex")?,
        xcord: parse_field(fields[1], line, "x coordinate")?,
        ycord: parse_field(fields[2], line, "y coordinate")?,
        demand: parse_field(fields[3], line, "demand")?,
        earliest_time: parse_field(fields[4], line, "time-window start")?,
        latest_time: parse_field(fields[5], line, "time-window end")?,
        service_time: parse_field(fields[6], line, "service time")?,
        pickup_index: None,
        delivery_index: None,
    };

    if kind == ProblemKind::Pdptw {
        node.pickup_index = Some(parse_field(fields[7], line, "pickup index")?);
        node.delivery_index = Some(parse_field(fields[8], line, "delivery index")?);
    }

    Ok(node)
}

fn parse_field<T: std::str::FromStr>(
    field: &str,
    line: usize,
    name: &str,
) -> Result<T, DatasetError> {
    field.parse().map_err(|_| DatasetError::Malformed {
        line,
        message: format!("invalid {name}: {field:?}"),
    })
}
