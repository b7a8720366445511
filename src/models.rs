// ABOUTME: Common data models for traffic map visualization payloads
// ABOUTME: Stations, route geometry, map framing, and per-turn chat results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Data Models
//!
//! Typed shapes for everything the chat loop assembles for the map client.
//! Station data is parsed from tool results verbatim — nothing here is
//! locally computed beyond route framing (midpoint and zoom).

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// A named point on the map (queried location, route endpoint)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Display name of the location
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

/// Live traffic metrics reported for a monitoring station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficMetrics {
    /// Speed performance index value
    pub spi: f64,
    /// Numeric congestion level
    #[serde(default)]
    pub congestion_level: i64,
    /// Human-readable congestion label
    #[serde(default)]
    pub congestion_label: String,
    /// Textual traffic state
    #[serde(default)]
    pub traffic_state: String,
    /// Confidence label for the measurement
    #[serde(default)]
    pub confidence_level: String,
}

/// A traffic monitoring station as reported by the tool service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Station id, unique within the tool service vocabulary
    pub id: i64,
    /// Station display name
    #[serde(default)]
    pub name: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Freeway number the station monitors
    #[serde(default)]
    pub freeway: i64,
    /// Traffic direction (N/S/E/W)
    #[serde(default)]
    pub direction: String,
    /// Number of monitored lanes
    #[serde(default)]
    pub lanes: i64,
    /// Station type
    #[serde(default, rename = "type")]
    pub station_type: String,
    /// Distance from the queried point, in kilometers
    #[serde(default)]
    pub distance_km: f64,
    /// Traffic metrics, when the tool included them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traffic: Option<TrafficMetrics>,
}

/// An interior station along a suggested route
///
/// Union of the two shapes the route builder emits: entries built from the
/// route's own station details carry freeway/direction, entries resolved
/// from earlier traffic lookups carry the SPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntermediateStation {
    /// Station id
    pub id: i64,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Speed performance index, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spi: Option<f64>,
    /// Station name, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Freeway number, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeway: Option<i64>,
    /// Direction, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

/// Route geometry and endpoints for map rendering
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteData {
    /// Origin marker, when the turn identified one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_marker: Option<Marker>,
    /// Destination marker, when the turn identified one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_marker: Option<Marker>,
    /// Ordered polyline of `[latitude, longitude]` pairs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_polyline: Option<Vec<[f64; 2]>>,
    /// Interior monitoring stations, excluding origin and destination
    #[serde(default)]
    pub intermediate_stations: Vec<IntermediateStation>,
}

/// Everything the map client needs to render one conversation turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficMapData {
    /// The location the user asked about
    pub query_location: Marker,
    /// Nearby monitoring stations, when a traffic lookup ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stations: Option<Vec<Station>>,
    /// Map center point
    pub map_center: Coordinates,
    /// Map zoom level
    pub map_zoom: f64,
    /// Route overlay, when a route suggestion ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_data: Option<RouteData>,
}

/// A human-facing progress record for one tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProgress {
    /// Name of the invoked tool
    pub tool_name: String,
    /// Progress message shown to the user
    pub message: String,
    /// Unix epoch milliseconds when the invocation started
    pub timestamp: i64,
}

/// Outcome of one full chat turn
#[derive(Debug, Clone)]
pub struct ChatResult {
    /// Final assistant text
    pub response: String,
    /// Map payload accumulated during the turn, if any tool produced one
    pub map_data: Option<TrafficMapData>,
    /// Progress records in tool invocation order
    pub tool_progress: Vec<ToolProgress>,
}
