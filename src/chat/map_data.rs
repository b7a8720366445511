// ABOUTME: Turn-scoped folding of tool results into one map visualization payload
// ABOUTME: Tracks geocodes, a station index, origin/destination tags, and route geometry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! # Map Data Builder
//!
//! Accumulates the heterogeneous tool results of one conversation turn into
//! a single `TrafficMapData`. Folding is applied in tool invocation order
//! and is fully deterministic: replaying the same ordered results produces
//! an identical payload.
//!
//! The origin/destination tags support the two-stop routing workflow: the
//! first traffic lookup of a turn is tagged as the origin, a later lookup
//! whose preceding geocode resolved a different name becomes the
//! destination. Route suggestions then attach markers from those tags.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::constants::map;
use crate::errors::{AppError, AppResult};
use crate::mcp::tool_names;
use crate::models::{
    Coordinates, IntermediateStation, Marker, RouteData, Station, TrafficMapData,
};

/// Last geocode observed in the current turn
#[derive(Debug, Clone)]
struct GeocodeFix {
    latitude: f64,
    longitude: f64,
    location: String,
}

/// A tagged route endpoint (origin or destination)
#[derive(Debug, Clone)]
struct EndpointFix {
    latitude: f64,
    longitude: f64,
    name: String,
}

// ============================================================================
// Typed tool result shapes
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    status: String,
    #[serde(default)]
    location: String,
    coordinates: Option<Coordinates>,
}

#[derive(Debug, Deserialize)]
struct TrafficAtLocationResult {
    #[serde(default)]
    status: String,
    query_location: Option<Marker>,
    #[serde(default)]
    stations: Vec<Station>,
    map_center: Option<Coordinates>,
    map_zoom: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RoutesResult {
    #[serde(default)]
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Deserialize)]
struct RouteEntry {
    #[serde(default)]
    stations: Vec<i64>,
    station_details: Option<Vec<RouteStationDetail>>,
}

#[derive(Debug, Deserialize)]
struct RouteStationDetail {
    id: i64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    name: Option<String>,
    freeway: Option<i64>,
    direction: Option<String>,
}

fn malformed(tool_name: &str) -> AppError {
    AppError::tool_execution(format!(
        "Hubo un error al ejecutar la herramienta {tool_name}: Resultado no es JSON válido."
    ))
}

fn unexpected_shape(tool_name: &str) -> AppError {
    AppError::tool_execution(format!(
        "Hubo un error al ejecutar la herramienta {tool_name}: Resultado con formato inesperado."
    ))
}

// ============================================================================
// Builder
// ============================================================================

/// Folds the tool results of one turn into a map payload
#[derive(Debug, Default)]
pub struct MapDataBuilder {
    geocode: Option<GeocodeFix>,
    origin: Option<EndpointFix>,
    destination: Option<EndpointFix>,
    station_index: HashMap<i64, Station>,
    map_data: Option<TrafficMapData>,
}

impl MapDataBuilder {
    /// Create an empty builder for a new conversation turn
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The payload accumulated so far
    #[must_use]
    pub const fn map_data(&self) -> Option<&TrafficMapData> {
        self.map_data.as_ref()
    }

    /// Consume the builder, yielding the final payload
    #[must_use]
    pub fn into_map_data(self) -> Option<TrafficMapData> {
        self.map_data
    }

    /// Fold one tool result into the payload
    ///
    /// # Errors
    ///
    /// Returns a `ToolExecution` error when the result is not valid JSON or
    /// a recognized tool's result does not match its expected shape. State
    /// is left untouched on error, and the caller surfaces the message to
    /// the model as the tool's own result text.
    pub fn fold(&mut self, tool_name: &str, result_text: &str) -> AppResult<()> {
        let value: serde_json::Value =
            serde_json::from_str(result_text).map_err(|_| malformed(tool_name))?;

        match tool_name {
            tool_names::GEOCODE_LOCATION => self.fold_geocode(&value)?,
            tool_names::GET_TRAFFIC_AT_LOCATION => self.fold_traffic_at_location(&value)?,
            tool_names::SUGGEST_ROUTES => {
                if self.fold_routes(&value)? {
                    return Ok(());
                }
            }
            _ => {}
        }

        // A turn that only geocoded still renders a point on the map.
        if self.map_data.is_none() {
            if let Some(geocode) = &self.geocode {
                self.map_data = Some(TrafficMapData {
                    query_location: Marker {
                        name: geocode.location.clone(),
                        latitude: geocode.latitude,
                        longitude: geocode.longitude,
                    },
                    stations: None,
                    map_center: Coordinates {
                        latitude: geocode.latitude,
                        longitude: geocode.longitude,
                    },
                    map_zoom: map::GEOCODE_FALLBACK_ZOOM,
                    route_data: None,
                });
                debug!("created simple map from geocode data");
            }
        }

        Ok(())
    }

    fn fold_geocode(&mut self, value: &serde_json::Value) -> AppResult<()> {
        let result: GeocodeResult = serde_json::from_value(value.clone())
            .map_err(|_| unexpected_shape(tool_names::GEOCODE_LOCATION))?;
        if result.status != "success" {
            return Ok(());
        }
        let coordinates = result
            .coordinates
            .ok_or_else(|| unexpected_shape(tool_names::GEOCODE_LOCATION))?;

        debug!(location = %result.location, "extracted geocode data");
        self.geocode = Some(GeocodeFix {
            latitude: coordinates.latitude,
            longitude: coordinates.longitude,
            location: result.location,
        });
        Ok(())
    }

    fn fold_traffic_at_location(&mut self, value: &serde_json::Value) -> AppResult<()> {
        let result: TrafficAtLocationResult = serde_json::from_value(value.clone())
            .map_err(|_| unexpected_shape(tool_names::GET_TRAFFIC_AT_LOCATION))?;
        if result.status != "success" {
            return Ok(());
        }
        let (Some(query_location), Some(map_center), Some(map_zoom)) =
            (result.query_location, result.map_center, result.map_zoom)
        else {
            return Err(unexpected_shape(tool_names::GET_TRAFFIC_AT_LOCATION));
        };

        for station in &result.stations {
            self.station_index.insert(station.id, station.clone());
        }

        // Origin/destination tagging for the two-stop routing workflow.
        let nearest_station = result.stations.first();
        if self.origin.is_none() && self.geocode.is_some() {
            debug!(name = %query_location.name, station = ?nearest_station.map(|s| s.id), "stored origin");
            self.origin = Some(EndpointFix {
                latitude: query_location.latitude,
                longitude: query_location.longitude,
                name: query_location.name.clone(),
            });
        } else if self.destination.is_none() {
            let differs = match (&self.origin, &self.geocode) {
                (Some(origin), Some(geocode)) => geocode.location != origin.name,
                _ => false,
            };
            if differs {
                debug!(name = %query_location.name, station = ?nearest_station.map(|s| s.id), "stored destination");
                self.destination = Some(EndpointFix {
                    latitude: query_location.latitude,
                    longitude: query_location.longitude,
                    name: query_location.name.clone(),
                });
            }
        }

        debug!(stations = result.stations.len(), "extracted traffic map data");
        self.map_data = Some(TrafficMapData {
            query_location,
            stations: Some(result.stations),
            map_center,
            map_zoom,
            route_data: None,
        });
        Ok(())
    }

    /// Fold a route suggestion; returns whether route data was attached
    fn fold_routes(&mut self, value: &serde_json::Value) -> AppResult<bool> {
        let result: RoutesResult = serde_json::from_value(value.clone())
            .map_err(|_| unexpected_shape(tool_names::SUGGEST_ROUTES))?;
        let Some(best_route) = result.routes.first() else {
            return Ok(false);
        };

        let (polyline, intermediate_stations) = best_route.station_details.as_ref().map_or_else(
            || self.resolve_route_from_index(&best_route.stations),
            |details| Self::route_from_details(details),
        );

        let Some(map_data) = self.map_data.as_mut() else {
            // Nothing to attach the route to; the model called suggest_routes
            // without a prior traffic lookup in this turn.
            return Ok(true);
        };

        map_data.route_data = Some(RouteData {
            origin_marker: self.origin.as_ref().map(|o| Marker {
                name: o.name.clone(),
                latitude: o.latitude,
                longitude: o.longitude,
            }),
            destination_marker: self.destination.as_ref().map(|d| Marker {
                name: d.name.clone(),
                latitude: d.latitude,
                longitude: d.longitude,
            }),
            route_polyline: if polyline.is_empty() {
                None
            } else {
                Some(polyline)
            },
            intermediate_stations,
        });

        // Re-frame the map to show the whole route.
        if let (Some(origin), Some(destination)) = (&self.origin, &self.destination) {
            map_data.map_center = Coordinates {
                latitude: (origin.latitude + destination.latitude) / 2.0,
                longitude: (origin.longitude + destination.longitude) / 2.0,
            };
            map_data.map_zoom = map::ROUTE_OVERVIEW_ZOOM;
        }

        debug!(
            polyline_points = map_data
                .route_data
                .as_ref()
                .and_then(|r| r.route_polyline.as_ref())
                .map_or(0, Vec::len),
            "route data added to map"
        );
        Ok(true)
    }

    /// Build route geometry from the route's own station details
    fn route_from_details(
        details: &[RouteStationDetail],
    ) -> (Vec<[f64; 2]>, Vec<IntermediateStation>) {
        let mut polyline = Vec::new();
        let mut intermediate = Vec::new();

        for (index, station) in details.iter().enumerate() {
            let (Some(latitude), Some(longitude)) = (station.latitude, station.longitude) else {
                continue;
            };
            polyline.push([latitude, longitude]);

            let is_first = index == 0;
            let is_last = index == details.len() - 1;
            if !is_first && !is_last {
                intermediate.push(IntermediateStation {
                    id: station.id,
                    latitude,
                    longitude,
                    spi: None,
                    name: station.name.clone(),
                    freeway: station.freeway,
                    direction: station.direction.clone(),
                });
            }
        }

        (polyline, intermediate)
    }

    /// Fallback: resolve a plain station-id list against this turn's index
    fn resolve_route_from_index(
        &self,
        station_ids: &[i64],
    ) -> (Vec<[f64; 2]>, Vec<IntermediateStation>) {
        debug!("route station details absent, resolving ids against station index");
        let resolved: Vec<&Station> = station_ids
            .iter()
            .filter_map(|id| self.station_index.get(id))
            .collect();

        let mut polyline = Vec::new();
        let mut intermediate = Vec::new();
        for (index, station) in resolved.iter().enumerate() {
            polyline.push([station.latitude, station.longitude]);

            let is_first = index == 0;
            let is_last = index == resolved.len() - 1;
            if !is_first && !is_last {
                intermediate.push(IntermediateStation {
                    id: station.id,
                    latitude: station.latitude,
                    longitude: station.longitude,
                    spi: station.traffic.as_ref().map(|t| t.spi),
                    name: Some(station.name.clone()),
                    freeway: None,
                    direction: None,
                });
            }
        }

        (polyline, intermediate)
    }
}
