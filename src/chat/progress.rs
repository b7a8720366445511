// ABOUTME: Human-facing progress messages for tool invocations
// ABOUTME: Per-tool Spanish phrasing, with model explanations re-wrapped when present
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Traffic Assistant Contributors

//! Progress message formatting for the tool loop.

use chrono::Utc;
use serde_json::Value;

use crate::constants::limits::PROGRESS_WORDS_PER_LINE;
use crate::mcp::tool_names;
use crate::models::ToolProgress;

/// Build the progress message for a tool invocation
///
/// When the model emitted explanatory text immediately before the call,
/// that text (re-wrapped to a fixed words-per-line width) is preferred over
/// the canned per-tool phrasing.
#[must_use]
pub fn tool_progress_message(
    tool_name: &str,
    tool_input: &Value,
    previous_explanation: Option<&str>,
) -> String {
    if let Some(explanation) = previous_explanation {
        let trimmed = explanation.trim();
        if !trimmed.is_empty() {
            return wrap_words(trimmed, PROGRESS_WORDS_PER_LINE);
        }
    }

    let str_arg = |key: &str, fallback: &str| -> String {
        tool_input
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(fallback)
            .to_owned()
    };

    match tool_name {
        tool_names::GEOCODE_LOCATION => {
            format!(
                "Buscando ubicación de {}...",
                str_arg("location", "la ubicación")
            )
        }
        tool_names::GET_TRAFFIC_AT_LOCATION => {
            format!(
                "Obteniendo tráfico cerca de {}...",
                str_arg("location_name", "la ubicación")
            )
        }
        tool_names::GET_TRAFFIC_STATIONS => tool_input.get("freeway").map_or_else(
            || "Consultando estaciones de tráfico...".to_owned(),
            |freeway| format!("Consultando estaciones de la autopista {freeway}..."),
        ),
        tool_names::PREDICT_TRAFFIC_SPI => "Calculando predicción de tráfico...".to_owned(),
        tool_names::SUGGEST_ROUTES => "Calculando rutas óptimas...".to_owned(),
        _ => format!("⚙️ Ejecutando {tool_name}..."),
    }
}

/// Create a timestamped progress record
#[must_use]
pub fn tool_progress_record(tool_name: &str, message: String) -> ToolProgress {
    ToolProgress {
        tool_name: tool_name.to_owned(),
        message,
        timestamp: Utc::now().timestamp_millis(),
    }
}

/// Re-wrap text at a fixed number of words per line
fn wrap_words(text: &str, words_per_line: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(words_per_line)
        .map(|chunk| chunk.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_geocode_message_uses_location_argument() {
        let message =
            tool_progress_message("geocode_location", &json!({"location": "Hollywood"}), None);
        assert_eq!(message, "Buscando ubicación de Hollywood...");
    }

    #[test]
    fn test_missing_argument_falls_back_to_generic_phrase() {
        let message = tool_progress_message("geocode_location", &json!({}), None);
        assert_eq!(message, "Buscando ubicación de la ubicación...");
    }

    #[test]
    fn test_stations_message_mentions_freeway_when_given() {
        let message = tool_progress_message("get_traffic_stations", &json!({"freeway": 405}), None);
        assert_eq!(message, "Consultando estaciones de la autopista 405...");

        let message = tool_progress_message("get_traffic_stations", &json!({}), None);
        assert_eq!(message, "Consultando estaciones de tráfico...");
    }

    #[test]
    fn test_unrecognized_tool_gets_generic_message() {
        let message = tool_progress_message("future_tool", &json!({}), None);
        assert_eq!(message, "⚙️ Ejecutando future_tool...");
    }

    #[test]
    fn test_explanation_is_wrapped_at_fifteen_words() {
        let explanation = (1..=20)
            .map(|i| format!("palabra{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let message =
            tool_progress_message("suggest_routes", &json!({}), Some(explanation.as_str()));
        let lines: Vec<&str> = message.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split_whitespace().count(), 15);
        assert_eq!(lines[1].split_whitespace().count(), 5);
    }

    #[test]
    fn test_blank_explanation_is_ignored() {
        let message = tool_progress_message("suggest_routes", &json!({}), Some("   "));
        assert_eq!(message, "Calculando rutas óptimas...");
    }
}
