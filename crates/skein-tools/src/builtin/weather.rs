use futures::future::BoxFuture;
use rand::seq::SliceRandom;

use skein_core::error::{Result, SkeinError};
use skein_core::traits::Tool;
use skein_core::types::ToolResult;

/// (condition, temperature in °C)
pub const CONDITIONS: [(&str, i32); 3] = [("Rainy", 15), ("Clear", 25), ("Windy", 20)];

/// Dummy weather: a random pick from [`CONDITIONS`].
pub struct WeatherTool;

fn report(location: &str) -> String {
    let (condition, temp_c) = CONDITIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(CONDITIONS[0]);
    format!("Weather in {}: {}, {}°C", location, condition, temp_c)
}

impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather_info"
    }

    fn description(&self) -> &str {
        "Fetches dummy weather information for a given location."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City or place name"
                }
            },
            "required": ["location"]
        })
    }

    fn execute(&self, input: serde_json::Value) -> BoxFuture<'_, Result<ToolResult>> {
        let result = input["location"]
            .as_str()
            .ok_or_else(|| SkeinError::ToolValidation("'location' must be a string".into()))
            .map(|location| ToolResult::success(report(location)));
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_uses_known_condition() {
        for _ in 0..20 {
            let result = WeatherTool
                .execute(serde_json::json!({"location": "Paris"}))
                .await
                .unwrap();
            let known: Vec<String> = CONDITIONS
                .iter()
                .map(|(c, t)| format!("Weather in Paris: {}, {}°C", c, t))
                .collect();
            assert!(known.contains(&result.content), "unexpected: {}", result.content);
        }
    }

    #[tokio::test]
    async fn test_missing_location() {
        let result = WeatherTool.execute(serde_json::json!({"city": 3})).await;
        assert!(matches!(result, Err(SkeinError::ToolValidation(_))));
    }
}
