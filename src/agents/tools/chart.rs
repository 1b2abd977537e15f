//! `plot_chart`: turn a result series into a chart artifact
//!
//! The artifact is a Plotly figure document written to the chart output
//! directory. Only a short description and the artifact location go back to
//! the reasoning service; the figure itself never enters the conversation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::Tool;
use crate::agents::error::{ToolError, ToolResult};
use crate::persistence::format::cell_text;

/// Supported chart kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotType {
    Bar,
    Line,
    Scatter,
}

impl PlotType {
    pub fn parse(raw: &str) -> ToolResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(PlotType::Bar),
            "line" => Ok(PlotType::Line),
            "scatter" => Ok(PlotType::Scatter),
            _ => Err(ToolError::UnsupportedPlotType(raw.to_string())),
        }
    }
}

impl fmt::Display for PlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlotType::Bar => write!(f, "bar"),
            PlotType::Line => write!(f, "line"),
            PlotType::Scatter => write!(f, "scatter"),
        }
    }
}

/// A validated chart request
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub plot_type: PlotType,
    pub x_values: Vec<String>,
    pub y_values: Vec<f64>,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

impl ChartSpec {
    /// Plotly figure document for this chart
    pub fn to_plotly(&self) -> Value {
        let trace = match self.plot_type {
            PlotType::Bar => json!({ "type": "bar", "x": self.x_values, "y": self.y_values }),
            PlotType::Line => json!({
                "type": "scatter", "mode": "lines+markers", "x": self.x_values, "y": self.y_values
            }),
            PlotType::Scatter => json!({
                "type": "scatter", "mode": "markers", "x": self.x_values, "y": self.y_values
            }),
        };
        json!({
            "data": [trace],
            "layout": {
                "title": { "text": self.title },
                "xaxis": { "title": { "text": self.x_label } },
                "yaxis": { "title": { "text": self.y_label } },
                "margin": { "l": 40, "r": 40, "t": 40, "b": 40 },
            }
        })
    }
}

/// Where a rendered chart ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartArtifact {
    pub location: String,
}

/// Produces chart artifacts
#[async_trait]
pub trait ChartRenderer: Send + Sync {
    async fn render(&self, chart: &ChartSpec) -> ToolResult<ChartArtifact>;
}

/// Writes Plotly figure JSON into a directory
///
/// File names are derived from the figure content, so rendering the same chart
/// twice yields the same artifact.
pub struct PlotlyJsonRenderer {
    output_dir: PathBuf,
}

impl PlotlyJsonRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl ChartRenderer for PlotlyJsonRenderer {
    async fn render(&self, chart: &ChartSpec) -> ToolResult<ChartArtifact> {
        let body = serde_json::to_vec_pretty(&chart.to_plotly())
            .map_err(|e| ToolError::Execution(format!("Failed to encode chart: {}", e)))?;

        let digest = Sha256::digest(&body);
        let name: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
        let path = self.output_dir.join(format!("chart-{}.json", name));

        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&path, body).await?;

        tracing::info!(path = %path.display(), plot_type = %chart.plot_type, "Wrote chart");

        Ok(ChartArtifact {
            location: path.display().to_string(),
        })
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChartArguments {
    /// Plot type (bar, line, or scatter)
    pub plot_type: String,
    /// List of x values for plotting
    #[schemars(with = "Vec<String>")]
    pub x_values: Vec<Value>,
    /// List of y-axis values for plotting
    pub y_values: Vec<f64>,
    /// Descriptive title for the plot
    #[serde(alias = "plot_title")]
    pub title: String,
    /// Label for the x-axis
    pub x_label: String,
    /// Label for the y-axis
    pub y_label: String,
}

impl ChartArguments {
    /// Check the series and resolve the plot type
    pub fn validate(self) -> ToolResult<ChartSpec> {
        let plot_type = PlotType::parse(&self.plot_type)?;
        if self.x_values.is_empty() || self.y_values.is_empty() {
            return Err(ToolError::argument(
                PlotChart::NAME,
                "x_values and y_values cannot be empty",
            ));
        }
        if self.x_values.len() != self.y_values.len() {
            return Err(ToolError::argument(
                PlotChart::NAME,
                format!(
                    "x_values and y_values must have the same length ({} vs {})",
                    self.x_values.len(),
                    self.y_values.len()
                ),
            ));
        }

        Ok(ChartSpec {
            plot_type,
            x_values: self.x_values.iter().map(cell_text).collect(),
            y_values: self.y_values,
            title: self.title,
            x_label: self.x_label,
            y_label: self.y_label,
        })
    }
}

/// Validates chart requests and hands them to a renderer
pub struct PlotChart {
    renderer: Arc<dyn ChartRenderer>,
}

impl PlotChart {
    pub fn new(renderer: Arc<dyn ChartRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Tool for PlotChart {
    type Args = ChartArguments;
    const NAME: &'static str = "plot_chart";

    fn description(&self) -> String {
        "Plot a bar, line or scatter chart to visualize the result of an SQL query".to_string()
    }

    async fn run(&self, args: ChartArguments) -> ToolResult<String> {
        let chart = args.validate()?;
        let artifact = self.renderer.render(&chart).await?;
        Ok(format!(
            "Created {} chart \"{}\" with {} points at {}",
            chart.plot_type,
            chart.title,
            chart.x_values.len(),
            artifact.location
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(plot_type: &str, x: Vec<Value>, y: Vec<f64>) -> ChartArguments {
        ChartArguments {
            plot_type: plot_type.to_string(),
            x_values: x,
            y_values: y,
            title: "Revenue".to_string(),
            x_label: "Month".to_string(),
            y_label: "EUR".to_string(),
        }
    }

    #[test]
    fn test_plot_type_parse() {
        assert_eq!(PlotType::parse("Bar").unwrap(), PlotType::Bar);
        assert_eq!(PlotType::parse(" line ").unwrap(), PlotType::Line);
        assert!(matches!(
            PlotType::parse("pie"),
            Err(ToolError::UnsupportedPlotType(t)) if t == "pie"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_and_mismatched() {
        assert!(matches!(
            args("bar", vec![], vec![]).validate(),
            Err(ToolError::Argument { .. })
        ));
        assert!(matches!(
            args("bar", vec![json!("a")], vec![1.0, 2.0]).validate(),
            Err(ToolError::Argument { .. })
        ));
    }

    #[test]
    fn test_validate_stringifies_x_values() {
        let spec = args("scatter", vec![json!(2024), json!("Q2")], vec![1.0, 2.5])
            .validate()
            .unwrap();
        assert_eq!(spec.x_values, vec!["2024", "Q2"]);
        let figure = spec.to_plotly();
        assert_eq!(figure["data"][0]["mode"], "markers");
        assert_eq!(figure["layout"]["title"]["text"], "Revenue");
    }

    #[test]
    fn test_plot_title_alias() {
        let parsed: ChartArguments = serde_json::from_value(json!({
            "plot_type": "line",
            "x_values": ["a"],
            "y_values": [1],
            "plot_title": "Legacy",
            "x_label": "x",
            "y_label": "y"
        }))
        .unwrap();
        assert_eq!(parsed.title, "Legacy");
    }

    #[tokio::test]
    async fn test_renderer_is_content_addressed() {
        let dir = tempfile::TempDir::new().unwrap();
        let renderer = PlotlyJsonRenderer::new(dir.path().join("charts"));
        let spec = args("bar", vec![json!("a"), json!("b")], vec![1.0, 2.0])
            .validate()
            .unwrap();

        let first = renderer.render(&spec).await.unwrap();
        let second = renderer.render(&spec).await.unwrap();
        assert_eq!(first, second);
        assert!(first.location.contains("chart-"));

        let written = std::fs::read_to_string(&first.location).unwrap();
        let figure: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(figure["data"][0]["type"], "bar");
    }

    #[tokio::test]
    async fn test_tool_reports_unsupported_type() {
        let dir = tempfile::TempDir::new().unwrap();
        let tool = PlotChart::new(Arc::new(PlotlyJsonRenderer::new(dir.path())));
        let err = tool
            .run(args("pie", vec![json!("a")], vec![1.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::UnsupportedPlotType(_)));
    }
}
