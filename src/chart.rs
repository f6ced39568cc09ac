use crate::error::Result;
use crate::kpi::TimelinePoint;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One named numeric series of a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<TimelinePoint>,
}

/// What to draw, not how: titles and series only. Styling belongs to the
/// renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Filesystem- and URL-safe identifier, used for the artifact name.
    pub slug: String,
    pub title: String,
    pub series: Vec<ChartSeries>,
}

/// An image artifact produced by a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// External chart-rendering collaborator: numeric series in, image out.
pub trait ChartRenderer {
    fn render(&self, spec: &ChartSpec) -> Result<RenderedChart>;
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/svg+xml" => "svg",
        "image/jpeg" => "jpg",
        _ => "bin",
    }
}

/// Writes a rendered chart into the run's working directory. The file is
/// purely a hand-off artifact for the publishing step; nothing reads it
/// back on later runs.
pub fn write_chart_artifact(
    work_dir: &Path,
    spec: &ChartSpec,
    chart: &RenderedChart,
) -> Result<PathBuf> {
    fs::create_dir_all(work_dir)?;
    let path = work_dir.join(format!(
        "{}.{}",
        spec.slug,
        extension_for(&chart.mime_type)
    ));
    fs::write(&path, &chart.bytes)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct StubRenderer;

    impl ChartRenderer for StubRenderer {
        fn render(&self, spec: &ChartSpec) -> Result<RenderedChart> {
            Ok(RenderedChart {
                mime_type: "image/svg+xml".to_string(),
                bytes: format!("<svg><!-- {} --></svg>", spec.title).into_bytes(),
            })
        }
    }

    #[test]
    fn test_render_and_write_artifact() {
        let spec = ChartSpec {
            slug: "revenue-daily".to_string(),
            title: "Daily revenue".to_string(),
            series: vec![ChartSeries {
                name: "revenue".to_string(),
                points: vec![TimelinePoint {
                    date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
                    value: 920.0,
                }],
            }],
        };

        let chart = StubRenderer.render(&spec).unwrap();
        let dir = std::env::temp_dir().join("weekly-report-builder-test-charts");
        let path = write_chart_artifact(&dir, &spec, &chart).unwrap();

        assert!(path.ends_with("revenue-daily.svg"));
        assert!(path.exists());
        std::fs::remove_file(path).unwrap();
    }
}
