use askama::Template;
use shared::Granularity;

use crate::handlers::ChartForm;

pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "index.html.jinja", escape = "html")]
pub struct IndexTemplate {
    pub chart_url: Option<String>,
    pub error: Option<String>,
    pub symbol: String,
    pub start_date: String,
    pub end_date: String,
    pub chart_types: Vec<Choice>,
    pub time_series: Vec<Choice>,
}

impl IndexTemplate {
    /// Blank form, daily line chart preselected.
    pub fn empty() -> Self {
        Self::with_values("", "line", Granularity::Daily, "", "")
    }

    pub fn success(form: &ChartForm, chart_url: String) -> Self {
        Self {
            chart_url: Some(chart_url),
            ..Self::from_form(form)
        }
    }

    pub fn failure(form: &ChartForm, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::from_form(form)
        }
    }

    fn from_form(form: &ChartForm) -> Self {
        Self::with_values(
            form.symbol.trim(),
            form.chart_type.trim(),
            Granularity::from_code(&form.time_series),
            form.start_date.trim(),
            form.end_date.trim(),
        )
    }

    fn with_values(
        symbol: &str,
        chart_type: &str,
        granularity: Granularity,
        start_date: &str,
        end_date: &str,
    ) -> Self {
        let line = chart_type == "line";
        Self {
            chart_url: None,
            error: None,
            symbol: symbol.to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            chart_types: vec![
                Choice {
                    value: "line",
                    label: "Line",
                    selected: line,
                },
                Choice {
                    value: "bar",
                    label: "Bar",
                    selected: !line,
                },
            ],
            time_series: Granularity::ALL
                .iter()
                .map(|g| Choice {
                    value: g.code(),
                    label: g.label(),
                    selected: *g == granularity,
                })
                .collect(),
        }
    }
}
