//! Server-rendered HTML for the assessment UI.
//!
//! Pages are plain strings; every piece of user-supplied or configured text
//! goes through [`escape_html`].

use std::collections::HashMap;
use std::fmt::Write;
use strum::IntoEnumIterator;

use crate::{
    error::ValidationError,
    model::{CUSTOMER_ID_FIELD, FactorImpact, FieldDomain, FieldSpec, RiskAssessment, RiskLevel},
    rule_set::CutPoints,
};

pub const DEFAULT_CUSTOMER_ID: &str = "CUST_001";

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 0; background: #fafafa; color: #222; }
header { background: #1e3a5f; color: #fff; padding: 1rem 2rem; }
header a { color: #fff; margin-right: 1.5rem; }
main { display: flex; gap: 2rem; padding: 2rem; flex-wrap: wrap; }
section { background: #fff; border-radius: 8px; padding: 1.5rem; box-shadow: 0 1px 3px #ccc; flex: 1; min-width: 320px; }
label { display: block; margin-top: 1rem; font-weight: bold; }
small { color: #666; display: block; }
.banner { padding: 0.75rem 1rem; border-radius: 6px; margin: 1rem 2rem 0; }
.info { background: #e3f2fd; }
.error { background: #ffcdd2; }
.metric { display: inline-block; margin-right: 3rem; font-size: 1.4rem; }
.gauge { height: 28px; border-radius: 14px; overflow: hidden; display: flex; margin: 1rem 0; position: relative; }
.gauge .bar { position: absolute; left: 0; top: 6px; height: 16px; border-radius: 8px; }
table { border-collapse: collapse; width: 100%; margin-top: 1rem; }
td, th { border-bottom: 1px solid #ddd; padding: 0.4rem; text-align: left; }
button { margin-top: 1.5rem; padding: 0.6rem 1.2rem; background: #FF4B4B; color: #fff; border: 0; border-radius: 6px; width: 100%; }
footer { color: #888; padding: 1rem 2rem; font-size: 0.8rem; }
"#;

/// Escapes text for use in HTML bodies and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(project_name: &str, title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title} - {project}</title>
<style>{STYLE}</style>
</head>
<body>
<header>
<h1>&#x1F6E1;&#xFE0F; {project}</h1>
<nav><a href="/">Risk Assessment</a><a href="/about">About</a></nav>
</header>
<div class="banner info">This is a prototype with mock predictions for demonstration purposes</div>
{body}
<footer>{project} | For Demo Purposes Only</footer>
</body>
</html>"#,
        title = escape_html(title),
        project = escape_html(project_name),
        body = body,
    )
}

fn field_input(field: &FieldSpec, current: &str) -> String {
    let name = escape_html(&field.name);
    let value = escape_html(current);
    match &field.domain {
        FieldDomain::Integer { min, max } => format!(
            r#"<input type="range" id="{name}" name="{name}" min="{min}" max="{max}" step="1" value="{value}" oninput="this.nextElementSibling.value=this.value"><output>{value}</output>"#
        ),
        FieldDomain::Number { min, max, step, .. } => format!(
            r#"<input type="range" id="{name}" name="{name}" min="{min}" max="{max}" step="{step}" value="{value}" oninput="this.nextElementSibling.value=this.value"><output>{value}</output>"#
        ),
        FieldDomain::Flag => {
            let yes = matches!(current.trim().to_ascii_lowercase().as_str(), "true" | "on" | "yes" | "1");
            format!(
                r#"<select id="{name}" name="{name}"><option value="false"{no_sel}>No</option><option value="true"{yes_sel}>Yes</option></select>"#,
                no_sel = if yes { "" } else { " selected" },
                yes_sel = if yes { " selected" } else { "" },
            )
        }
        FieldDomain::Choice { options } => {
            let mut out = format!(r#"<select id="{name}" name="{name}">"#);
            for option in options {
                let selected = if option == current { " selected" } else { "" };
                let option = escape_html(option);
                let _ = write!(out, r#"<option value="{option}"{selected}>{option}</option>"#);
            }
            out.push_str("</select>");
            out
        }
    }
}

fn form_section(fields: &[FieldSpec], values: &HashMap<String, String>) -> String {
    let customer_id = values
        .get(CUSTOMER_ID_FIELD)
        .map(String::as_str)
        .unwrap_or(DEFAULT_CUSTOMER_ID);

    let mut out = String::new();
    out.push_str(r#"<section><h3>Customer Information</h3><form method="post" action="/assess">"#);
    let _ = write!(
        out,
        r#"<label for="{id}">Customer ID</label><input type="text" id="{id}" name="{id}" value="{value}">"#,
        id = CUSTOMER_ID_FIELD,
        value = escape_html(customer_id),
    );
    out.push_str("<hr><h3>Risk Indicators</h3>");

    for field in fields {
        let current = values
            .get(&field.name)
            .cloned()
            .unwrap_or_else(|| field.default_value().to_string());
        let _ = write!(
            out,
            r#"<label for="{name}">{label}</label>{input}"#,
            name = escape_html(&field.name),
            label = escape_html(&field.label),
            input = field_input(field, &current),
        );
        if !field.help.is_empty() {
            let _ = write!(out, "<small>{}</small>", escape_html(&field.help));
        }
    }

    out.push_str(r#"<button type="submit">&#x1F50D; Analyze Risk</button></form></section>"#);
    out
}

/// The assessment form. `values` re-populates the inputs after a failed
/// submission; fields without a value show their default.
pub fn render_form(
    project_name: &str,
    fields: &[FieldSpec],
    values: &HashMap<String, String>,
    error: Option<&ValidationError>,
) -> String {
    let mut body = String::new();
    if let Some(error) = error {
        let _ = write!(body, r#"<div class="banner error">{}</div>"#, escape_html(&error.to_string()));
    }
    body.push_str("<main>");
    body.push_str(&form_section(fields, values));
    body.push_str(
        r#"<section><h3>Risk Analysis Results</h3><p>&#x1F446; Enter customer data and click "Analyze Risk" to see results</p></section>"#,
    );
    body.push_str("</main>");
    layout(project_name, "Customer Risk Assessment", &body)
}

fn gauge(assessment: &RiskAssessment, cut_points: &CutPoints) -> String {
    const BAND_COLORS: [&str; 4] = ["#E8F5E9", "#FFF9C4", "#FFE0B2", "#FFCDD2"];

    let mut out = String::from(r#"<div class="gauge">"#);
    for (level, color) in RiskLevel::iter().zip(BAND_COLORS) {
        let (lower, upper) = cut_points.range_of(level);
        let _ = write!(
            out,
            r#"<div style="width:{:.2}%;background:{}" title="{}"></div>"#,
            (upper - lower).max(0.0),
            color,
            level,
        );
    }
    let _ = write!(
        out,
        r#"<div class="bar" style="width:{:.1}%;background:{}"></div></div>"#,
        assessment.score,
        assessment.level.color(),
    );
    out
}

fn impact_color(impact: FactorImpact) -> &'static str {
    match impact {
        FactorImpact::High => RiskLevel::Critical.color(),
        FactorImpact::Medium => RiskLevel::High.color(),
        FactorImpact::Low => RiskLevel::Low.color(),
    }
}

fn result_section(assessment: &RiskAssessment, cut_points: &CutPoints) -> String {
    let mut out = String::from("<section><h3>Risk Analysis Results</h3>");
    if let Some(customer_id) = &assessment.customer_id {
        let _ = write!(out, "<p>Customer: <strong>{}</strong></p>", escape_html(customer_id));
    }
    let _ = write!(
        out,
        r#"<div class="metric">Risk Score<br><strong id="risk-score">{:.1}%</strong></div><div class="metric">Risk Level<br><strong id="risk-level" style="color:{}">{}</strong></div>"#,
        assessment.score,
        assessment.level.color(),
        assessment.level,
    );
    out.push_str("<h4>Delinquency Risk Score</h4>");
    out.push_str(&gauge(assessment, cut_points));

    let _ = write!(
        out,
        r#"<h4>Recommended Action</h4><div class="banner" style="margin:0;background:{}33"><strong>{}</strong><br>{}</div>"#,
        assessment.level.color(),
        assessment.level.headline(),
        escape_html(&assessment.recommendation),
    );

    if !assessment.factors.is_empty() {
        out.push_str("<hr><h4>Risk Factors Breakdown</h4><table><tr><th>Factor</th><th>Value</th><th>Impact</th></tr>");
        for factor in &assessment.factors {
            let _ = write!(
                out,
                r#"<tr><td>{}</td><td>{}</td><td style="color:{}">{}</td></tr>"#,
                escape_html(&factor.label),
                escape_html(&factor.display_value),
                impact_color(factor.impact),
                factor.impact,
            );
        }
        out.push_str("</table>");
    }

    if !assessment.triggered.is_empty() {
        out.push_str("<h4>Score Contributions</h4><table><tr><th>Rule</th><th>Points</th></tr>");
        for rule in &assessment.triggered {
            let _ = write!(
                out,
                "<tr><td>{}</td><td>{:.2}</td></tr>",
                escape_html(&rule.name),
                rule.points
            );
        }
        out.push_str("</table>");
    }

    out.push_str("</section>");
    out
}

/// Form on the left, results on the right, with the submitted values kept
/// in the form.
pub fn render_result(
    project_name: &str,
    fields: &[FieldSpec],
    values: &HashMap<String, String>,
    assessment: &RiskAssessment,
    cut_points: &CutPoints,
) -> String {
    let body = format!(
        "<main>{}{}</main>",
        form_section(fields, values),
        result_section(assessment, cut_points)
    );
    layout(project_name, "Customer Risk Assessment", &body)
}

pub fn render_about(project_name: &str, scorer_name: &str, fields: &[FieldSpec], cut_points: &CutPoints) -> String {
    let mut body = String::from("<main><section><h2>About This Prototype</h2>");
    let _ = write!(
        body,
        "<h3>{}</h3><p>This is a <strong>prototype</strong> demonstrating early detection and prevention of loan delinquency. Scores come from fixed rules of the <em>{}</em> rule set, not from a trained model.</p>",
        escape_html(project_name),
        escape_html(scorer_name),
    );
    body.push_str(
        "<h4>How It Works</h4><ol>\
         <li>Enter customer financial behavior indicators</li>\
         <li>System analyzes risk factors</li>\
         <li>Generates risk score (0-100%)</li>\
         <li>Provides risk level classification</li>\
         <li>Recommends intervention strategy</li></ol>",
    );

    body.push_str("<h4>Risk Levels</h4><ul>");
    for level in RiskLevel::iter() {
        let (lower, upper) = cut_points.range_of(level);
        let _ = write!(
            body,
            r#"<li><strong style="color:{}">{}</strong> ({}-{}%): {}</li>"#,
            level.color(),
            level,
            lower,
            upper,
            level.summary(),
        );
    }
    body.push_str("</ul>");

    body.push_str("<h4>Risk Indicators</h4><ul>");
    for field in fields {
        let _ = write!(body, "<li><strong>{}</strong>", escape_html(&field.label));
        if !field.help.is_empty() {
            let _ = write!(body, ": {}", escape_html(&field.help));
        }
        body.push_str("</li>");
    }
    body.push_str("</ul>");

    body.push_str(
        "<h4>Next Steps for Production</h4><ul>\
         <li>Integrate real ML models</li>\
         <li>Connect to live data sources</li>\
         <li>Add batch processing</li>\
         <li>Deploy to cloud infrastructure</li></ul>\
         <p><strong>Note</strong>: this prototype uses mock predictions for demonstration.</p>",
    );
    body.push_str("</section></main>");
    layout(project_name, "About", &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FactorBreakdown, FeatureValue, TriggeredRule};

    fn assessment() -> RiskAssessment {
        RiskAssessment {
            customer_id: Some("<script>alert(1)</script>".to_string()),
            inputs: Vec::new(),
            score: 62.5,
            level: RiskLevel::High,
            triggered: vec![TriggeredRule {
                name: "Savings decline".to_string(),
                points: 20.0,
            }],
            factors: vec![FactorBreakdown {
                name: "savings_drop_pct".to_string(),
                label: "Savings Decline (%)".to_string(),
                value: FeatureValue::Double(0.5),
                display_value: "50%".to_string(),
                impact: FactorImpact::Medium,
            }],
            recommendation: RiskLevel::High.recommendation().to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_result_page_escapes_customer_id() {
        let html = render_result("Demo", &[], &HashMap::new(), &assessment(), &CutPoints::default());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("62.5%"));
        assert!(html.contains("HIGH RISK"));
        assert!(html.contains("Propose debt consolidation plan"));
        assert!(html.contains("Savings Decline (%)"));
    }

    #[test]
    fn test_form_uses_defaults_and_submitted_values() {
        let fields = vec![
            FieldSpec::integer("salary_delay_days", "Salary Delay (days)", 0, 30).with_default(0),
            FieldSpec::flag("has_overdraft", "Overdraft"),
        ];
        let html = render_form("Demo", &fields, &HashMap::new(), None);
        assert!(html.contains(r#"name="salary_delay_days" min="0" max="30" step="1" value="0""#));
        assert!(html.contains(DEFAULT_CUSTOMER_ID));

        let mut values = HashMap::new();
        values.insert("salary_delay_days".to_string(), "12".to_string());
        values.insert("has_overdraft".to_string(), "true".to_string());
        let html = render_form("Demo", &fields, &values, None);
        assert!(html.contains(r#"value="12""#));
        assert!(html.contains(r#"<option value="true" selected>Yes</option>"#));
    }

    #[test]
    fn test_form_keeps_flag_regardless_of_case() {
        let fields = vec![FieldSpec::flag("has_overdraft", "Overdraft")];
        for submitted in ["Yes", "TRUE", " On "] {
            let mut values = HashMap::new();
            values.insert("has_overdraft".to_string(), submitted.to_string());
            let html = render_form("Demo", &fields, &values, None);
            assert!(
                html.contains(r#"<option value="true" selected>Yes</option>"#),
                "{} rendered as No",
                submitted
            );
        }
    }

    #[test]
    fn test_form_shows_validation_error() {
        let err = ValidationError::MissingField("salary_delay_days".to_string());
        let html = render_form("Demo", &[], &HashMap::new(), Some(&err));
        assert!(html.contains("Missing required field: salary_delay_days"));
    }

    #[test]
    fn test_about_lists_levels() {
        let html = render_about("Demo", "pre_delinquency", &[], &CutPoints::default());
        for level in RiskLevel::iter() {
            assert!(html.contains(level.summary()));
        }
        assert!(html.contains("(75-100%)"));
    }
}
