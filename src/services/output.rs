use crate::domain::models::{AnalysisResult, JsonOut, ResultReport};
use crate::services::gate::offers_override;
use serde::Serialize;

pub fn print_one<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonOut { ok: true, data })?
        );
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

/// Single-line JSON, for streams of events.
pub fn print_line<T: Serialize>(
    json: bool,
    data: T,
    row: impl Fn(&T) -> String,
) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(&JsonOut { ok: true, data })?);
    } else {
        println!("{}", row(&data));
    }
    Ok(())
}

pub fn result_report<'a>(state: &'static str, result: &'a AnalysisResult) -> ResultReport<'a> {
    ResultReport {
        state,
        offers_override: offers_override(result.warnings.as_slice()),
        debug_images: result.debug_images().map(|(k, _)| k).collect(),
        missing_landmarks: result.missing_landmarks(),
        result,
    }
}

fn fmt_value(value: Option<f64>, digits: usize) -> String {
    value
        .map(|v| format!("{:.*}", digits, v))
        .unwrap_or_else(|| "-".to_string())
}

pub fn render_result(result: &AnalysisResult) -> String {
    let mut lines = vec![format!(
        "landmarks: {} detected, {} mandatory",
        result.all_landmarks_count,
        result.mandatory_landmarks.len()
    )];
    let missing = result.missing_landmarks();
    if !missing.is_empty() {
        lines.push(format!("missing: {}", missing.join(", ")));
    }

    lines.push("measurements:".to_string());
    for m in &result.measurements {
        lines.push(format!(
            "  {}\t{}\t{}\t{} {}\t{}",
            m.id,
            m.label,
            m.image,
            fmt_value(m.value, 2),
            m.unit,
            m.note.as_deref().unwrap_or("")
        ));
    }
    lines.push("ratios:".to_string());
    for r in &result.ratios {
        lines.push(format!(
            "  {}\t{} / {}\t{}\t{}",
            r.id,
            r.numerator,
            r.denominator,
            fmt_value(r.value, 3),
            r.note.as_deref().unwrap_or("")
        ));
    }

    let variants: Vec<&str> = result.annotated_images.keys().map(String::as_str).collect();
    lines.push(format!("images: {}", variants.join(", ")));
    for w in &result.warnings {
        lines.push(format!("warning: {}", w));
    }
    if offers_override(result.warnings.as_slice()) {
        lines.push("hint: Tr was not detected; it can be placed manually".to_string());
    }
    lines.join("\n")
}
