use crate::cli::{AnalyzeArgs, Cli, NormalizeArgs};
use crate::domain::models::{GateReport, HealthReport, InputDraft, NormalizeReport, NormalizedPoint};
use crate::services::client::HttpAnalysisClient;
use crate::services::config::ClientConfig;
use crate::services::gate::offers_override;
use crate::services::geometry::{normalize, BoundingBox};
use crate::services::images::load_image;
use crate::services::output::{print_one, render_result, result_report};
use crate::services::session::{AnalysisSession, SessionState};
use std::path::Path;

fn write_json_pretty<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

pub async fn handle_analyze(
    cli: &Cli,
    args: &AnalyzeArgs,
    config: &ClientConfig,
    client: &HttpAnalysisClient,
) -> anyhow::Result<()> {
    let draft = InputDraft {
        front: Some(load_image(&args.front)?),
        side: Some(load_image(&args.side)?),
        gender: args.gender.unwrap_or(config.default_gender),
    };

    let mut session = AnalysisSession::new();
    let dispatch = session.submit(&draft)?;
    session.run(client, dispatch).await;

    if let (Some(x), Some(y)) = (args.tr_x, args.tr_y) {
        if matches!(session.state(), SessionState::Ready { .. }) {
            let dispatch = session.manual_override(NormalizedPoint::new(x, y))?;
            session.run(client, dispatch).await;
        }
    }

    match session.state() {
        SessionState::Ready { result, .. } => {
            if let Some(out) = &args.out {
                write_json_pretty(out, result)?;
            }
            print_one(cli.json, result_report("ready", result), |r| {
                render_result(r.result)
            })
        }
        SessionState::Failed { message, .. } => anyhow::bail!("{}", message),
        other => anyhow::bail!("analysis ended in unexpected state {}", other.name()),
    }
}

pub async fn handle_health(cli: &Cli, client: &HttpAnalysisClient) -> anyhow::Result<()> {
    let ok = client.health().await?;
    let report = HealthReport {
        api_url: client.base_url().to_string(),
        ok,
    };
    print_one(cli.json, &report, |r| {
        format!("{}\t{}", r.api_url, if r.ok { "ok" } else { "unhealthy" })
    })?;
    if !ok {
        anyhow::bail!("analysis service reported unhealthy");
    }
    Ok(())
}

pub fn handle_normalize(cli: &Cli, args: &NormalizeArgs) -> anyhow::Result<()> {
    let bbox = BoundingBox {
        left: args.left,
        top: args.top,
        width: args.width,
        height: args.height,
    };
    let point = normalize(args.click_x, args.click_y, &bbox)?;
    let report = NormalizeReport {
        x: point.x,
        y: point.y,
        within_image: point.within_unit_square(),
    };
    print_one(cli.json, report, |r| {
        format!(
            "{}\t{}\t{}",
            r.x,
            r.y,
            if r.within_image { "inside" } else { "outside" }
        )
    })
}

pub fn handle_gate(cli: &Cli, warnings: &[String]) -> anyhow::Result<()> {
    let report = GateReport {
        offers_override: offers_override(warnings),
        warnings: warnings.to_vec(),
    };
    print_one(cli.json, report, |r| {
        if r.offers_override {
            "manual Tr placement offered".to_string()
        } else {
            "manual Tr placement not offered".to_string()
        }
    })
}
