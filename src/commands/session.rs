//! Line-oriented session driver.
//!
//! Requests run on spawned tasks while stdin keeps being read, so a command typed while a
//! request is outstanding reaches the state machine and is refused there.

use crate::cli::{Cli, Gender, SessionArgs};
use crate::domain::errors::{ActionError, AnalysisError, ImageSlot};
use crate::domain::models::{
    AnalysisResult, ImageBlob, InputDraft, NormalizedPoint, SessionEvent,
};
use crate::services::client::AnalysisService;
use crate::services::config::ClientConfig;
use crate::services::geometry::{override_point_from_click, BoundingBox};
use crate::services::images::load_image;
use crate::services::output::{print_line, render_result, result_report};
use crate::services::session::{
    AnalysisSession, Completion, Dispatch, RequestToken, SessionState,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

const HELP: &str = "commands:
  front <path>          select the front photo
  side <path>           select the side photo
  gender <value>        male | female | nonbinary | prefer_not_to_say
  submit                analyze the selected photos
  recalc                analyze the same photos again
  override <click-x> <click-y> <left> <top> <width> <height>
                        place Tr from a click on the rendered front image
  tr <x> <y>            place Tr at a normalized position
  retry                 repeat the request that failed
  reset                 start over
  status | show | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Front(PathBuf),
    Side(PathBuf),
    Gender(Gender),
    Submit,
    Recalculate,
    OverrideClick {
        click_x: f64,
        click_y: f64,
        bbox: BoundingBox,
    },
    OverridePoint(NormalizedPoint),
    Retry,
    Reset,
    Status,
    Show,
    Help,
    Quit,
}

fn numbers<const N: usize>(args: &[&str]) -> Result<[f64; N], String> {
    if args.len() != N {
        return Err(format!("expected {} numbers, got {}", N, args.len()));
    }
    let mut out = [0.0; N];
    for (slot, raw) in out.iter_mut().zip(args) {
        *slot = raw
            .parse::<f64>()
            .map_err(|_| format!("not a number: {}", raw))?;
    }
    Ok(out)
}

pub fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = parts.collect();
    let path_arg = || -> Result<PathBuf, String> {
        if rest.is_empty() {
            return Err(format!("usage: {} <path>", head));
        }
        Ok(PathBuf::from(rest.join(" ")))
    };
    let cmd = match head.to_ascii_lowercase().as_str() {
        "front" => SessionCommand::Front(path_arg()?),
        "side" => SessionCommand::Side(path_arg()?),
        "gender" => {
            let value = rest.first().ok_or("usage: gender <value>")?;
            SessionCommand::Gender(
                Gender::parse(value).ok_or_else(|| format!("unknown gender: {}", value))?,
            )
        }
        "submit" | "analyze" => SessionCommand::Submit,
        "recalc" | "recalculate" => SessionCommand::Recalculate,
        "override" => {
            let [click_x, click_y, left, top, width, height] = numbers::<6>(&rest)?;
            SessionCommand::OverrideClick {
                click_x,
                click_y,
                bbox: BoundingBox {
                    left,
                    top,
                    width,
                    height,
                },
            }
        }
        "tr" => {
            let [x, y] = numbers::<2>(&rest)?;
            SessionCommand::OverridePoint(NormalizedPoint::new(x, y))
        }
        "retry" => SessionCommand::Retry,
        "reset" | "new" => SessionCommand::Reset,
        "status" => SessionCommand::Status,
        "show" => SessionCommand::Show,
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("unknown command: {} (try help)", other)),
    };
    Ok(Some(cmd))
}

type Outcome = (RequestToken, Result<AnalysisResult, AnalysisError>);

struct Driver<S> {
    json: bool,
    service: S,
    session: AnalysisSession,
    draft: InputDraft,
    done: mpsc::UnboundedSender<Outcome>,
}

impl<S> Driver<S>
where
    S: AnalysisService + Clone + Send + Sync + 'static,
{
    fn emit(&self, event: &str, message: Option<String>) -> anyhow::Result<()> {
        let state = self.session.state();
        let data = SessionEvent {
            event: event.to_string(),
            state: state.name(),
            message,
            offers_override: matches!(state, SessionState::Ready { .. })
                .then(|| state.offers_override()),
        };
        print_line(self.json, data, |e| match &e.message {
            Some(m) => format!("{}: {} [{}]", e.event, m, e.state),
            None => format!("{} [{}]", e.event, e.state),
        })
    }

    fn spawn(&self, dispatch: Dispatch) -> anyhow::Result<()> {
        self.emit("dispatched", Some(dispatch.kind.label().to_string()))?;
        let service = self.service.clone();
        let done = self.done.clone();
        tokio::spawn(async move {
            let outcome = service.analyze(&dispatch.request).await;
            let _ = done.send((dispatch.token, outcome));
        });
        Ok(())
    }

    fn act(&self, action: Result<Dispatch, ActionError>) -> anyhow::Result<()> {
        match action {
            Ok(dispatch) => self.spawn(dispatch),
            Err(err) => self.emit("rejected", Some(err.to_string())),
        }
    }

    fn show(&self) -> anyhow::Result<()> {
        let state = self.session.state();
        match state.result() {
            Some(result) => print_line(self.json, result_report(state.name(), result), |r| {
                render_result(r.result)
            }),
            None => self.emit("rejected", Some("no result to show".to_string())),
        }
    }

    fn status(&self) -> anyhow::Result<()> {
        let name = |slot: &Option<ImageBlob>| {
            slot.as_ref()
                .map(|b| b.file_name.clone())
                .unwrap_or_else(|| "-".to_string())
        };
        let mut summary = format!(
            "front={} side={} gender={}",
            name(&self.draft.front),
            name(&self.draft.side),
            self.draft.gender.as_str()
        );
        if let Some(input) = self.session.state().input() {
            summary.push_str(&format!(
                " submitted={},{}",
                input.front.file_name, input.side.file_name
            ));
        }
        if let Some(message) = self.session.state().error_message() {
            summary.push_str(&format!(" error={}", message));
        }
        self.emit("status", Some(summary))
    }

    /// Swapping a photo discards whatever input the session retained, so a later recalculate,
    /// retry or override can never resend the old file. Refused while a request is in flight.
    fn select(&mut self, slot: ImageSlot, path: &Path) -> anyhow::Result<()> {
        if self.session.state().is_busy() {
            return self.emit("rejected", Some(ActionError::InProgress.to_string()));
        }
        let blob = match load_image(path) {
            Ok(blob) => blob,
            Err(e) => return self.emit("error", Some(e.to_string())),
        };
        let discarded = self.session.state().input().is_some();
        if discarded {
            self.session.reset()?;
        }
        let mut msg = format!("{} {} ({} bytes)", slot, blob.file_name, blob.len());
        if discarded {
            msg.push_str("; previous analysis discarded");
        }
        match slot {
            ImageSlot::Front => self.draft.front = Some(blob),
            ImageSlot::Side => self.draft.side = Some(blob),
        }
        self.emit("selected", Some(msg))
    }

    /// Returns false when the user asked to quit.
    fn handle(&mut self, cmd: SessionCommand) -> anyhow::Result<bool> {
        match cmd {
            SessionCommand::Front(path) => self.select(ImageSlot::Front, &path)?,
            SessionCommand::Side(path) => self.select(ImageSlot::Side, &path)?,
            SessionCommand::Gender(g) => {
                self.draft.gender = g;
                self.emit("selected", Some(format!("gender {}", g.as_str())))?;
            }
            SessionCommand::Submit => {
                let action = self.session.submit(&self.draft);
                self.act(action)?;
            }
            SessionCommand::Recalculate => {
                let action = self.session.recalculate();
                self.act(action)?;
            }
            SessionCommand::OverrideClick {
                click_x,
                click_y,
                bbox,
            } => match override_point_from_click(click_x, click_y, &bbox) {
                Ok(point) => {
                    let action = self.session.manual_override(point);
                    self.act(action)?;
                }
                Err(e) => self.emit("rejected", Some(e.to_string()))?,
            },
            SessionCommand::OverridePoint(point) => {
                let action = self.session.manual_override(point);
                self.act(action)?;
            }
            SessionCommand::Retry => {
                let action = self.session.retry();
                self.act(action)?;
            }
            SessionCommand::Reset => match self.session.reset() {
                Ok(()) => {
                    self.draft = InputDraft {
                        gender: self.draft.gender,
                        ..InputDraft::default()
                    };
                    self.emit("reset", None)?;
                }
                Err(e) => self.emit("rejected", Some(e.to_string()))?,
            },
            SessionCommand::Status => self.status()?,
            SessionCommand::Show => self.show()?,
            SessionCommand::Help => println!("{}", HELP),
            SessionCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    fn completed(
        &mut self,
        token: RequestToken,
        outcome: Result<AnalysisResult, AnalysisError>,
    ) -> anyhow::Result<()> {
        if self.session.complete(token, outcome) == Completion::Stale {
            return Ok(());
        }
        match self.session.state() {
            SessionState::Ready { .. } => {
                self.emit("ready", None)?;
                self.show()
            }
            SessionState::Failed { message, .. } => {
                let message = message.clone();
                self.emit("failed", Some(message))
            }
            _ => Ok(()),
        }
    }
}

pub async fn handle_session<S>(
    cli: &Cli,
    args: &SessionArgs,
    config: &ClientConfig,
    service: S,
) -> anyhow::Result<()>
where
    S: AnalysisService + Clone + Send + Sync + 'static,
{
    let draft = InputDraft {
        front: args.front.as_deref().map(load_image).transpose()?,
        side: args.side.as_deref().map(load_image).transpose()?,
        gender: args.gender.unwrap_or(config.default_gender),
    };
    let (done, mut completions) = mpsc::unbounded_channel::<Outcome>();
    let mut driver = Driver {
        json: cli.json,
        service,
        session: AnalysisSession::new(),
        draft,
        done,
    };
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reading = true;

    loop {
        if !reading && !driver.session.state().is_busy() {
            break;
        }
        tokio::select! {
            line = lines.next_line(), if reading => {
                let Some(line) = line? else {
                    reading = false;
                    continue;
                };
                match parse_command(&line) {
                    Ok(None) => {}
                    Ok(Some(cmd)) => {
                        if !driver.handle(cmd)? {
                            reading = false;
                        }
                    }
                    Err(e) => driver.emit("error", Some(e))?,
                }
            }
            Some((token, outcome)) = completions.recv() => {
                driver.completed(token, outcome)?;
            }
            else => break,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AnalysisInput;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Answers every request with a fixed result and records the front file name sent.
    #[derive(Clone, Default)]
    struct RecordingService {
        fronts: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingService {
        fn fronts(&self) -> Vec<String> {
            self.fronts.lock().unwrap().clone()
        }
    }

    impl AnalysisService for RecordingService {
        async fn analyze(&self, input: &AnalysisInput) -> Result<AnalysisResult, AnalysisError> {
            self.fronts
                .lock()
                .unwrap()
                .push(input.front.file_name.clone());
            Ok(AnalysisResult {
                ok: true,
                all_landmarks_count: 478,
                gender: None,
                mandatory_landmarks: vec![],
                measurements: vec![],
                ratios: vec![],
                annotated_images: ["front", "side", "front_all", "side_all"]
                    .iter()
                    .map(|k| (k.to_string(), String::new()))
                    .collect::<BTreeMap<_, _>>(),
                warnings: vec![],
            })
        }
    }

    fn photos(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let tmp = TempDir::new().unwrap();
        let paths = names
            .iter()
            .map(|n| {
                let p = tmp.path().join(n);
                std::fs::write(&p, b"\x89PNG").unwrap();
                p
            })
            .collect();
        (tmp, paths)
    }

    fn driver(
        service: RecordingService,
    ) -> (
        Driver<RecordingService>,
        mpsc::UnboundedReceiver<Outcome>,
    ) {
        let (done, completions) = mpsc::unbounded_channel();
        let driver = Driver {
            json: true,
            service,
            session: AnalysisSession::new(),
            draft: InputDraft::default(),
            done,
        };
        (driver, completions)
    }

    async fn settle(
        driver: &mut Driver<RecordingService>,
        completions: &mut mpsc::UnboundedReceiver<Outcome>,
    ) {
        let (token, outcome) = completions.recv().await.unwrap();
        driver.completed(token, outcome).unwrap();
    }

    #[tokio::test]
    async fn swapping_a_photo_drops_the_retained_input() {
        let (_tmp, paths) = photos(&["a.png", "b.png", "c.png"]);
        let service = RecordingService::default();
        let (mut driver, mut completions) = driver(service.clone());

        driver.handle(SessionCommand::Front(paths[0].clone())).unwrap();
        driver.handle(SessionCommand::Side(paths[1].clone())).unwrap();
        driver.handle(SessionCommand::Submit).unwrap();
        settle(&mut driver, &mut completions).await;
        assert_eq!(driver.session.state().name(), "ready");

        driver.handle(SessionCommand::Front(paths[2].clone())).unwrap();
        assert_eq!(driver.session.state(), &SessionState::Empty);

        driver.handle(SessionCommand::Recalculate).unwrap();
        assert_eq!(driver.session.state(), &SessionState::Empty);

        driver.handle(SessionCommand::Submit).unwrap();
        settle(&mut driver, &mut completions).await;
        assert_eq!(service.fronts(), vec!["a.png", "c.png"]);
    }

    #[tokio::test]
    async fn photo_swap_is_refused_while_busy() {
        let (_tmp, paths) = photos(&["a.png", "b.png", "c.png"]);
        let service = RecordingService::default();
        let (mut driver, mut completions) = driver(service.clone());

        driver.handle(SessionCommand::Front(paths[0].clone())).unwrap();
        driver.handle(SessionCommand::Side(paths[1].clone())).unwrap();
        driver.handle(SessionCommand::Submit).unwrap();
        driver.handle(SessionCommand::Front(paths[2].clone())).unwrap();
        assert_eq!(driver.session.state().name(), "pending");
        assert_eq!(
            driver.draft.front.as_ref().map(|b| b.file_name.as_str()),
            Some("a.png")
        );

        settle(&mut driver, &mut completions).await;
        assert_eq!(driver.session.state().name(), "ready");
        assert_eq!(service.fronts(), vec!["a.png"]);
    }

    #[test]
    fn parses_actions() {
        assert_eq!(parse_command("  "), Ok(None));
        assert_eq!(parse_command("submit"), Ok(Some(SessionCommand::Submit)));
        assert_eq!(parse_command("RECALC"), Ok(Some(SessionCommand::Recalculate)));
        assert_eq!(
            parse_command("gender prefer_not_to_say"),
            Ok(Some(SessionCommand::Gender(Gender::PreferNotToSay)))
        );
        assert_eq!(
            parse_command("front photos/my front.png"),
            Ok(Some(SessionCommand::Front(PathBuf::from("photos/my front.png"))))
        );
        assert_eq!(
            parse_command("tr 0.5 0.1"),
            Ok(Some(SessionCommand::OverridePoint(NormalizedPoint::new(
                0.5, 0.1
            ))))
        );
    }

    #[test]
    fn parses_click_override() {
        assert_eq!(
            parse_command("override 200 100 100 50 200 100"),
            Ok(Some(SessionCommand::OverrideClick {
                click_x: 200.0,
                click_y: 100.0,
                bbox: BoundingBox {
                    left: 100.0,
                    top: 50.0,
                    width: 200.0,
                    height: 100.0
                }
            }))
        );
    }

    #[test]
    fn reports_bad_input() {
        assert!(parse_command("override 1 2 3").is_err());
        assert!(parse_command("tr a b").is_err());
        assert!(parse_command("gender robot").is_err());
        assert!(parse_command("front").is_err());
        assert!(parse_command("launch").is_err());
    }
}
