//! Line-oriented terminal front-end.
//!
//! This is the display collaborator: it turns typed commands into controller
//! calls, prints what the controllers expose, and acknowledges every one-shot
//! event it acts on.

use std::{future, sync::Arc};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::{
    clock::Clock,
    db::{SessionRecord, SleepQuality},
    detail::SleepDetailController,
    event::EventReceiver,
    operation::StoreFailure,
    quality::SleepQualityController,
    store::SleepStore,
    tracker::{format::format_night, SleepTrackerController},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const HELP: &str = "\
commands:
  start        begin tracking a night
  stop         end the current night and rate it
  rate <0-5>   rate the night (on the quality screen)
  list         show every tracked night
  show <id>    open one night
  back         leave the detail screen
  clear        delete every night
  quit         exit";

enum Screen {
    Tracker,
    Quality(SleepQualityController),
    Detail(SleepDetailController),
}

impl Screen {
    fn back_events(&self) -> Option<EventReceiver<()>> {
        match self {
            Screen::Tracker => None,
            Screen::Quality(controller) => Some(controller.navigation_events()),
            Screen::Detail(controller) => Some(controller.navigation_events()),
        }
    }

    /// Failures raised by the screen's own controller. The tracker's are
    /// watched for the whole session.
    fn failure_events(&self) -> Option<EventReceiver<StoreFailure>> {
        match self {
            Screen::Quality(controller) => Some(controller.failure_events()),
            Screen::Tracker | Screen::Detail(_) => None,
        }
    }

    fn acknowledge_failure(&self) {
        if let Screen::Quality(controller) = self {
            controller.acknowledge_failure();
        }
    }
}

struct Console {
    store: Arc<dyn SleepStore>,
    scope: CancellationToken,
    tracker: SleepTrackerController,
    screen: Screen,
}

pub async fn run_console(
    store: Arc<dyn SleepStore>,
    clock: Arc<dyn Clock>,
    scope: &CancellationToken,
) -> Result<()> {
    let tracker = SleepTrackerController::new(Arc::clone(&store), clock, scope);
    tracker.ready().await;

    let mut console = Console {
        store,
        scope: scope.clone(),
        tracker,
        screen: Screen::Tracker,
    };
    console.print_status();
    println!("{HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut to_quality = console.tracker.navigation_events();
    let mut cleared = console.tracker.notification_events();
    let mut to_detail = console.tracker.detail_events();
    let mut failures = console.tracker.failure_events();
    let mut back: Option<EventReceiver<()>> = None;
    let mut screen_failures: Option<EventReceiver<StoreFailure>> = None;
    let mut snapshots = console.tracker.subscribe();
    let mut shown_current = console.tracker.current().map(|night| night.id);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read from stdin")? else {
                    break;
                };
                if !console.dispatch(line.trim()) {
                    break;
                }
            }
            Ok(()) = snapshots.changed() => {
                let current = snapshots.borrow_and_update().current.as_ref().map(|night| night.id);
                if current != shown_current {
                    shown_current = current;
                    if matches!(console.screen, Screen::Tracker) {
                        console.print_status();
                    }
                }
            }
            Some(night) = to_quality.next() => {
                console.open_quality(&night);
                console.tracker.acknowledge_navigation();
                back = console.screen.back_events();
                screen_failures = console.screen.failure_events();
            }
            Some(session_id) = to_detail.next() => {
                console.open_detail(session_id);
                console.tracker.acknowledge_detail_navigation();
                back = console.screen.back_events();
                screen_failures = console.screen.failure_events();
            }
            Some(()) = cleared.next() => {
                println!("All sleep data has been cleared.");
                console.tracker.acknowledge_notification();
            }
            Some(failure) = failures.next() => {
                print_failure(&failure);
                console.tracker.acknowledge_failure();
            }
            Some(failure) = next_pending(&mut screen_failures) => {
                print_failure(&failure);
                console.screen.acknowledge_failure();
            }
            Some(()) = next_pending(&mut back) => {
                console.return_to_tracker().await;
                back = None;
                screen_failures = None;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    log_info!("Console closing");
    console.close().await;
    Ok(())
}

/// Waits on an event that only exists while a particular screen is shown.
async fn next_pending<T: Clone>(events: &mut Option<EventReceiver<T>>) -> Option<T> {
    match events {
        Some(receiver) => receiver.next().await,
        None => future::pending().await,
    }
}

fn print_failure(failure: &StoreFailure) {
    println!(
        "Could not {} right now: {}. Try again.",
        failure.operation, failure.message
    );
}

impl Console {
    /// Returns `false` when the user asked to quit.
    fn dispatch(&self, line: &str) -> bool {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return true;
        };
        let argument = words.next();
        log_debug!("console command {command:?} {argument:?}");

        match (command, &self.screen) {
            ("quit" | "exit", _) => return false,
            ("help", _) => println!("{HELP}"),
            ("rate", Screen::Quality(controller)) => match parse_quality(argument) {
                Some(quality) => {
                    let _ = controller.set_rating(quality);
                }
                None => println!("rate takes a number from 0 (very bad) to 5 (excellent)"),
            },
            ("back", Screen::Detail(controller)) => controller.close(),
            (_, Screen::Quality(_)) => println!("Rate the night first: rate <0-5>"),
            (_, Screen::Detail(_)) => println!("Type `back` to return to the tracker"),
            ("start", Screen::Tracker) => {
                if self.tracker.can_start() {
                    let _ = self.tracker.start();
                } else {
                    println!("Already tracking a night; `stop` it first.");
                }
            }
            ("stop", Screen::Tracker) => {
                if self.tracker.can_stop() {
                    let _ = self.tracker.stop();
                } else {
                    println!("Nothing to stop; `start` a night first.");
                }
            }
            ("clear", Screen::Tracker) => {
                if self.tracker.can_clear() {
                    let _ = self.tracker.clear();
                } else {
                    println!("There is nothing to clear.");
                }
            }
            ("list", Screen::Tracker) => self.print_history(),
            ("show", Screen::Tracker) => match argument.and_then(|id| id.parse().ok()) {
                Some(session_id) => self.tracker.select_session(session_id),
                None => println!("show takes a night id, see `list`"),
            },
            (other, Screen::Tracker) => println!("Unknown command `{other}`; try `help`."),
        }
        true
    }

    fn open_quality(&mut self, night: &SessionRecord) {
        println!("{}", format_night(night));
        println!("How did you sleep? rate <0-5>");
        for quality in SleepQuality::ALL {
            println!("  {} = {}", quality.as_i32(), quality);
        }
        let controller = SleepQualityController::new(night.id, Arc::clone(&self.store), &self.scope);
        self.replace_screen(Screen::Quality(controller));
    }

    fn open_detail(&mut self, session_id: i64) {
        let controller =
            SleepDetailController::new(session_id, Arc::clone(&self.store), &self.scope);
        match controller.session() {
            Some(night) => println!("{}", format_night(&night)),
            None => println!("Night #{session_id} does not exist."),
        }
        println!("Type `back` to return.");
        self.replace_screen(Screen::Detail(controller));
    }

    fn replace_screen(&mut self, screen: Screen) {
        // Dropping the previous controller cancels its scope.
        self.screen = screen;
    }

    async fn return_to_tracker(&mut self) {
        match std::mem::replace(&mut self.screen, Screen::Tracker) {
            Screen::Tracker => {}
            Screen::Quality(controller) => {
                controller.acknowledge_navigation();
                controller.shutdown().await;
            }
            Screen::Detail(controller) => {
                controller.acknowledge_navigation();
                controller.shutdown().await;
            }
        }
        self.print_status();
    }

    fn print_status(&self) {
        match self.tracker.current() {
            Some(night) => println!("Sleeping: {}", format_night(&night)),
            None => println!("Not tracking. Type `start` when you go to bed."),
        }
    }

    fn print_history(&self) {
        let lines = self.tracker.formatted_history();
        if lines.is_empty() {
            println!("No nights tracked yet.");
        }
        for line in lines {
            println!("{line}");
        }
    }

    async fn close(self) {
        let Console { tracker, screen, .. } = self;
        match screen {
            Screen::Tracker => {}
            Screen::Quality(controller) => controller.shutdown().await,
            Screen::Detail(controller) => controller.shutdown().await,
        }
        tracker.shutdown().await;
    }
}

fn parse_quality(argument: Option<&str>) -> Option<SleepQuality> {
    let value: i32 = argument?.parse().ok()?;
    SleepQuality::try_from(value).ok()
}
