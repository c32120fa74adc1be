//! Interactive kiosk shell — login gate plus the register/attendance screens.
//!
//! The shell is a stdin command loop over two session states: logged
//! out (only `login` does anything) and logged in (register and
//! attendance both available). Login is credential-independent, a
//! simplification carried from the backend contract: any login
//! submission flips the flag, and no logout transition exists.

use crate::controller::CaptureController;
use chrono::Local;
use rollcall_client::{Config, SubmissionClient};
use rollcall_hw::{CameraSession, CapturedImage, V4lSource};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginState {
    LoggedOut,
    LoggedIn,
}

impl LoginState {
    /// Any login submission flips to `LoggedIn`. There is no logout
    /// transition, so `LoggedIn` is terminal for the process lifetime.
    fn after_login(self) -> LoginState {
        LoginState::LoggedIn
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login,
    Start,
    Capture,
    Register { name: String },
    Attend,
    Status,
    Help,
    Quit,
}

/// Parse one shell line. The input must be non-empty after trimming.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let head = words.next().unwrap_or_default();
    let rest = words.collect::<Vec<_>>().join(" ");

    match head {
        // Credentials after `login` are accepted but never verified.
        "login" => Ok(Command::Login),
        "start" => Ok(Command::Start),
        "capture" => Ok(Command::Capture),
        "register" => Ok(Command::Register { name: rest }),
        "attend" => Ok(Command::Attend),
        "status" => Ok(Command::Status),
        "help" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("unknown command: {other} (try 'help')")),
    }
}

enum Flow {
    Continue,
    Quit,
}

struct Shell {
    login: LoginState,
    controller: CaptureController,
    client: SubmissionClient,
    /// The one pending still; a re-capture overwrites it.
    pending: Option<CapturedImage>,
}

impl Shell {
    async fn handle(&mut self, cmd: Command) -> Flow {
        if self.login == LoginState::LoggedOut {
            match cmd {
                Command::Login => {
                    self.login = self.login.after_login();
                    println!("logged in");
                }
                Command::Help => print_help(self.login),
                Command::Quit => return Flow::Quit,
                _ => println!("please login first"),
            }
            return Flow::Continue;
        }

        match cmd {
            Command::Login => println!("already logged in"),
            Command::Start => match self.controller.start().await {
                Ok(()) => println!("camera ready"),
                Err(e) => println!("error: {e}"),
            },
            Command::Capture => match self.controller.capture().await {
                Ok(image) => {
                    println!(
                        "captured {}x{} still ({} bytes)",
                        image.width,
                        image.height,
                        image.jpeg.len()
                    );
                    self.pending = Some(image);
                }
                Err(e) => println!("error: {e}"),
            },
            Command::Register { name } => self.register(&name).await,
            Command::Attend => self.attend().await,
            Command::Status => self.status().await,
            Command::Help => print_help(self.login),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    async fn register(&mut self, name: &str) {
        let Some(image) = self.pending.as_ref() else {
            println!("error: capture an image first");
            return;
        };
        match self.client.register(name, image).await {
            Ok(result) => {
                println!("{}", result.message);
                self.pending = None;
            }
            // The pending image is kept so the submission can be retried.
            Err(e) => println!("error: {e}"),
        }
    }

    async fn attend(&mut self) {
        let Some(image) = self.pending.as_ref() else {
            println!("error: capture an image first");
            return;
        };
        match self.client.mark_attendance(image).await {
            Ok(result) => {
                println!("{}", result.message);
                println!("(at {})", Local::now().format("%Y-%m-%d %H:%M:%S"));
                self.pending = None;
            }
            Err(e) => println!("error: {e}"),
        }
    }

    async fn status(&mut self) {
        let camera = match self.controller.state().await {
            Ok(state) => state.to_string(),
            Err(e) => format!("unknown ({e})"),
        };
        println!("login: logged in");
        println!("camera: {camera}");
        match &self.pending {
            Some(image) => println!("pending image: {}x{}", image.width, image.height),
            None => println!("pending image: none"),
        }
    }
}

fn print_help(login: LoginState) {
    if login == LoginState::LoggedOut {
        println!("commands: login, help, quit");
        return;
    }
    println!("commands:");
    println!("  start            start the camera");
    println!("  capture          sample one still (replaces any earlier capture)");
    println!("  register <name>  submit the pending still under <name>");
    println!("  attend           submit the pending still for attendance");
    println!("  status           show session state");
    println!("  quit             leave the kiosk");
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Run the kiosk until stdin closes or the user quits. The camera is
/// released on every exit path.
pub async fn run(config: &Config, controller: CaptureController) -> anyhow::Result<()> {
    let client = SubmissionClient::new(config.base_url()?, config.request_timeout())?;
    let mut shell = Shell {
        login: LoginState::LoggedOut,
        controller,
        client,
        pending: None,
    };

    println!("rollcall — face attendance kiosk (type 'help' for commands)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            match parse_command(line) {
                Ok(cmd) => {
                    if let Flow::Quit = shell.handle(cmd).await {
                        break;
                    }
                }
                Err(msg) => println!("{msg}"),
            }
        }
        prompt();
    }

    shell.controller.stop().await.ok();
    Ok(())
}

/// Build the production camera controller for one kiosk run.
pub fn camera_controller(config: &Config) -> CaptureController {
    let session = CameraSession::new(V4lSource::new(&config.camera_device), config.jpeg_quality);
    crate::controller::spawn(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("login"), Ok(Command::Login));
        assert_eq!(parse_command("  start "), Ok(Command::Start));
        assert_eq!(parse_command("capture"), Ok(Command::Capture));
        assert_eq!(parse_command("attend"), Ok(Command::Attend));
        assert_eq!(parse_command("quit"), Ok(Command::Quit));
        assert_eq!(parse_command("exit"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_login_ignores_credentials() {
        assert_eq!(parse_command("login admin hunter2"), Ok(Command::Login));
    }

    #[test]
    fn test_parse_register_keeps_full_name() {
        assert_eq!(
            parse_command("register Alice Smith"),
            Ok(Command::Register {
                name: "Alice Smith".to_string()
            })
        );
        // Missing name is passed through; the client rejects it.
        assert_eq!(
            parse_command("register"),
            Ok(Command::Register {
                name: String::new()
            })
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        assert!(parse_command("logout").is_err());
    }

    #[test]
    fn test_login_has_no_logout_transition() {
        let state = LoginState::LoggedOut.after_login();
        assert_eq!(state, LoginState::LoggedIn);
        // Logging in again stays logged in; the state is terminal.
        assert_eq!(state.after_login(), LoginState::LoggedIn);
    }
}
