use std::io::{self, Write};

use bulb_app::Config;
use bulb_core::{
    Applier, ChatEvent, ChatModel, ChatSession, ChatStream, Directive, FileStore, GreedyDiff,
    InputLimits, Message, Review, Severity, UserInput,
};
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::render;
use crate::session::{CliResult, ProjectFiles, ProjectStore};

type Input = Lines<BufReader<Stdin>>;

// ---------------------------------------------------------------------------
// Slash commands
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Active(Option<&'a str>),
    Files,
    Image(&'a str),
    Quit,
    Unknown(&'a str),
}

/// Parse `line` as a slash command. Plain text is `None`.
fn parse_command(line: &str) -> Option<Command<'_>> {
    let rest = line.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (rest, None),
    };
    Some(match (name, arg) {
        ("active", arg) => Command::Active(arg),
        ("files", None) => Command::Files,
        ("image", Some(url)) => Command::Image(url),
        ("quit" | "exit", None) => Command::Quit,
        _ => Command::Unknown(name),
    })
}

// ---------------------------------------------------------------------------
// REPL
// ---------------------------------------------------------------------------

struct Repl<'p> {
    project: &'p mut ProjectStore,
    session: ChatSession,
    applier: Applier,
    active: Option<String>,
    images: Vec<String>,
    input: Input,
}

pub async fn run(
    project: &mut ProjectStore,
    model: ChatModel,
    config: &Config,
    active: Option<String>,
) -> CliResult<()> {
    let history = project.history()?;
    let mut session = ChatSession::with_history(model, history);
    session.limits(InputLimits {
        max_chars: config.max_input_chars,
    });

    let mut repl = Repl {
        project,
        session,
        applier: Applier::new(config.create_policy),
        active,
        images: Vec::new(),
        input: BufReader::new(tokio::io::stdin()).lines(),
    };

    println!(
        "{} project '{}'. /files, /active <path>, /image <url>, /quit. Ctrl-C stops a reply.",
        "bulb".bold(),
        repl.project.project().name
    );
    repl.run().await
}

impl Repl<'_> {
    async fn run(&mut self) -> CliResult<()> {
        loop {
            prompt(self.active.as_deref())?;
            let line = tokio::select! {
                line = self.input.next_line() => line?,
                _ = tokio::signal::ctrl_c() => None,
            };
            let Some(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(command) = parse_command(line) {
                if command == Command::Quit {
                    break;
                }
                self.command(command)?;
                continue;
            }

            self.turn(line).await?;
        }

        self.project.sync(&self.session.messages())?;
        Ok(())
    }

    fn command(&mut self, command: Command<'_>) -> CliResult<()> {
        match command {
            Command::Active(None) => match &self.active {
                Some(path) => println!("active file: {path}"),
                None => println!("no active file"),
            },
            Command::Active(Some(path)) => {
                if self.project.files().get(path)?.is_none() {
                    println!("{}", missing_active_note(path).yellow());
                }
                self.active = Some(path.to_string());
            }
            Command::Files => {
                let files = self.project.files().list()?;
                if files.is_empty() {
                    println!("no files");
                }
                for file in files {
                    let marker = if self.active.as_deref() == Some(file.path.as_str()) {
                        "*"
                    } else {
                        " "
                    };
                    println!("{marker} {} ({})", file.path, file.file_type);
                }
            }
            Command::Image(url) => {
                self.images.push(url.to_string());
                println!("attached image ({} pending)", self.images.len());
            }
            Command::Unknown(name) => {
                println!("{}", format!("unknown command /{name}").yellow());
            }
            Command::Quit => {}
        }
        Ok(())
    }

    async fn turn(&mut self, text: &str) -> CliResult<()> {
        let input = UserInput {
            text: text.to_string(),
            images: std::mem::take(&mut self.images),
            active_file: self.active.clone(),
        };
        let mut stream = match self.session.submit(input) {
            Ok(stream) => stream,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                return Ok(());
            }
        };

        let completed = stream_reply(&mut stream).await?;
        self.project.sync(&self.session.messages())?;

        if let Some((message, Some(directive))) = completed {
            self.apply(&message, &directive).await?;
        }
        Ok(())
    }

    async fn apply(&mut self, message: &Message, directive: &Directive) -> CliResult<()> {
        let mut files = self.project.files();
        let changes = match self.applier.apply(
            message.id,
            directive,
            &mut files,
            self.active.as_deref(),
        ) {
            Ok(Some(report)) => {
                if let Some(notice) = &report.notice {
                    println!("{}", notice.to_string().green());
                }
                self.active = report.active_file;
                report.changes
            }
            Ok(None) => return Ok(()),
            Err(bulb_core::Error::PartiallyApplied { changes, source }) => {
                eprintln!("{}", format!("could not apply every change: {source}").red());
                changes
            }
            Err(e) => {
                eprintln!("{}", format!("could not apply changes: {e}").red());
                return Ok(());
            }
        };

        review(&mut files, changes, &mut self.input).await?;

        if let Some(active) = &self.active
            && files.get(active)?.is_none()
        {
            self.active = files.list()?.into_iter().next().map(|f| f.path);
        }
        Ok(())
    }
}

/// Bare code blocks only replace existing files.
fn missing_active_note(path: &str) -> String {
    format!(
        "note: {path} does not exist. Code blocks will not be applied to it until a reply creates it with CREATE_FILE: {path}"
    )
}

fn prompt(active: Option<&str>) -> io::Result<()> {
    let mut out = io::stdout();
    match active {
        Some(path) => write!(out, "{} {} ", format!("[{path}]").dim(), ">".bold())?,
        None => write!(out, "{} ", ">".bold())?,
    }
    out.flush()
}

/// Print a reply as it streams. Returns the completed message and its
/// directive, or `None` if the reply was stopped or failed.
async fn stream_reply(stream: &mut ChatStream) -> CliResult<Option<(Message, Option<Directive>)>> {
    let cancel = stream.cancel_handle();
    let mut out = io::stdout();
    let mut completed = None;

    loop {
        let event = tokio::select! {
            event = stream.next() => event,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                continue;
            }
        };
        let Some(event) = event else { break };

        match event {
            ChatEvent::UserMessage { .. } => {}
            ChatEvent::TextDelta { delta, .. } => {
                write!(out, "{delta}")?;
                out.flush()?;
            }
            ChatEvent::GeneratingFile { path } => {
                writeln!(out)?;
                writeln!(out, "{}", format!("writing {path}…").cyan())?;
            }
            ChatEvent::TurnComplete { message, directive } => {
                writeln!(out)?;
                completed = Some((message, directive));
            }
            ChatEvent::Cancelled { .. } => {
                writeln!(out)?;
                writeln!(out, "{}", "stopped".dim())?;
            }
            ChatEvent::Error { error, notice } => {
                writeln!(out)?;
                let text = notice
                    .map(|n| n.content)
                    .unwrap_or_else(|| error.user_message());
                match error.severity() {
                    Severity::Blocking => eprintln!("{}", text.red()),
                    Severity::Transient => eprintln!("{}", text.yellow()),
                }
            }
        }
    }
    Ok(completed)
}

/// Ask keep/undo for every change. End of input keeps everything still
/// pending.
async fn review(
    files: &mut ProjectFiles<'_>,
    changes: Vec<bulb_core::FileChange>,
    input: &mut Input,
) -> CliResult<()> {
    let mut review = Review::new(changes);
    let pending: Vec<_> = review
        .pending()
        .map(|c| (c.path.clone(), c.kind))
        .collect();

    for (path, kind) in pending {
        let lines = review.diff(&path, &GreedyDiff).unwrap_or_default();
        println!(
            "{} {} ({})",
            render::change_label(kind).bold(),
            path,
            render::summary(&lines)
        );
        render::print_diff(&mut io::stdout(), &lines)?;

        loop {
            print!("keep or undo? [K/u] ");
            io::stdout().flush()?;
            let answer = input.next_line().await?;
            match answer.as_deref().map(str::trim) {
                None => {
                    review.keep_all();
                    return Ok(());
                }
                Some("" | "k" | "K" | "keep") => {
                    review.keep(&path)?;
                    break;
                }
                Some("u" | "U" | "undo") => {
                    review.undo(&path, files)?;
                    println!("{}", format!("reverted {path}").yellow());
                    break;
                }
                Some(_) => continue,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_commands_parse() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("/files"), Some(Command::Files));
        assert_eq!(parse_command("/quit"), Some(Command::Quit));
        assert_eq!(parse_command("/active"), Some(Command::Active(None)));
        assert_eq!(
            parse_command("/active  src/App.tsx "),
            Some(Command::Active(Some("src/App.tsx")))
        );
        assert_eq!(
            parse_command("/image https://example.test/a.png"),
            Some(Command::Image("https://example.test/a.png"))
        );
        assert_eq!(parse_command("/image"), Some(Command::Unknown("image")));
        assert_eq!(parse_command("/nope x"), Some(Command::Unknown("nope")));
    }

    #[test]
    fn missing_active_file_note_points_at_create() {
        let note = missing_active_note("src/New.tsx");
        assert!(note.contains("does not exist"));
        assert!(note.contains("CREATE_FILE: src/New.tsx"));
        assert!(!note.contains("yet"));
    }
}
