use anyhow::{Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Stylize, style};
use crossterm::terminal;
use std::io::{BufRead, IsTerminal, Write};

#[derive(Debug, PartialEq)]
enum Step {
    More,
    Done,
    Abort,
}

/// Ask for a secret on stderr and read it from stdin without echo.
///
/// When stdin is not a terminal (piped key) the line is read as-is.
pub fn read_secret(msg: &str) -> Result<String> {
    eprint!("{} ", style(msg).white());
    std::io::stderr().flush()?;

    let secret = if std::io::stdin().is_terminal() {
        terminal::enable_raw_mode()?;
        let res = read_hidden();
        terminal::disable_raw_mode()?;
        eprintln!();
        res?
    } else {
        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        line
    };

    let secret = secret.trim();
    if secret.is_empty() {
        return Err(anyhow!("no API key given"));
    }
    Ok(secret.to_string())
}

fn read_hidden() -> Result<String> {
    let mut buf = String::new();
    loop {
        if let Event::Key(key) = event::read()? {
            match apply_key(&mut buf, key) {
                Step::More => {}
                Step::Done => return Ok(buf),
                // raw mode swallows SIGINT, so Ctrl-C arrives as a key
                Step::Abort => return Err(anyhow!("interrupted")),
            }
        }
    }
}

fn apply_key(buf: &mut String, key: KeyEvent) -> Step {
    if key.kind != KeyEventKind::Press {
        return Step::More;
    }
    match key.code {
        KeyCode::Enter => Step::Done,
        KeyCode::Esc => Step::Abort,
        KeyCode::Char('c' | 'd') if key.modifiers.contains(KeyModifiers::CONTROL) => Step::Abort,
        KeyCode::Char(c) => {
            buf.push(c);
            Step::More
        }
        KeyCode::Backspace => {
            buf.pop();
            Step::More
        }
        _ => Step::More,
    }
}
