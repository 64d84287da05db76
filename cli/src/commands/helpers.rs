use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::io::{self, BufRead, IsTerminal, Write};
use std::process;

use fitmeal_core::models::{Session, User};
use fitmeal_core::service::FitmealService;

pub(crate) const PASSWORD_ENV: &str = "FITMEAL_PASSWORD";
pub(crate) const NEW_PASSWORD_ENV: &str = "FITMEAL_NEW_PASSWORD";

const LOGIN_FAILED: &str = "Invalid username or password";

/// Read a secret from `env_key`, falling back to a hidden prompt on a
/// terminal or one line of piped stdin.
pub(crate) fn read_secret(env_key: &str, prompt: &str) -> Result<String> {
    if let Ok(value) = std::env::var(env_key) {
        return Ok(value);
    }
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .context("Failed to read password");
    }
    read_secret_from(&mut stdin.lock(), prompt)
}

pub(crate) fn read_secret_from(input: &mut impl BufRead, prompt: &str) -> Result<String> {
    eprint!("{prompt}: ");
    io::stderr().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        bail!("No input");
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Authenticate `username`. A failed login never says which half was wrong,
/// and exits with status 2.
pub(crate) fn require_login(svc: &FitmealService, username: &str, json: bool) -> Result<User> {
    let password = read_secret(PASSWORD_ENV, "Password")?;
    check_login(svc, username, &password, json)
}

pub(crate) fn check_login(
    svc: &FitmealService,
    username: &str,
    password: &str,
    json: bool,
) -> Result<User> {
    match svc
        .authenticate(username, password)
        .context("Login failed")?
    {
        Some(user) => Ok(user),
        None => {
            if json {
                println!("{}", json_error(LOGIN_FAILED));
            } else {
                eprintln!("{LOGIN_FAILED}");
            }
            process::exit(2);
        }
    }
}

pub(crate) fn require_session(
    svc: &FitmealService,
    username: &str,
    json: bool,
) -> Result<Session> {
    require_login(svc, username, json).map(|user| user.session())
}

pub(crate) fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a missing row and exit with status 2.
pub(crate) fn not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

/// Collapse the HTML wger puts in exercise descriptions into one line of text.
pub(crate) fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' => {
                in_tag = true;
                out.push(' ');
            }
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_secret_from_strips_newline() {
        let mut input = io::Cursor::new("hunter2\r\n");
        assert_eq!(read_secret_from(&mut input, "Password").unwrap(), "hunter2");
    }

    #[test]
    fn test_read_secret_from_keeps_inner_spaces() {
        let mut input = io::Cursor::new(" two words \n");
        assert_eq!(
            read_secret_from(&mut input, "Password").unwrap(),
            " two words "
        );
    }

    #[test]
    fn test_read_secret_from_eof() {
        let mut input = io::Cursor::new("");
        assert!(read_secret_from(&mut input, "Password").is_err());
    }

    #[test]
    fn test_json_error_escapes() {
        assert_eq!(json_error("bad \"id\""), r#"{"error":"bad \"id\""}"#);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("Müsli", 10), "Müsli");
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("<p>Lie on a bench.</p>\n<p>Press <b>up</b>.</p>"),
            "Lie on a bench. Press up ."
        );
        assert_eq!(strip_markup("plain"), "plain");
    }
}
