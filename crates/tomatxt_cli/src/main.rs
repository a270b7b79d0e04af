//! CLI entry point.
//!
//! # Responsibility
//! - Verify `tomatxt_core` linkage with a deterministic probe.
//! - Drive the command API against a database file for local checks.
//!
//! Usage: `tomatxt_cli [<db_path> <command> [args...]]`

use std::process::ExitCode;
use tomatxt_core::{CommandApi, CommandError, Note, NoteId, TimerSession};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        println!("tomatxt_core ping={}", tomatxt_core::ping());
        println!("tomatxt_core version={}", tomatxt_core::core_version());
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error={} message={}", err.code(), err.message());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), CommandError> {
    let [db_path, command, rest @ ..] = args else {
        return Err(usage());
    };
    let api = CommandApi::open(db_path)?;

    match (command.as_str(), rest) {
        ("list", []) => api.get_notes()?.iter().for_each(print_note),
        ("show", [id]) => print_note(&api.get_note(parse_id(id)?)?),
        ("children", [id]) => api.get_child_notes(parse_id(id)?)?.iter().for_each(print_note),
        ("create", [title, content]) => print_note(&api.create_note(title, content)?),
        ("update", [id, title, content]) => {
            print_note(&api.update_note(parse_id(id)?, title, content)?)
        }
        ("delete", [id]) => api.delete_note(parse_id(id)?)?,
        ("done", [id, flag]) => api.update_note_status(parse_id(id)?, parse_flag(flag)?)?,
        ("check", [id, text, flag]) => {
            print_note(&api.update_note_checkbox_status(parse_id(id)?, text, parse_flag(flag)?)?)
        }
        ("progress", [id]) => {
            let progress = api.get_checklist_progress(parse_id(id)?)?;
            println!(
                "completed={} total={} percent={:.1}",
                progress.completed, progress.total, progress.percent
            );
        }
        ("timer", []) => print_timer(&api.get_timer_state()?),
        ("timer", [action]) => print_timer(&timer_action(&api, action)?),
        ("timer", [action, work, brk]) if action == "init" => {
            print_timer(&api.init_timer(parse_minutes(work)?, parse_minutes(brk)?)?)
        }
        ("timer", [action, minutes]) if action == "work-minutes" => {
            print_timer(&api.update_work_duration(parse_minutes(minutes)?)?)
        }
        ("timer", [action, minutes]) if action == "break-minutes" => {
            print_timer(&api.update_break_duration(parse_minutes(minutes)?)?)
        }
        _ => return Err(usage()),
    }
    Ok(())
}

fn timer_action(api: &CommandApi, action: &str) -> Result<TimerSession, CommandError> {
    match action {
        "pause" => api.pause_timer()?,
        "resume" => api.resume_timer()?,
        "tick" => {
            api.tick_timer()?;
        }
        "break" => return api.start_break(),
        "work" => return api.start_work(),
        "reset" => return api.reset_timer(),
        _ => return Err(usage()),
    }
    api.get_timer_state()
}

fn print_note(note: &Note) {
    println!(
        "{} done={} children={} title={:?} preview={:?}",
        note.id, note.is_done, note.child_count, note.title, note.content_preview
    );
}

fn print_timer(session: &TimerSession) {
    println!(
        "phase={} remaining={} paused={} finished={}",
        session.phase.as_str(),
        session.format_remaining(),
        session.is_paused,
        session.is_expired()
    );
}

fn parse_id(raw: &str) -> Result<NoteId, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::NotFound(format!("note not found: {raw}")))
}

fn parse_flag(raw: &str) -> Result<bool, CommandError> {
    match raw {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(CommandError::InvalidInput(format!(
            "expected true|false, got `{other}`"
        ))),
    }
}

fn parse_minutes(raw: &str) -> Result<i64, CommandError> {
    raw.parse()
        .map_err(|_| CommandError::InvalidInput(format!("expected minutes, got `{raw}`")))
}

fn usage() -> CommandError {
    CommandError::InvalidInput(
        "usage: <db_path> list|show|children|create|update|delete|done|check|progress|timer ..."
            .to_string(),
    )
}
