use std::io::{self, Write};

use bulb_core::{ChangeKind, DiffLine, LineKind};
use crossterm::style::Stylize;

pub fn marker(kind: LineKind) -> &'static str {
    match kind {
        LineKind::Same => " ",
        LineKind::Add => "+",
        LineKind::Remove => "-",
    }
}

/// `+added -removed` counts of a diff.
pub fn summary(lines: &[DiffLine]) -> String {
    let added = lines.iter().filter(|l| l.kind == LineKind::Add).count();
    let removed = lines.iter().filter(|l| l.kind == LineKind::Remove).count();
    format!("+{added} -{removed}")
}

pub fn print_diff(out: &mut impl Write, lines: &[DiffLine]) -> io::Result<()> {
    for line in lines {
        let text = format!("{} {}", marker(line.kind), line.text);
        match line.kind {
            LineKind::Same => writeln!(out, "{}", text.dim())?,
            LineKind::Add => writeln!(out, "{}", text.green())?,
            LineKind::Remove => writeln!(out, "{}", text.red())?,
        }
    }
    Ok(())
}

pub fn change_label(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Create => "created",
        ChangeKind::Update => "updated",
        ChangeKind::Delete => "deleted",
    }
}
