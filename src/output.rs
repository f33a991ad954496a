//! Output formatting for query results

use crate::index::types::{IndexEntry, QueryHit};
use std::io;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn stdout(color: bool) -> StandardStream {
    let choice = if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    };
    StandardStream::stdout(choice)
}

/// Print exact hits as `path:term`
pub fn print_hits(hits: &[QueryHit], color: bool) -> io::Result<()> {
    write_hits(&mut stdout(color), hits)
}

/// Print each entry's term followed by the files holding it
pub fn print_entries(entries: &[IndexEntry], color: bool) -> io::Result<()> {
    write_entries(&mut stdout(color), entries)
}

/// Print one path per line
pub fn print_paths(paths: &[String], color: bool) -> io::Result<()> {
    write_paths(&mut stdout(color), paths)
}

pub fn write_hits<W: WriteColor>(out: &mut W, hits: &[QueryHit]) -> io::Result<()> {
    for hit in hits {
        write_path(out, &hit.path)?;
        write!(out, ":")?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", hit.term)?;
        out.reset()?;
        writeln!(out)?;
    }
    Ok(())
}

pub fn write_entries<W: WriteColor>(out: &mut W, entries: &[IndexEntry]) -> io::Result<()> {
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            // Blank line between entries
            writeln!(out)?;
        }
        out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(out, "{}", entry.term)?;
        out.reset()?;
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
        writeln!(out, " ({})", entry.documents.len())?;
        out.reset()?;

        for path in entry.paths() {
            write!(out, "  ")?;
            write_path(out, path)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

pub fn write_paths<W: WriteColor>(out: &mut W, paths: &[String]) -> io::Result<()> {
    for path in paths {
        write_path(out, path)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_path<W: WriteColor>(out: &mut W, path: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(Color::Magenta)))?;
    write!(out, "{}", path)?;
    out.reset()
}
