use std::fmt::{self, Write};

use crate::{
    backend::{QuestionStore, SavedComprehension},
    palette::Palette,
    utils::{pluralize, trim_line},
};

use anyhow::{Context, Result};

/// Prints every saved comprehension. Returns how many there were.
pub async fn run<S: QuestionStore>(store: &S) -> Result<usize> {
    let saved = store
        .fetch_comprehensions()
        .await
        .context("Failed to fetch saved comprehensions")?;
    let mut out = String::new();
    render_plain(&mut out, &saved).context("Failed to format saved comprehensions")?;
    print!("{out}");
    Ok(saved.len())
}

fn render_plain(out: &mut impl Write, saved: &[SavedComprehension]) -> fmt::Result {
    writeln!(
        out,
        "{} {}",
        Palette::paint(Palette::ACCENT, "Saved comprehensions"),
        Palette::dim(format!("({})", pluralize("record", saved.len())))
    )?;
    for (idx, record) in saved.iter().enumerate() {
        let passage = trim_line(&record.passage).unwrap_or("(no passage)");
        writeln!(out)?;
        writeln!(out, "{} {}", Palette::dim(format!("#{}", idx + 1)), Palette::bold(passage))?;
        if let Some(id) = &record.id {
            writeln!(out, "   {} {}", Palette::dim("id:"), id)?;
        }
        for (q_idx, question) in record.questions.iter().enumerate() {
            writeln!(
                out,
                "   {} {}",
                Palette::paint(Palette::BLANK, format!("{}.", q_idx + 1)),
                question.question
            )?;
            for option in &question.options {
                writeln!(out, "      {} {}", Palette::dim("-"), option)?;
            }
        }
    }
    Ok(())
}
