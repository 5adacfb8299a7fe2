//! Conflict report printed on stderr after a merge.

use crate::merge::Conflict;

pub fn print_conflicts(conflicts: &[Conflict]) {
    if !conflicts.is_empty() {
        eprint!("{}", render_conflicts(conflicts));
    }
}

fn render_conflicts(conflicts: &[Conflict]) -> String {
    let noun = if conflicts.len() == 1 { "value was" } else { "values were" };
    let mut text = format!("warning: {} {noun} overridden during merge\n", conflicts.len());
    for conflict in conflicts {
        text.push_str("  ");
        text.push_str(&conflict.to_string());
        text.push('\n');
    }
    text
}
