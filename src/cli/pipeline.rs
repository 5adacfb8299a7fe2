//! load → merge → interpolate → emit

use anyhow::Result;

use super::report;
use super::Cli;
use crate::document::Document;
use crate::emit::{emit, Destination};
use crate::error::Error;
use crate::interpolate::{interpolate, ProcessEnv};
use crate::load::{Format, Loader, Source};
use crate::merge::{merge_into, MergeOptions};

pub fn run(cli: &Cli) -> Result<()> {
    let sources = collect_sources(cli)?;
    let loader = Loader::new()
        .with_input_format(cli.input_format)
        .with_fallback_format(cli.format);

    // Assignments follow the key layout merged so far.
    let options = MergeOptions { list_strategy: cli.list_strategy, strict: cli.strict };
    let mut merged = Document::empty();
    let mut conflicts = Vec::new();
    let mut first_format = None;
    for source in &sources {
        let loaded = loader.load_onto(source, &merged)?;
        tracing::debug!("loaded {} as {}", source.name(), loaded.format);
        if !matches!(source, Source::Assignment { .. }) {
            first_format.get_or_insert(loaded.format);
        }
        merged = merge_into(merged, loaded.document, options, &mut conflicts)?;
    }
    if !cli.quiet {
        report::print_conflicts(&conflicts);
    }

    let document = if cli.no_interpolate { merged } else { interpolate(merged, &ProcessEnv)? };

    let format = output_format(cli, first_format);
    let destination = match &cli.output {
        Some(path) => Destination::File(path.clone()),
        None => Destination::Stdout,
    };
    tracing::debug!("writing {} to {}", format, destination.name());
    emit(&document, format, &destination)?;
    Ok(())
}

/// Positional sources, then `--set` assignments. With `--update` an existing
/// output file goes first.
fn collect_sources(cli: &Cli) -> Result<Vec<Source>, Error> {
    let mut sources = Vec::with_capacity(cli.sources.len() + cli.set.len() + 1);

    if cli.update {
        if let Some(path) = cli.output.as_ref().filter(|path| path.exists()) {
            sources.push(Source::File(path.clone()));
        }
    }

    sources.extend(cli.sources.iter().map(|arg| Source::from_arg(arg)));
    if sources.iter().filter(|source| matches!(source, Source::Stdin)).count() > 1 {
        return Err(Error::Usage("stdin ('-') can only be given once".to_string()));
    }

    for arg in &cli.set {
        sources.push(Source::assignment(arg)?);
    }
    Ok(sources)
}

fn output_format(cli: &Cli, first_format: Option<Format>) -> Format {
    cli.format
        .or_else(|| cli.output.as_deref().and_then(Format::from_path))
        .or(first_format)
        .unwrap_or(Format::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("configmerge").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_sets_come_after_sources() {
        let sources = collect_sources(&cli(&["a.yaml", "--set", "x=1", "b.json"])).unwrap();
        assert_eq!(
            sources,
            vec![
                Source::File(PathBuf::from("a.yaml")),
                Source::File(PathBuf::from("b.json")),
                Source::Assignment { path: vec!["x".to_string()], value: "1".to_string() },
            ]
        );
    }

    #[test]
    fn test_stdin_only_once() {
        let err = collect_sources(&cli(&["-", "a.yaml", "-"])).unwrap_err();
        assert!(err.is_usage());
    }

    #[test]
    fn test_update_prepends_existing_output() {
        let tmp = TempDir::new().expect("tmp");
        let out = tmp.path().join("out.yaml");
        let out_arg = out.to_string_lossy().into_owned();

        let sources = collect_sources(&cli(&["a.yaml", "-o", &out_arg, "-u"])).unwrap();
        assert_eq!(sources.len(), 1);

        std::fs::write(&out, "a: 1\n").expect("write");
        let sources = collect_sources(&cli(&["a.yaml", "-o", &out_arg, "-u"])).unwrap();
        assert_eq!(sources[0], Source::File(out));
    }

    #[test]
    fn test_output_format_precedence() {
        assert_eq!(output_format(&cli(&["a", "-f", "toml", "-o", "x.json"]), Some(Format::Yaml)), Format::Toml);
        assert_eq!(output_format(&cli(&["a", "-o", "x.json"]), Some(Format::Yaml)), Format::Json);
        assert_eq!(output_format(&cli(&["a", "-o", "x.out"]), Some(Format::Yaml)), Format::Yaml);
        assert_eq!(output_format(&cli(&["a"]), None), Format::Json);
    }
}
