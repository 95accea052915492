// SPDX-License-Identifier: MIT OR Apache-2.0
//! inbetween - keyframe interpolation for looping line animation.
//!
//! Command-line host for the interpolation engine:
//! - Rebuild interpolated samples of chosen objects, or of all of them
//! - Retype a sample between key and interpolated
//! - Query the loop-aware timeline index
//! - Inspect a project's keyframes
//!
//! ## Architecture
//!
//! Projects are RON files. Every mutating subcommand opens a [`Session`], runs its commands
//! as one undo group and saves the project unless `--dry-run` is given.

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use inbetween_app::commands::{CommandError, EditorCommand, InterpolateCommand, RetypeCommand};
use inbetween_app::project::ProjectFile;
use inbetween_app::session::{CommandOutcome, Session};
use inbetween_engine::ScrubDirection;
use inbetween_timeline::{Beat, InterIndex, ObjectId, RootIndex, SampleKind};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "inbetween", version, about = "Keyframe interpolation for looping line animation")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rebuild interpolated samples of the given objects.
    Rebuild(RebuildArgs),
    /// Rebuild every object in the timeline.
    RebuildAll(RebuildAllArgs),
    /// Mark a sample as key or interpolated, then rebuild its object.
    Retype(RetypeArgs),
    /// Answer timeline index queries.
    Index(IndexArgs),
    /// Summarize keyframes and samples.
    Inspect(InspectArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
enum Direction {
    Forward,
    Backward,
    #[default]
    None,
}

impl From<Direction> for ScrubDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Forward => ScrubDirection::Forward,
            Direction::Backward => ScrubDirection::Backward,
            Direction::None => ScrubDirection::None,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Kind {
    Key,
    Interpolated,
}

impl From<Kind> for SampleKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Key => SampleKind::Key,
            Kind::Interpolated => SampleKind::Interpolated,
        }
    }
}

#[derive(clap::Args, Debug)]
struct PassArgs {
    /// Playhead root index.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    reference: RootIndex,

    /// Playhead motion.
    #[arg(long, value_enum, default_value_t = Direction::None)]
    direction: Direction,

    /// Compute and report without saving.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct RebuildArgs {
    /// Project file.
    project: PathBuf,

    /// Object to rebuild (repeatable).
    #[arg(long = "id", required = true)]
    ids: Vec<Uuid>,

    /// Interpolated object whose slots may be taken over (repeatable).
    #[arg(long = "replace")]
    replace: Vec<Uuid>,

    #[command(flatten)]
    pass: PassArgs,
}

#[derive(Parser, Debug)]
struct RebuildAllArgs {
    /// Project file.
    project: PathBuf,

    #[command(flatten)]
    pass: PassArgs,
}

#[derive(Parser, Debug)]
struct RetypeArgs {
    /// Project file.
    project: PathBuf,

    /// Keyframe index.
    #[arg(long)]
    keyframe: usize,

    /// Object to retype.
    #[arg(long)]
    id: Uuid,

    /// New sample kind.
    #[arg(long, value_enum)]
    kind: Kind,

    #[command(flatten)]
    pass: PassArgs,
}

#[derive(Parser, Debug)]
#[command(group(ArgGroup::new("query").required(true).args(["root", "beat", "inter"])))]
struct IndexArgs {
    /// Project file.
    project: PathBuf,

    /// Root index to resolve.
    #[arg(long, allow_hyphen_values = true)]
    root: Option<RootIndex>,

    /// Cumulative beat, `n` or `n/d`.
    #[arg(long, allow_hyphen_values = true)]
    beat: Option<Beat>,

    /// Inter index to resolve.
    #[arg(long, allow_hyphen_values = true)]
    inter: Option<InterIndex>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Project file.
    project: PathBuf,

    /// Print the report as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct IndexReport {
    root: RootIndex,
    index: usize,
    loop_count: i64,
    inter: InterIndex,
    beat: Beat,
}

#[derive(Debug, Serialize)]
struct SampleSummary {
    id: ObjectId,
    kind: SampleKind,
    points: usize,
}

#[derive(Debug, Serialize)]
struct KeyframeSummary {
    index: usize,
    beat: Beat,
    contains_interpolated: bool,
    fully_authored: bool,
    samples: Vec<SampleSummary>,
}

#[derive(Debug, Serialize)]
struct InspectReport {
    loop_length: Beat,
    objects: usize,
    keyframes: Vec<KeyframeSummary>,
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("inbetween_app=info,inbetween_engine=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting inbetween v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(Cli::parse()) {
        tracing::error!("inbetween failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.cmd {
        Command::Rebuild(args) => {
            let command = InterpolateCommand::new(args.ids.into_iter().map(ObjectId).collect())
                .with_replacements(args.replace.into_iter().map(ObjectId))
                .at(args.pass.reference, args.pass.direction.into());
            mutate(&args.project, &args.pass, |session| session.execute(&command))
        }
        Command::RebuildAll(args) => mutate(&args.project, &args.pass, |session| {
            let command = InterpolateCommand::all(session.timeline())
                .at(args.pass.reference, args.pass.direction.into());
            session.execute(&command)
        }),
        Command::Retype(args) => {
            let id = ObjectId(args.id);
            let retype = RetypeCommand::new(args.keyframe, id, args.kind.into());
            let rebuild =
                InterpolateCommand::new(vec![id]).at(args.pass.reference, args.pass.direction.into());
            let commands: [&dyn EditorCommand; 2] = [&retype, &rebuild];
            mutate(&args.project, &args.pass, |session| {
                session.execute_all(&retype.description(), &commands)
            })
        }
        Command::Index(args) => cmd_index(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn mutate(
    path: &Path,
    pass: &PassArgs,
    action: impl FnOnce(&mut Session) -> Result<CommandOutcome, CommandError>,
) -> Result<(), CommandError> {
    let mut session = Session::new(ProjectFile::load(path)?);
    let outcome = action(&mut session)?;

    if outcome.committed && !pass.dry_run {
        session.to_project().save(path)?;
        session.mark_saved();
    }

    if pass.json {
        print_json(&outcome)?;
    } else {
        let verb = if pass.dry_run { "would apply" } else { "applied" };
        println!(
            "{}: {verb} {} edits on {} keyframes",
            outcome.description,
            outcome.edits,
            outcome.keyframes.len()
        );
        for diagnostic in &outcome.diagnostics {
            println!("warning: {diagnostic}");
        }
    }
    Ok(())
}

fn cmd_index(args: IndexArgs) -> Result<(), CommandError> {
    let project = ProjectFile::load(&args.project)?;
    let index = project.timeline.index()?;

    let root = match (args.root, args.beat, args.inter) {
        (Some(root), _, _) => root,
        (None, Some(beat), _) => index.nearest_root_index(beat)?,
        (None, None, Some(inter)) => index.root_index_at_inter(inter),
        (None, None, None) => 0,
    };
    let report = IndexReport {
        root,
        index: index.index_at_root(root),
        loop_count: index.loop_count_at_root(root),
        inter: index.inter_index_at_root(root)?,
        beat: index.root_beat_at_root(root)?,
    };
    print_json(&report)
}

fn cmd_inspect(args: InspectArgs) -> Result<(), CommandError> {
    let project = ProjectFile::load(&args.project)?;
    let timeline = &project.timeline;

    let report = InspectReport {
        loop_length: timeline.loop_length(),
        objects: timeline.object_ids().len(),
        keyframes: timeline
            .keyframes()
            .iter()
            .enumerate()
            .map(|(index, keyframe)| KeyframeSummary {
                index,
                beat: keyframe.beat,
                contains_interpolated: keyframe.contains_interpolated(),
                fully_authored: keyframe.is_fully_authored(),
                samples: keyframe
                    .samples
                    .iter()
                    .map(|s| SampleSummary {
                        id: s.id,
                        kind: s.kind,
                        points: s.points.len(),
                    })
                    .collect(),
            })
            .collect(),
    };

    if args.json {
        return print_json(&report);
    }
    println!(
        "loop {} beats, {} keyframes, {} objects",
        report.loop_length,
        report.keyframes.len(),
        report.objects
    );
    for keyframe in &report.keyframes {
        let keys = keyframe.samples.iter().filter(|s| s.kind == SampleKind::Key).count();
        println!(
            "  [{}] beat {}: {} samples ({} key)",
            keyframe.index,
            keyframe.beat,
            keyframe.samples.len(),
            keys
        );
    }
    Ok(())
}

fn print_json(value: &impl Serialize) -> Result<(), CommandError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    println!("{text}");
    Ok(())
}
