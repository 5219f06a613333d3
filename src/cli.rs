// ============================================================================
// BrickBead CLI – headless scheme rendering via command-line arguments
// ============================================================================
//
// Usage examples:
//   BrickBead --pattern patterns/scheme1.json --output scheme.png
//   BrickBead -p https://example.org/bracelet.json --copies 3 --fit -o out.png
//   BrickBead -p "patterns/*.json" --output-dir renders/ --step 2
//   BrickBead -p scheme.json --remap "#bfbfbf=#ffffff" --dump-json merged.json
//
// No GUI is opened in CLI mode. Each pattern is loaded, replicated, cut at
// the requested step and rasterised on the CPU through the same editor
// commands the GUI uses.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::color::CellColor;
use crate::editor::{apply_command, Command, EditorState};
use crate::pattern::{fetch_pattern, PatternSource};
use crate::render::{render, RenderOptions};
use crate::steps::MAX_COPIES;
use crate::view::{ViewTransform, MAX_ZOOM, MIN_ZOOM};

/// Margin in pixels left around the pattern by `--fit`.
const FIT_MARGIN: f64 = 16.0;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// BrickBead headless scheme renderer.
#[derive(Parser, Debug)]
#[command(
    name = "BrickBead",
    about = "BrickBead headless bead scheme renderer",
    long_about = "Load bead schemes (JSON, from disk or HTTP) and render them to PNG\n\
                  without opening the GUI.\n\n\
                  Example:\n  \
                  BrickBead --pattern scheme.json --output scheme.png\n  \
                  BrickBead -p \"patterns/*.json\" --copies 2 --fit --output-dir out/"
)]
pub struct CliArgs {
    /// Pattern file(s) or URL(s). Glob patterns accepted for files.
    #[arg(short, long, required = true, num_args = 1..)]
    pub pattern: Vec<String>,

    /// Output PNG path. Only valid for a single pattern.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch rendering (`<stem>.png` per pattern).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Extra copies of the motif, each shifted right by --shift columns.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=MAX_COPIES as i64))]
    pub copies: u32,

    /// Column offset between consecutive copies.
    #[arg(long, default_value_t = 4, allow_negative_numbers = true)]
    pub shift: i32,

    /// Step to render: a 1-based step number, or "all" for the last step.
    #[arg(long, default_value = "all", value_name = "N|all")]
    pub step: String,

    /// Image width in pixels.
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Image height in pixels.
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Zoom factor (0.1 to 5.0). Ignored with --fit.
    #[arg(long, default_value_t = 1.0)]
    pub zoom: f64,

    /// Horizontal pan in screen pixels. Ignored with --fit.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub pan_x: f64,

    /// Vertical pan in screen pixels. Ignored with --fit.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub pan_y: f64,

    /// Background color as hex.
    #[arg(long, default_value = "#1a1a1a", value_name = "HEX")]
    pub background: String,

    /// Display remap FROM=TO (hex colors). Repeatable.
    #[arg(long, value_name = "FROM=TO")]
    pub remap: Vec<String>,

    /// Center the pattern and zoom so it fills the image.
    #[arg(long)]
    pub fit: bool,

    /// Draw unpainted lattice positions as faint slots.
    #[arg(long)]
    pub show_empty_slots: bool,

    /// Also write the merged visible cells as JSON. Single pattern only.
    #[arg(long, value_name = "FILE")]
    pub dump_json: Option<PathBuf>,

    /// Print per-pattern timing and cell counts.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when a CLI-mode flag is present in the process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--pattern" || a == "-p" || a.starts_with("--pattern="))
    }
}

/// Which step the render stops at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepChoice {
    Last,
    /// 0-based.
    Index(usize),
}

/// Settings shared by every pattern in a run, validated once up front.
#[derive(Clone, Debug)]
struct RenderJob {
    copies: u32,
    shift: i32,
    step: StepChoice,
    width: u32,
    height: u32,
    zoom: f64,
    pan: (f64, f64),
    fit: bool,
    background: CellColor,
    remaps: Vec<(CellColor, CellColor)>,
    options: RenderOptions,
    verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = every pattern rendered, `1` = one or more failed.
pub fn run(args: CliArgs) -> ExitCode {
    let inputs = resolve_inputs(&args.pattern);
    if inputs.is_empty() {
        eprintln!("error: no pattern files matched the given argument(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} patterns given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch rendering.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }
    if inputs.len() > 1 && args.dump_json.is_some() {
        eprintln!("error: --dump-json only works with a single pattern.");
        return ExitCode::FAILURE;
    }

    let job = match build_job(&args) {
        Ok(job) => job,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, source) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, source);
        }
        let start = Instant::now();

        let Some(output_path) = build_output_path(source, args.output.as_deref(), args.output_dir.as_deref()) else {
            eprintln!("  error: cannot determine output path for '{}'.", source);
            any_failure = true;
            continue;
        };

        match run_one(source, &output_path, args.dump_json.as_deref(), &job) {
            Ok(painted) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({} beads, {:.0}ms)",
                        output_path.display(),
                        painted,
                        start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn build_job(args: &CliArgs) -> Result<RenderJob, String> {
    if args.width == 0 || args.height == 0 {
        return Err("--width and --height must be positive".to_string());
    }
    if !args.zoom.is_finite() || !(MIN_ZOOM..=MAX_ZOOM).contains(&args.zoom) {
        return Err(format!("--zoom must be between {} and {}", MIN_ZOOM, MAX_ZOOM));
    }
    let background = args
        .background
        .parse::<CellColor>()
        .map_err(|e| format!("--background: {}", e))?;
    let remaps = args
        .remap
        .iter()
        .map(|r| parse_remap(r))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RenderJob {
        copies: args.copies,
        shift: args.shift,
        step: parse_step(&args.step)?,
        width: args.width,
        height: args.height,
        zoom: args.zoom,
        pan: (args.pan_x, args.pan_y),
        fit: args.fit,
        background,
        remaps,
        options: RenderOptions {
            show_empty_slots: args.show_empty_slots,
            ..RenderOptions::default()
        },
        verbose: args.verbose,
    })
}

// ============================================================================
// Per-pattern pipeline
// ============================================================================

/// Render one pattern. Returns the number of visible beads.
fn run_one(source: &PatternSource, output: &Path, dump_json: Option<&Path>, job: &RenderJob) -> Result<usize, String> {
    // -- Step 1: Load ----------------------------------------------------
    let steps = fetch_pattern(source).map_err(|e| format!("load failed: {}", e))?;
    let step_count = steps.len();

    // -- Step 2: Replay through the editor -------------------------------
    let mut state = EditorState::default();
    apply_command(
        &mut state,
        Command::LoadPattern { steps, copies: job.copies, shift: job.shift },
    );
    let target = match job.step {
        StepChoice::Last => usize::MAX,
        StepChoice::Index(i) if i < step_count.max(1) => i,
        StepChoice::Index(i) => {
            return Err(format!("step {} requested but the pattern has {} step(s)", i + 1, step_count));
        }
    };
    apply_command(&mut state, Command::SetStep(target));
    apply_command(&mut state, Command::SetBackground(job.background));
    for &(stored, display) in &job.remaps {
        apply_command(&mut state, Command::RemapColor { stored, display });
    }

    if job.verbose {
        println!(
            "  step {}/{}, {} beads, {} color(s)",
            state.layers.cursor() + 1,
            state.layers.step_count(),
            state.visible_cells().len(),
            state.color_map.len()
        );
    }

    // -- Step 3: Position the view ---------------------------------------
    let mut view = ViewTransform::default();
    if job.fit {
        if let Some((x0, y0, x1, y1)) = state.visible_cells().unit_extent() {
            let s = view.base_cell_size();
            view.fit((x0 * s, y0 * s, x1 * s, y1 * s), job.width as f64, job.height as f64, FIT_MARGIN);
        }
    } else {
        view.set_zoom_around(job.zoom, 0.0, 0.0);
        view.pan_by(job.pan.0, job.pan.1);
    }
    state.view = view;

    // -- Step 4: Render + save -------------------------------------------
    let img = render(
        &state.view,
        state.visible_cells(),
        &state.color_map,
        state.background,
        job.width,
        job.height,
        &job.options,
    );
    img.save_with_format(output, image::ImageFormat::Png)
        .map_err(|e| format!("save failed: {}", e))?;

    if let Some(path) = dump_json {
        let json = state
            .visible_cells()
            .to_json()
            .map_err(|e| format!("could not serialize cells: {}", e))?;
        std::fs::write(path, json).map_err(|e| format!("could not write '{}': {}", path.display(), e))?;
    }

    Ok(state.visible_cells().len())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand URLs, literal paths and glob patterns into a deduplicated,
/// ordered list of sources.
fn resolve_inputs(patterns: &[String]) -> Vec<PatternSource> {
    fn push(source: PatternSource, result: &mut Vec<PatternSource>) {
        if !result.contains(&source) {
            result.push(source);
        }
    }

    let mut result: Vec<PatternSource> = Vec::new();

    for pattern in patterns {
        let source = PatternSource::parse(pattern);
        if matches!(source, PatternSource::Url(_)) || Path::new(pattern).exists() {
            push(source, &mut result);
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    push(PatternSource::File(entry), &mut result);
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

fn parse_step(raw: &str) -> Result<StepChoice, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return Ok(StepChoice::Last);
    }
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(StepChoice::Index(n - 1)),
        _ => Err(format!("--step expects a step number from 1 or \"all\", got '{}'", raw)),
    }
}

fn parse_remap(raw: &str) -> Result<(CellColor, CellColor), String> {
    let (from, to) = raw
        .split_once('=')
        .ok_or_else(|| format!("--remap expects FROM=TO, got '{}'", raw))?;
    let from = from.parse().map_err(|e| format!("--remap '{}': {}", raw, e))?;
    let to = to.parse().map_err(|e| format!("--remap '{}': {}", raw, e))?;
    Ok((from, to))
}

/// Compute the output path for one source.
///
/// Priority:
/// 1. `--output` (explicit path, single pattern)
/// 2. `--output-dir` (batch directory, `<stem>.png`)
/// 3. Fallback: `<stem>.png` next to a file input, or in the working
///    directory for a URL
fn build_output_path(source: &PatternSource, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = match source {
        PatternSource::File(path) => path.file_stem()?.to_string_lossy().into_owned(),
        PatternSource::Url(url) => {
            let last = url.trim_end_matches('/').rsplit('/').next()?;
            let last = last.split(['?', '#']).next()?;
            Path::new(last).file_stem()?.to_string_lossy().into_owned()
        }
    };
    let file_name = format!("{}.png", stem);

    if let Some(dir) = output_dir {
        return Some(dir.join(file_name));
    }

    match source {
        PatternSource::File(path) => {
            let parent = path.parent().unwrap_or(Path::new("."));
            Some(parent.join(file_name))
        }
        PatternSource::Url(_) => Some(PathBuf::from(file_name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_choice_parsing() {
        assert_eq!(parse_step("all"), Ok(StepChoice::Last));
        assert_eq!(parse_step(" ALL "), Ok(StepChoice::Last));
        assert_eq!(parse_step("2"), Ok(StepChoice::Index(1)));
        assert!(parse_step("0").is_err());
        assert!(parse_step("two").is_err());
    }

    #[test]
    fn remap_parsing() {
        let (from, to) = parse_remap("#bfbfbf=#ffffff").unwrap();
        assert_eq!(from, CellColor::EMPTY);
        assert_eq!(to, CellColor::WHITE);
        assert!(parse_remap("#bfbfbf").is_err());
        assert!(parse_remap("#bfbfbf=nope").is_err());
    }

    #[test]
    fn output_paths() {
        let file = PatternSource::File(PathBuf::from("schemes/rose.json"));
        let url = PatternSource::Url("https://example.org/p/tulip.json?v=2".to_string());
        assert_eq!(build_output_path(&file, None, None), Some(PathBuf::from("schemes/rose.png")));
        assert_eq!(
            build_output_path(&url, None, Some(Path::new("out"))),
            Some(PathBuf::from("out/tulip.png"))
        );
        assert_eq!(
            build_output_path(&url, Some(Path::new("x.png")), None),
            Some(PathBuf::from("x.png"))
        );
    }

    #[test]
    fn args_parse_with_defaults() {
        let args = CliArgs::try_parse_from(["BrickBead", "-p", "a.json", "--remap", "#111111=#222222", "--shift", "-3"]).unwrap();
        assert_eq!(args.copies, 0);
        assert_eq!(args.shift, -3);
        assert_eq!(args.step, "all");
        let job = build_job(&args).unwrap();
        assert_eq!(job.remaps.len(), 1);
        assert_eq!(job.background, CellColor::DEFAULT_BACKGROUND);
        assert!(CliArgs::try_parse_from(["BrickBead", "-p", "a.json", "--copies", "41"]).is_err());
    }

    #[test]
    fn renders_a_pattern_file_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("motif.json");
        std::fs::write(&input, r##"[{"0,0":"#bfbfbf","1,0":"#bfbfbf"},{"2,0":"#00ff00"}]"##).unwrap();
        let output = dir.path().join("motif.png");
        let dump = dir.path().join("motif.cells.json");

        let args = CliArgs::try_parse_from([
            "BrickBead",
            "-p",
            input.to_str().unwrap(),
            "--copies",
            "2",
            "--step",
            "1",
            "--fit",
            "--width",
            "120",
            "--height",
            "80",
            "--dump-json",
            dump.to_str().unwrap(),
        ])
        .unwrap();
        assert_eq!(run(args), ExitCode::SUCCESS);

        let img = image::open(&output).unwrap().into_rgba8();
        assert_eq!(img.dimensions(), (120, 80));
        let merged = crate::cells::PaintedCells::from_json(&std::fs::read_to_string(&dump).unwrap()).unwrap();
        let keys: Vec<String> = merged.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, ["0,0", "1,0", "4,0", "5,0", "8,0", "9,0"]);
    }

    #[test]
    fn missing_step_fails() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("one.json");
        std::fs::write(&input, r##"{"0,0":"#bfbfbf"}"##).unwrap();
        let args = CliArgs::try_parse_from(["BrickBead", "-p", input.to_str().unwrap(), "--step", "3"]).unwrap();
        assert_eq!(run(args), ExitCode::FAILURE);
    }
}
