//! Replays viewport sizes against a states file.
//!
//! ```text
//! breakpoint-sim <states.json> <size>...
//! ```
//!
//! Each size is `WIDTH` or `WIDTHxHEIGHT` in CSS pixels. The first size is the
//! initial viewport; every following size is a resize. Handler names
//! referenced by the states file print their invocations.

use std::env;
use std::process;

use breakpoints::{logging, BreakpointResult, HandlerTable, SimulatedViewport, StateSet, StatesConfig};

const DEFAULT_HEIGHT: u32 = 768;

fn main() {
    logging::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some((path, sizes)) = args.split_first() else {
        eprintln!("usage: breakpoint-sim <states.json> <WIDTH[xHEIGHT]>...");
        process::exit(2);
    };

    let sizes = match sizes.iter().map(|s| parse_size(s)).collect::<Result<Vec<_>, _>>() {
        Ok(sizes) => sizes,
        Err(err) => {
            eprintln!("breakpoint-sim: {err}");
            process::exit(2);
        }
    };

    if let Err(err) = run(path, &sizes) {
        eprintln!("breakpoint-sim: {err}");
        process::exit(1);
    }
}

fn run(path: &str, sizes: &[(u32, u32)]) -> BreakpointResult<()> {
    let config = StatesConfig::from_path(path)?;

    let mut table = HandlerTable::new();
    for name in config.handler_names() {
        let label = name.clone();
        table.insert(name, move |matches| println!("  {label}({matches})"));
    }

    let (width, height) = sizes.first().copied().unwrap_or((1024, DEFAULT_HEIGHT));
    let viewport = SimulatedViewport::shared(width, height);
    let states = StateSet::new(&viewport)?;

    println!("{width}x{height}");
    config.apply(&states, &table)?;
    println!("  active: {:?}", states.active_states());

    for &(width, height) in sizes.iter().skip(1) {
        println!("{width}x{height}");
        viewport.resize(width, height);
        viewport.dispatch_pending();
        println!("  active: {:?}", states.active_states());
    }

    states.destroy();
    Ok(())
}

fn parse_size(text: &str) -> Result<(u32, u32), String> {
    let (w, h) = match text.split_once('x') {
        Some((w, h)) => (w, Some(h)),
        None => (text, None),
    };
    let width = w.parse().map_err(|e| format!("invalid width '{w}': {e}"))?;
    let height = match h {
        Some(h) => h.parse().map_err(|e| format!("invalid height '{h}': {e}"))?,
        None => DEFAULT_HEIGHT,
    };
    Ok((width, height))
}
