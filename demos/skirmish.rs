//! Headless skirmish demo: a squad pathing around a generated yard.
//!
//! Run: cargo run --bin skirmish [steps] [seed]

use tacnav_demos::Skirmish;

fn main() {
    let mut args = std::env::args().skip(1);
    let steps = args.next().and_then(|s| s.parse().ok()).unwrap_or(400);
    let seed = args.next().and_then(|s| s.parse().ok()).unwrap_or(42);

    let mut skirmish = match Skirmish::new(seed) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    println!(
        "skirmish: {} units on a {}x{}x{} grid, seed {seed}",
        skirmish.unit_count(),
        skirmish.grid().width(),
        skirmish.grid().height(),
        skirmish.grid().depth()
    );
    let summary = skirmish.run(steps);
    println!("{summary}");
}
