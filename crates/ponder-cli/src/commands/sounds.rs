//! Sound bank listing.

use clap::Args;
use ponder_audio::SoundBank;
use std::path::PathBuf;

#[derive(Args)]
pub struct SoundsArgs {
    /// Directory of WAV cues (built-in tones if omitted)
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Sample rate for the built-in tones
    #[arg(long, default_value = "48000")]
    sample_rate: u32,
}

pub fn run(args: SoundsArgs) -> anyhow::Result<()> {
    let bank = match &args.dir {
        Some(dir) => {
            println!("Sounds in {}", dir.display());
            SoundBank::load_dir(dir, args.sample_rate)?
        }
        None => {
            println!("Built-in sounds ({} Hz)", args.sample_rate);
            SoundBank::synthesized(args.sample_rate)
        }
    };
    println!();

    for (sound, clip) in bank.iter() {
        if clip.is_empty() {
            println!("  [{}] {:<10} (silent)", sound.raw(), sound.name());
        } else {
            println!(
                "  [{}] {:<10} {:>7} frames  {:.3}s",
                sound.raw(),
                sound.name(),
                clip.len(),
                clip.duration_secs()
            );
        }
    }

    Ok(())
}
