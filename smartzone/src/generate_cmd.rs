use anyhow::{Context, Result};
use smartzone::commands::generate_commands;
use smartzone::intent::{TomlIntentSource, ZoningIntent};
use smartzone::model::ValidationTarget;
use smartzone::report::render_commands;

use crate::cli::{GenerateArgs, IntentArgs};

pub fn run_generate(args: GenerateArgs) -> Result<()> {
    let (intent, target) = load_intent(&args.intent)?;
    print!("{}", render_commands(&generate_commands(&intent, &target)));
    Ok(())
}

pub fn load_intent(args: &IntentArgs) -> Result<(ZoningIntent, ValidationTarget)> {
    let intent = TomlIntentSource::new(&args.fabric)
        .load_path(&args.intent)
        .with_context(|| format!("failed to load intent {}", args.intent.display()))?;
    Ok((intent, ValidationTarget::new(&args.zoneset, args.vsan)))
}
