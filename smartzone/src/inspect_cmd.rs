use anyhow::{Context, Result};
use mds_config_core::{parse_file, render_json};
use smartzone::extract::extract_zoning;
use smartzone::inspect::{render_snapshot, render_tree};

use crate::cli::{InspectArgs, OutputFormat};

pub fn run_inspect(args: InspectArgs) -> Result<()> {
    let tree = parse_file(&args.file)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    if args.tree {
        match args.format {
            OutputFormat::Text => print!("{}", render_tree(&tree, args.depth)),
            OutputFormat::Json => println!("{}", render_json(&tree)?),
        }
        return Ok(());
    }

    let extracted = extract_zoning(&tree);
    match args.format {
        OutputFormat::Text => {
            println!("{}", render_snapshot(&extracted.value));
            if !extracted.warnings.is_empty() {
                println!("warnings count={}", extracted.warnings.len());
                for warning in &extracted.warnings {
                    println!("- line {}: {} ({})", warning.line, warning.reason, warning.text);
                }
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&extracted)?),
    }
    Ok(())
}
