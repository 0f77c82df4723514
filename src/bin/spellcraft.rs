use anyhow::{bail, Result};
use spellcraft::context::ContextHandle;
use spellcraft::engine::Engine;
use spellcraft::loader::{Loader, NullLoader};
use spellcraft::options::Options;
use spellcraft::{driver, platform};
use std::path::PathBuf;

fn usage() -> &'static str {
    "Usage:\n  spellcraft [--verbose] [--force] [--preview] [--undo]\n             [--define NAME=VALUE]... [--plan-json <path>|-]\n             [<target>...]"
}

/// Discovers whether a context directory carries a description file and
/// warns rather than failing when one is found, since parsing it is
/// somebody else's problem: the embedding caller supplies the real `Loader`.
/// This binary only demonstrates the discovery rule end to end.
struct DiscoveringLoader;

impl Loader for DiscoveringLoader {
    fn load(&self, _engine: &Engine, ctx: &ContextHandle) -> Result<()> {
        let dir = ctx.borrow().dir().to_path_buf();
        let entries: Vec<String> = std::fs::read_dir(&dir)
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();

        match platform::discover_description_host(&dir, &entries) {
            platform::Discovery::NotFound => {}
            platform::Discovery::Found(name) => {
                spellcraft::error::cast_warning(
                    Some(dir.as_path()),
                    format!(
                        "found description file `{name}` but this build has no description \
                         parser; treating the directory as empty"
                    ),
                );
            }
            platform::Discovery::Ambiguous(names) => {
                spellcraft::error::cast_warning(
                    Some(dir.as_path()),
                    format!(
                        "ambiguous description files {names:?} and no parser to pick one; \
                         treating the directory as empty"
                    ),
                );
            }
        }
        NullLoader.load(_engine, ctx)
    }
}

fn parse_args(args: &[String]) -> Result<(Options, Vec<String>)> {
    let mut options = Options::default();
    let mut targets = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--verbose" => options.verbose = true,
            "--force" => options.force = true,
            "--preview" => options.preview = true,
            "--undo" => options.undo = true,
            "--define" => {
                i += 1;
                let kv = args.get(i).ok_or_else(|| anyhow::anyhow!(usage()))?;
                let (name, value) = kv
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("--define expects NAME=VALUE"))?;
                options.defines.insert(name.to_string(), value.to_string());
            }
            "--plan-json" => {
                i += 1;
                let path = args.get(i).ok_or_else(|| anyhow::anyhow!(usage()))?;
                options.plan_json = Some(PathBuf::from(path));
            }
            "--help" | "-h" => bail!(usage()),
            arg if arg.starts_with("--") => bail!("unknown flag `{arg}`\n\n{}", usage()),
            arg => targets.push(arg.to_string()),
        }
        i += 1;
    }

    Ok((options, targets))
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let (options, targets) = parse_args(&args)?;

    let cwd = std::env::current_dir()?;
    let loader = DiscoveringLoader;
    let result = driver::execute(&cwd, &cwd, &targets, options, &loader)?;

    std::process::exit(result.code);
}
