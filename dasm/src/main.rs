mod msg;

use std::fs::File;
use std::io::{Read, Write};
use std::process::ExitCode;

use arch::inst::Inst;
use color_print::ceprintln;
use dasm86::{config::Config, disassemble, error::Error, render::Status};
use msg::Msg;

const HELP_TEMPLATE: &str = "\
{before-help}{bin} {version}
  {about}

{usage-heading}
{tab}{usage}

{all-args}{after-help}";

#[derive(Debug, clap::Parser)]
#[clap(version, about, help_template = HELP_TEMPLATE)]
struct Args {
    /// Input binary
    input: String,

    /// Output listing, stdout when omitted
    #[clap(short, long)]
    output: Option<String>,

    /// Listing config (YAML)
    #[clap(short, long)]
    config: Option<String>,

    /// Leave out the offset and byte comments
    #[clap(long)]
    no_comments: bool,

    /// Dump decoded instructions as YAML
    #[clap(short, long)]
    dump: Option<String>,

    /// Print each stage to stderr
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    use clap::Parser;

    let args: Args = Args::parse();
    match run(&args) {
        Ok(status) => ExitCode::from(status.code()),
        Err(e) => {
            ceprintln!("<red,bold>error</>: {}", e);
            if let Some(source) = std::error::Error::source(&e) {
                ceprintln!("  <blue>caused by</>: {}", source);
            }
            ExitCode::from(Error::EXIT_CODE)
        }
    }
}

fn run(args: &Args) -> Result<Status, Error> {
    let stage = |text: String| {
        if args.verbose {
            eprintln!("{text}");
        }
    };

    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if args.no_comments {
        cfg.comments = false;
    }

    stage("1. Read Input".to_string());
    stage(format!("  < {}", args.input));
    let bytes = read(&args.input, cfg.max_input)?;

    stage("2. Decode, Resolve Jump Targets, Render".to_string());
    let out = disassemble(&bytes, &cfg)?;
    let (insts, labels, listing) = (&out.insts, &out.labels, &out.listing);
    stage(format!("  {} bytes, {} records", bytes.len(), insts.len()));
    stage(format!(
        "  {} labels, {} unresolved",
        labels.len(),
        labels.unresolved().len()
    ));

    // ------------------------------------------------------------------------
    // Diagnostics
    let at = |offset, end| locate(&args.input, &bytes, offset, end);
    let mut tainted = false;
    let mut taint = |offset, end| {
        if cfg.taint_after_error && !tainted {
            tainted = true;
            Msg::Note("Following lines are commented out".to_string()).print(at(offset, end));
        }
    };
    for (index, inst) in insts.iter().enumerate() {
        if let Some(fault) = inst.fault {
            Msg::Error(fault.to_string()).print(at(inst.offset, inst.end()));
            taint(inst.offset, inst.end());
        }
        if labels.is_unresolved(index) {
            if let Some(target) = inst.jump_target() {
                Msg::Error(format!("Unresolved jump target: {target}"))
                    .print(at(inst.offset, inst.end()));
            }
            taint(inst.offset, inst.end());
        }
    }
    if let Some(prefix) = dangling(insts) {
        Msg::Warn("Prefix at end of input has no instruction to apply to".to_string())
            .print(at(prefix.offset, prefix.end()));
    }

    // ------------------------------------------------------------------------
    // Output
    match &args.output {
        Some(path) => {
            stage(format!("  > {path}"));
            write(path, &listing.text())?;
        }
        None => print!("{}", listing.text()),
    }

    if let Some(path) = &args.dump {
        stage(format!("  > {path}"));
        let yaml = serde_yaml::to_string(insts).map_err(Error::Dump)?;
        write(path, &yaml)?;
    }

    Ok(listing.status)
}

fn locate<'a>(file: &'a str, bytes: &'a [u8], offset: usize, end: usize) -> (&'a str, usize, &'a [u8]) {
    (file, offset, bytes.get(offset..end).unwrap_or_default())
}

/// First record of a run of prefixes that ends the input.
fn dangling(insts: &[Inst]) -> Option<&Inst> {
    let tail = insts.iter().rev().take_while(|inst| inst.is_prefix()).count();
    insts[insts.len() - tail..].first()
}

fn read(path: &str, limit: usize) -> Result<Vec<u8>, Error> {
    let file = File::open(path).map_err(|e| Error::FileOpen(path.to_string(), e))?;
    let len = file
        .metadata()
        .map_err(|e| Error::FileRead(path.to_string(), e))?
        .len() as usize;
    if len > limit {
        return Err(Error::TooLarge(len, limit));
    }
    // the file may grow after the size check
    let mut bytes = Vec::with_capacity(len);
    file.take(limit as u64 + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| Error::FileRead(path.to_string(), e))?;
    if bytes.len() > limit {
        return Err(Error::TooLarge(bytes.len(), limit));
    }
    Ok(bytes)
}

fn write(path: &str, text: &str) -> Result<(), Error> {
    let mut file = File::create(path).map_err(|e| Error::FileCreate(path.to_string(), e))?;
    file.write_all(text.as_bytes())
        .map_err(|e| Error::FileWrite(path.to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arch::op::Mnemonic;

    fn scratch(name: &str, bytes: &[u8]) -> String {
        let path = std::env::temp_dir().join(format!("dasm86-{}-{name}", std::process::id()));
        std::fs::write(&path, bytes).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn read_rejects_oversized_input() {
        let path = scratch("large.bin", &[0x90; 10]);
        assert!(matches!(read(&path, 4), Err(Error::TooLarge(10, 4))));
        assert_eq!(read(&path, 10).unwrap(), vec![0x90; 10]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn read_missing_file() {
        assert!(matches!(
            read("/nonexistent/dasm86/input.bin", 16),
            Err(Error::FileOpen(..))
        ));
    }

    #[test]
    fn dangling_prefixes() {
        let cfg = Config::default();
        let out = disassemble(&[0x90, 0xF0, 0xF3], &cfg).unwrap();
        let prefix = dangling(&out.insts).unwrap();
        assert_eq!(prefix.offset, 1);
        assert_eq!(prefix.mnemonic, Mnemonic::LOCK);

        let out = disassemble(&[0xF3, 0xA4], &cfg).unwrap();
        assert!(dangling(&out.insts).is_none());
        assert!(dangling(&[]).is_none());
    }
}
