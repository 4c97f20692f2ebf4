pub mod config;
pub mod decode;
pub mod error;
pub mod family;
pub mod reader;
pub mod render;
pub mod resolve;
pub mod table;

use arch::inst::Inst;

use config::Config;
use error::Error;
use render::Listing;
use resolve::Labels;

/// Everything the three passes produce for one input.
#[derive(Debug, Clone)]
pub struct Disassembly {
    pub insts: Vec<Inst>,
    pub labels: Labels,
    pub listing: Listing,
}

/// decode -> resolve -> render.
pub fn disassemble(bytes: &[u8], cfg: &Config) -> Result<Disassembly, Error> {
    if bytes.len() > cfg.max_input {
        return Err(Error::TooLarge(bytes.len(), cfg.max_input));
    }
    let mut insts = decode::decode(table::table()?, bytes);
    let labels = resolve::resolve(&mut insts);
    let listing = render::render(bytes, &insts, &labels, cfg);
    Ok(Disassembly {
        insts,
        labels,
        listing,
    })
}
