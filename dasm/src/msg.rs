use color_print::ceprintln;

#[derive(Debug)]
pub enum Msg {
    Error(String),
    Warn(String),
    Note(String),
}

impl Msg {
    /// Header, then where in the input it happened and the bytes there.
    pub fn print(&self, info: (&str, usize, &[u8])) {
        let (file, offset, raw) = info;
        match self {
            Msg::Error(msg) => ceprintln!("<red,bold>error</>: {}", msg),
            Msg::Warn(msg) => ceprintln!("<yellow,bold>warn</>: {}", msg),
            Msg::Note(msg) => ceprintln!("<green,bold>note</>: {}", msg),
        }
        let hex = raw.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ");
        ceprintln!("     <blue>--></> <underline>{}:0x{:04X}</>", file, offset);
        ceprintln!("      <blue>|</>");
        ceprintln!(" <blue>{:04X} |</> {}", offset, hex);
        ceprintln!("      <blue>|</>");
    }
}
